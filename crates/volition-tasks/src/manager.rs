//! [`WorkflowManager`] – session-lifetime task bookkeeping.
//!
//! The manager owns every [`Workflow`] created during the agent session and
//! the cooperative cancel hooks registered against individual tasks.
//!
//! Two deliberate policy choices:
//!
//! - `add_task` with an unknown workflow id **auto-creates** an empty
//!   workflow under that id.  This is forgiving toward callers that mint
//!   workflow ids externally, and risky toward typos, so every auto-create
//!   emits a warning naming the id.
//! - Cancellation is cooperative and task-scoped only: a hook registered via
//!   [`register_cancel_hook`][WorkflowManager::register_cancel_hook] fires at
//!   most once, when `cancel_task` runs.  There is no cancellation path for
//!   anything else.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;
use volition_types::CoreError;

use crate::workflow::{Task, TaskStatus, Workflow};

type CancelHook = Box<dyn FnOnce() + Send>;

/// Owner of all workflows and tasks for one agent session.
#[derive(Default)]
pub struct WorkflowManager {
    workflows: HashMap<String, Workflow>,
    cancel_hooks: HashMap<String, CancelHook>,
}

impl WorkflowManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Workflow lifecycle
    // -------------------------------------------------------------------------

    /// Create a workflow and return its generated id.
    pub fn create_workflow(&mut self, name: impl Into<String>, is_async: bool) -> String {
        let id = Uuid::new_v4().to_string();
        self.workflows
            .insert(id.clone(), Workflow::new(id.clone(), name, is_async));
        debug!(workflow = %id, "workflow created");
        id
    }

    /// Look up a workflow by id.
    pub fn workflow(&self, id: &str) -> Option<&Workflow> {
        self.workflows.get(id)
    }

    /// Add a task to the given workflow.
    ///
    /// When no workflow with that id exists, an empty one is auto-created
    /// under the id (named after it) and a warning is logged: forgiving
    /// toward externally-minted ids, visible when the id was a typo.
    ///
    /// Returns the task id.
    pub fn add_task(&mut self, workflow_id: &str, mut task: Task) -> String {
        let workflow = self
            .workflows
            .entry(workflow_id.to_string())
            .or_insert_with(|| {
                warn!(workflow = workflow_id, "unknown workflow id; auto-creating an empty workflow");
                Workflow::new(workflow_id.to_string(), workflow_id, false)
            });
        task.workflow_id = Some(workflow_id.to_string());
        let task_id = task.id.clone();
        workflow.tasks.push(task);
        task_id
    }

    /// Designate the task that concludes a workflow.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when the workflow is unknown or the task is
    /// not part of it.
    pub fn set_final_task(&mut self, workflow_id: &str, task_id: &str) -> Result<(), CoreError> {
        let workflow = self
            .workflows
            .get_mut(workflow_id)
            .ok_or_else(|| CoreError::NotFound(format!("workflow '{workflow_id}'")))?;
        if !workflow.tasks.iter().any(|t| t.id == task_id) {
            return Err(CoreError::NotFound(format!(
                "task '{task_id}' in workflow '{workflow_id}'"
            )));
        }
        workflow.final_task = Some(task_id.to_string());
        Ok(())
    }

    /// `true` iff every task in the workflow has completed.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when the workflow is unknown.
    pub fn is_complete(&self, workflow_id: &str) -> Result<bool, CoreError> {
        let workflow = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| CoreError::NotFound(format!("workflow '{workflow_id}'")))?;
        Ok(workflow
            .tasks
            .iter()
            .all(|t| t.status == TaskStatus::Completed))
    }

    // -------------------------------------------------------------------------
    // Task selection and transitions
    // -------------------------------------------------------------------------

    /// The highest-priority pending task of the workflow, ties broken by
    /// insertion order.  `None` when the workflow is unknown or has no
    /// pending tasks.
    pub fn get_next_task(&self, workflow_id: &str) -> Option<&Task> {
        let workflow = self.workflows.get(workflow_id)?;
        let mut best: Option<&Task> = None;
        for task in workflow
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
        {
            // Strictly-greater keeps the earliest-inserted task on ties.
            if best.is_none_or(|b| task.priority > b.priority) {
                best = Some(task);
            }
        }
        best
    }

    /// Move a pending task to `InProgress`.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when the task id is unknown;
    /// [`CoreError::Validation`] when the task is not pending.
    pub fn start_task(&mut self, task_id: &str) -> Result<(), CoreError> {
        let task = self.find_task_mut(task_id)?;
        if task.status != TaskStatus::Pending {
            return Err(CoreError::Validation(format!(
                "task '{task_id}' cannot start from {:?}",
                task.status
            )));
        }
        task.status = TaskStatus::InProgress;
        task.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Mark a task completed and store its result.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when the task id is unknown;
    /// [`CoreError::Validation`] when the task is already in a terminal state.
    pub fn complete_task(&mut self, task_id: &str, result: Value) -> Result<(), CoreError> {
        let task = self.find_task_mut(task_id)?;
        if task.status.is_terminal() {
            return Err(CoreError::Validation(format!(
                "task '{task_id}' is already {:?}",
                task.status
            )));
        }
        task.status = TaskStatus::Completed;
        task.result = Some(result);
        task.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Mark a task failed and record the reason.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when the task id is unknown;
    /// [`CoreError::Validation`] when the task is already in a terminal state.
    pub fn fail_task(&mut self, task_id: &str, reason: impl Into<String>) -> Result<(), CoreError> {
        let task = self.find_task_mut(task_id)?;
        if task.status.is_terminal() {
            return Err(CoreError::Validation(format!(
                "task '{task_id}' is already {:?}",
                task.status
            )));
        }
        task.status = TaskStatus::Failed;
        task.failure_reason = Some(reason.into());
        task.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Cancel a task, firing its registered cancel hook if one is present.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when the task id is unknown across all
    /// workflows.
    pub fn cancel_task(&mut self, task_id: &str) -> Result<(), CoreError> {
        let task = self.find_task_mut(task_id)?;
        if task.status.is_terminal() {
            warn!(task = task_id, status = ?task.status, "canceling a task already in a terminal state");
        }
        task.status = TaskStatus::Canceled;
        task.updated_at = chrono::Utc::now();
        if let Some(hook) = self.cancel_hooks.remove(task_id) {
            debug!(task = task_id, "firing cancel hook");
            hook();
        }
        Ok(())
    }

    /// Register a cooperative cancel hook for a task.  The hook fires at
    /// most once, when [`cancel_task`][WorkflowManager::cancel_task] runs.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when the task id is unknown.
    pub fn register_cancel_hook(
        &mut self,
        task_id: &str,
        hook: impl FnOnce() + Send + 'static,
    ) -> Result<(), CoreError> {
        self.find_task(task_id)?;
        self.cancel_hooks.insert(task_id.to_string(), Box::new(hook));
        Ok(())
    }

    /// Look up a task by id across all workflows.
    pub fn find_task(&self, task_id: &str) -> Result<&Task, CoreError> {
        self.workflows
            .values()
            .flat_map(|w| w.tasks.iter())
            .find(|t| t.id == task_id)
            .ok_or_else(|| CoreError::NotFound(format!("task '{task_id}'")))
    }

    fn find_task_mut(&mut self, task_id: &str) -> Result<&mut Task, CoreError> {
        self.workflows
            .values_mut()
            .flat_map(|w| w.tasks.iter_mut())
            .find(|t| t.id == task_id)
            .ok_or_else(|| CoreError::NotFound(format!("task '{task_id}'")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use volition_types::Priority;

    fn pending(description: &str, priority: i64) -> Task {
        Task::new(description, Priority::clamped(priority))
    }

    #[test]
    fn next_task_is_highest_priority_pending() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        manager.add_task(&wf, pending("A", 3));
        let b = manager.add_task(&wf, pending("B", 7));
        let c = manager.add_task(&wf, pending("C", 9));
        manager.complete_task(&c, json!(null)).unwrap();

        let next = manager.get_next_task(&wf).unwrap();
        assert_eq!(next.id, b);
    }

    #[test]
    fn next_task_ties_break_by_insertion_order() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        let first = manager.add_task(&wf, pending("first", 5));
        manager.add_task(&wf, pending("second", 5));

        assert_eq!(manager.get_next_task(&wf).unwrap().id, first);
    }

    #[test]
    fn next_task_none_when_nothing_pending() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        let a = manager.add_task(&wf, pending("A", 5));
        manager.fail_task(&a, "ran out of time").unwrap();

        assert!(manager.get_next_task(&wf).is_none());
        assert!(manager.get_next_task("no-such-workflow").is_none());
    }

    #[test]
    fn add_task_auto_creates_missing_workflow() {
        let mut manager = WorkflowManager::new();
        let task_id = manager.add_task("typo-id", pending("orphan", 5));

        let workflow = manager.workflow("typo-id").unwrap();
        assert_eq!(workflow.tasks.len(), 1);
        assert_eq!(manager.find_task(&task_id).unwrap().workflow_id.as_deref(), Some("typo-id"));
    }

    #[test]
    fn complete_records_result_and_timestamps() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        let id = manager.add_task(&wf, pending("A", 5));

        manager.complete_task(&id, json!({"delivered": true})).unwrap();
        let task = manager.find_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result, Some(json!({"delivered": true})));
        assert!(task.updated_at >= task.created_at);
    }

    #[test]
    fn terminal_tasks_reject_further_transitions() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        let id = manager.add_task(&wf, pending("A", 5));
        manager.complete_task(&id, json!(null)).unwrap();

        assert!(matches!(
            manager.complete_task(&id, json!(null)),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            manager.fail_task(&id, "late failure"),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            manager.start_task(&id),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn start_task_moves_pending_to_in_progress() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        let id = manager.add_task(&wf, pending("A", 5));

        manager.start_task(&id).unwrap();
        assert_eq!(manager.find_task(&id).unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn cancel_fires_registered_hook_once() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        let id = manager.add_task(&wf, pending("A", 5));

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        manager
            .register_cancel_hook(&id, move || flag.store(true, Ordering::SeqCst))
            .unwrap();

        manager.cancel_task(&id).unwrap();
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(manager.find_task(&id).unwrap().status, TaskStatus::Canceled);
    }

    #[test]
    fn cancel_unknown_task_is_not_found() {
        let mut manager = WorkflowManager::new();
        assert!(matches!(
            manager.cancel_task("ghost"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn register_hook_for_unknown_task_is_not_found() {
        let mut manager = WorkflowManager::new();
        let result = manager.register_cancel_hook("ghost", || {});
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn is_complete_requires_every_task_completed() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        let a = manager.add_task(&wf, pending("A", 5));
        let b = manager.add_task(&wf, pending("B", 5));

        assert!(!manager.is_complete(&wf).unwrap());
        manager.complete_task(&a, json!(null)).unwrap();
        assert!(!manager.is_complete(&wf).unwrap());
        manager.complete_task(&b, json!(null)).unwrap();
        assert!(manager.is_complete(&wf).unwrap());
    }

    #[test]
    fn is_complete_unknown_workflow_is_not_found() {
        let manager = WorkflowManager::new();
        assert!(matches!(
            manager.is_complete("ghost"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn set_final_task_validates_membership() {
        let mut manager = WorkflowManager::new();
        let wf = manager.create_workflow("errands", false);
        let id = manager.add_task(&wf, pending("A", 5));

        manager.set_final_task(&wf, &id).unwrap();
        assert_eq!(manager.workflow(&wf).unwrap().final_task.as_deref(), Some(id.as_str()));

        assert!(matches!(
            manager.set_final_task(&wf, "ghost"),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            manager.set_final_task("ghost", &id),
            Err(CoreError::NotFound(_))
        ));
    }
}
