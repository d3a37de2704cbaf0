//! [`Task`] and [`Workflow`] value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use volition_types::Priority;

/// Lifecycle state of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// `true` for states no further transition leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled
        )
    }
}

/// One unit of work tracked by the [`WorkflowManager`][crate::WorkflowManager].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    /// Set when the task has been added to a workflow.
    pub workflow_id: Option<String>,
    /// Ids of tasks that must complete before this one may start.
    pub dependencies: Vec<String>,
    /// Ids of finer-grained tasks this one decomposes into.
    pub subtasks: Vec<String>,
    /// Completion payload, populated by `complete_task`.
    pub result: Option<Value>,
    /// Failure description, populated by `fail_task`.
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Construct a pending task with a fresh UUID id.
    pub fn new(description: impl Into<String>, priority: Priority) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            priority,
            status: TaskStatus::Pending,
            workflow_id: None,
            dependencies: Vec::new(),
            subtasks: Vec::new(),
            result: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style helper declaring a prerequisite task.
    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    /// Builder-style helper declaring a subtask reference.
    pub fn with_subtask(mut self, task_id: impl Into<String>) -> Self {
        self.subtasks.push(task_id.into());
        self
    }
}

/// An ordered grouping of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    /// Insertion-ordered task list; order breaks priority ties.
    pub tasks: Vec<Task>,
    /// Id of the task that concludes the workflow, when one is designated.
    pub final_task: Option<String>,
    /// `true` when the workflow's tasks may be driven concurrently by an
    /// external scheduler; the core itself never parallelizes them.
    pub is_async: bool,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    pub(crate) fn new(id: String, name: impl Into<String>, is_async: bool) -> Self {
        Self {
            id,
            name: name.into(),
            tasks: Vec::new(),
            final_task: None,
            is_async,
            created_at: Utc::now(),
        }
    }
}
