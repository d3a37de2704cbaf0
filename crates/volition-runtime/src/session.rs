//! [`AgentSession`] – owner of the decision pipeline and its registries.
//!
//! The session replaces any notion of ambient global state: it constructs
//! the [`ActionCatalog`], [`IntentRegistry`], [`WorkflowManager`], and the
//! memory store once, injects them into every consumer, and tears them down
//! explicitly via [`AgentSession::shutdown`].
//!
//! The one entry point that matters is [`AgentSession::handle`]: perception
//! in, executed (or parked) decision out, never an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use volition_runtime::session::{AgentSession, SessionConfig};
//! use volition_types::Perception;
//! use serde_json::json;
//!
//! # async fn demo() {
//! let mut session = AgentSession::new(SessionConfig::default()).unwrap();
//! let perception = Perception::new("hearing", "cli")
//!     .with_datum("text", json!("What is my next meeting?"));
//! let decision = session.handle(Some(perception)).await;
//! println!("{:?}", decision.result);
//! # }
//! ```

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use volition_catalog::{
    ActionCatalog, ActionPlugin, ExecutionContext, install_builtin_actions, install_plugin,
};
use volition_intents::{GoalSpec, IntentRegistry, RoleSpec};
use volition_memory::RecallStore;
use volition_tasks::WorkflowManager;
use volition_types::{CoreError, Decision, DecisionStatus, MemoryRecall, Perception};

use crate::completion::{CompletionBackend, OpenAiCompatClient};
use crate::executor::DecisionExecutor;
use crate::synthesizer::DecisionSynthesizer;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`AgentSession`].
pub struct SessionConfig {
    /// Base URL of the OpenAI-compatible completion server.
    pub completion_base_url: String,
    /// Model name to request.
    pub completion_model: String,
    /// Bound on the short-term perception history.
    pub history_capacity: usize,
    /// Optional path to the persistent memory-snippet database.
    /// If `None`, an in-memory store is used (data lost on shutdown).
    pub memory_path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            completion_base_url: "http://localhost:11434".to_string(),
            completion_model: "llama3".to_string(),
            history_capacity: 32,
            memory_path: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AgentSession
// ─────────────────────────────────────────────────────────────────────────────

/// One agent session: registries, memory, synthesizer, and executor, with a
/// defined construction/teardown lifecycle.
pub struct AgentSession {
    id: Uuid,
    catalog: ActionCatalog,
    intents: IntentRegistry,
    workflows: WorkflowManager,
    memory: Arc<RecallStore>,
    synthesizer: DecisionSynthesizer,
    executor: DecisionExecutor,
}

impl AgentSession {
    /// Construct a session talking to the configured OpenAI-compatible
    /// completion server.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the configured memory path
    /// cannot be opened.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let backend = Arc::new(OpenAiCompatClient::new(
            &config.completion_base_url,
            &config.completion_model,
        ));
        Self::with_backend(config, backend)
    }

    /// Construct a session over an arbitrary completion backend (used by
    /// tests and by callers bringing their own transport).
    pub fn with_backend(
        config: SessionConfig,
        backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self, CoreError> {
        let memory = match &config.memory_path {
            Some(path) => {
                info!(path, "opening persistent memory store");
                RecallStore::open(path).map_err(|e| {
                    CoreError::Validation(format!("failed to open memory store at {path}: {e}"))
                })?
            }
            None => {
                warn!("no memory_path configured; using an in-memory store (data lost on shutdown)");
                RecallStore::open_in_memory().map_err(|e| {
                    CoreError::Validation(format!("failed to open in-memory store: {e}"))
                })?
            }
        };

        let mut catalog = ActionCatalog::new();
        install_builtin_actions(&mut catalog)?;

        Ok(Self {
            id: Uuid::new_v4(),
            catalog,
            intents: IntentRegistry::new(),
            workflows: WorkflowManager::new(),
            memory: Arc::new(memory),
            synthesizer: DecisionSynthesizer::new(backend)
                .with_history_capacity(config.history_capacity),
            executor: DecisionExecutor::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut ActionCatalog {
        &mut self.catalog
    }

    pub fn intents(&self) -> &IntentRegistry {
        &self.intents
    }

    pub fn intents_mut(&mut self) -> &mut IntentRegistry {
        &mut self.intents
    }

    pub fn workflows(&self) -> &WorkflowManager {
        &self.workflows
    }

    pub fn workflows_mut(&mut self) -> &mut WorkflowManager {
        &mut self.workflows
    }

    pub fn memory(&self) -> Arc<RecallStore> {
        Arc::clone(&self.memory)
    }

    // -------------------------------------------------------------------------
    // Intent and plugin wiring
    // -------------------------------------------------------------------------

    /// Adopt a role described at the boundary, canonicalizing it first.
    pub fn adopt_role(&mut self, spec: RoleSpec) {
        self.intents.upsert_role(spec.canonicalize());
    }

    /// Adopt a goal described at the boundary, canonicalizing it first.
    pub fn adopt_goal(&mut self, spec: GoalSpec) {
        self.intents.upsert_goal(spec.canonicalize());
    }

    /// Install a plugin: its actions land in the catalog (with teardown
    /// tracking) and its intents in the registry.  Returns the installed
    /// action names.
    pub fn install_plugin(
        &mut self,
        plugin: Arc<dyn ActionPlugin>,
    ) -> Result<Vec<String>, CoreError> {
        let intents = plugin.intents();
        let installed = install_plugin(&mut self.catalog, plugin)?;
        for role in intents.roles {
            self.intents.upsert_role(role);
        }
        for goal in intents.goals {
            self.intents.upsert_goal(goal);
        }
        Ok(installed)
    }

    /// Record a memory snippet on behalf of the session.
    pub fn record_memory(&self, content: &str) -> Result<(), CoreError> {
        self.memory
            .record("session", content)
            .map(|_| ())
            .map_err(|e| CoreError::Execution(format!("failed to record memory: {e}")))
    }

    // -------------------------------------------------------------------------
    // The pipeline
    // -------------------------------------------------------------------------

    /// Run the full perceive → synthesize → execute pipeline.
    ///
    /// Never returns an error: synthesis failures degrade to an `"error"`
    /// decision and execution failures are absorbed by the catalog, so the
    /// returned decision always tells the whole story.
    pub async fn handle(&mut self, perception: Option<Perception>) -> Decision {
        let mut decision = self
            .synthesizer
            .synthesize(perception.clone(), &self.intents, &self.catalog)
            .await;

        if decision.status == DecisionStatus::NotExecuted {
            let ctx = self.execution_context(perception, &decision);
            self.executor
                .execute(&mut decision, &self.catalog, &ctx)
                .await;
        }
        decision
    }

    /// Resolve a decision parked in `PendingApproval`.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] when the decision is in any other state.
    pub async fn approve(
        &mut self,
        decision: &mut Decision,
        approved: bool,
    ) -> Result<(), CoreError> {
        let ctx = self.execution_context(None, decision);
        self.executor
            .resolve_pending(decision, approved, &self.catalog, &ctx)
            .await
    }

    /// Resume a decision parked in `Deferred`.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] when the decision is in any other state.
    pub async fn resume(&mut self, decision: &mut Decision) -> Result<(), CoreError> {
        let ctx = self.execution_context(None, decision);
        self.executor
            .resume_deferred(decision, &self.catalog, &ctx)
            .await
    }

    /// Tear the session down: every catalog entry is unregistered so plugin
    /// teardown hooks fire, then the session is dropped.
    pub fn shutdown(mut self) {
        for name in self.catalog.names() {
            // names() only returns registered entries, so this cannot fail.
            let _ = self.catalog.unregister(&name);
        }
        info!(session = %self.id, "agent session shut down");
    }

    fn execution_context(
        &self,
        perception: Option<Perception>,
        decision: &Decision,
    ) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(self.id);
        ctx.perception = perception;
        ctx.active_roles = self.intents.active_roles().into_iter().cloned().collect();
        ctx.active_goals = self.intents.active_goals().into_iter().cloned().collect();
        ctx.reasoning = decision.reasoning.clone();
        ctx.memory = Some(Arc::clone(&self.memory) as Arc<dyn MemoryRecall>);
        ctx
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{ChatMessage, CompletionError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use volition_catalog::{ACTION_MEMORY_RECALL, ACTION_NO_OP, ACTION_RESPOND};
    use volition_types::{ExecutionMode, Priority};

    struct Scripted {
        replies: Mutex<VecDeque<String>>,
    }

    impl Scripted {
        fn replying(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, CompletionError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CompletionError::BadResponse("script exhausted".into()))
        }
    }

    fn session_with(replies: &[&str]) -> AgentSession {
        AgentSession::with_backend(SessionConfig::default(), Scripted::replying(replies))
            .unwrap()
    }

    fn hearing(text: &str) -> Perception {
        Perception::new("hearing", "test").with_datum("text", json!(text))
    }

    #[tokio::test]
    async fn end_to_end_memory_question_lands_in_recall() {
        let reply = json!({
            "action": "lookup_calendar",
            "parameters": {},
            "reasoning": "needs calendar access",
            "confidence": 0.8,
            "priority": 5
        })
        .to_string();
        let mut session = session_with(&[&reply]);
        session
            .record_memory("The user's next meeting is Friday at 3pm.")
            .unwrap();

        let decision = session
            .handle(Some(hearing("What is my next meeting?")))
            .await;

        assert_eq!(decision.action, ACTION_MEMORY_RECALL);
        assert_eq!(decision.status, DecisionStatus::Executed);
        let result = decision.result.unwrap();
        assert!(result.success);
        let response = result.payload["response"].as_str().unwrap();
        assert!(response.contains("Friday at 3pm"), "got: {response}");
    }

    #[tokio::test]
    async fn end_to_end_factual_question_lands_in_respond() {
        let reply = json!({
            "action": "lookup_fact",
            "parameters": {"text": "Paris."},
            "reasoning": "a factual question",
            "confidence": 0.8,
            "priority": 5
        })
        .to_string();
        let mut session = session_with(&[&reply]);

        let decision = session
            .handle(Some(hearing("What is the capital of France?")))
            .await;

        assert_eq!(decision.action, ACTION_RESPOND);
        assert_eq!(decision.status, DecisionStatus::Executed);
        assert_eq!(decision.result.unwrap().payload["response"], "Paris.");
    }

    #[tokio::test]
    async fn no_perception_short_circuits_the_pipeline() {
        let mut session = session_with(&[]);
        let decision = session.handle(None).await;
        assert_eq!(decision.action, ACTION_NO_OP);
        assert_eq!(decision.status, DecisionStatus::Executed);
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_an_apology() {
        // Empty script: the backend errors on the first call.
        let mut session = session_with(&[]);
        let decision = session.handle(Some(hearing("Hello?"))).await;

        assert_eq!(decision.status, DecisionStatus::Executed);
        let result = decision.result.unwrap();
        assert!(result.success);
        let response = result.payload["response"].as_str().unwrap();
        assert!(response.contains("sorry"), "got: {response}");
    }

    #[tokio::test]
    async fn active_intents_bias_decision_priority() {
        let reply = json!({"action": "respond", "priority": 2}).to_string();
        let mut session = session_with(&[&reply]);
        session.adopt_goal(GoalSpec {
            name: "guard_the_house".into(),
            priority: Some(8),
            ..GoalSpec::default()
        });

        let decision = session.handle(Some(hearing("anything new?"))).await;
        assert_eq!(decision.priority, Priority::HIGH);
        assert_eq!(decision.related_goals, vec!["guard_the_house"]);
    }

    #[tokio::test]
    async fn approve_flow_resolves_a_parked_decision() {
        let mut session = session_with(&[]);
        let mut decision = Decision::new(ACTION_RESPOND);
        decision.execution_mode = ExecutionMode::UserApproval;
        decision.status = DecisionStatus::PendingApproval;

        session.approve(&mut decision, true).await.unwrap();
        assert_eq!(decision.status, DecisionStatus::Executed);
        assert!(decision.result.unwrap().success);
    }

    #[tokio::test]
    async fn resume_flow_runs_a_deferred_decision() {
        let mut session = session_with(&[]);
        let mut decision = Decision::new(ACTION_RESPOND);
        decision.execution_mode = ExecutionMode::Deferred;
        decision.status = DecisionStatus::Deferred;

        session.resume(&mut decision).await.unwrap();
        assert_eq!(decision.status, DecisionStatus::Executed);
    }

    #[tokio::test]
    async fn shutdown_fires_plugin_teardowns() {
        use volition_catalog::{ActionHandler, ActionSpec, FnHandler};

        struct CountingPlugin {
            teardowns: AtomicUsize,
        }

        impl ActionPlugin for CountingPlugin {
            fn name(&self) -> &str {
                "counting"
            }
            fn actions(&self) -> Vec<(ActionSpec, Arc<dyn ActionHandler>)> {
                vec![(
                    ActionSpec::new("custom_action", "", 5),
                    FnHandler::new(|_, _| Ok(Some(json!({})))),
                )]
            }
            fn teardown(&self, _action: &str) {
                self.teardowns.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut session = session_with(&[]);
        let plugin = Arc::new(CountingPlugin {
            teardowns: AtomicUsize::new(0),
        });
        session
            .install_plugin(Arc::clone(&plugin) as Arc<dyn ActionPlugin>)
            .unwrap();

        session.shutdown();
        assert_eq!(plugin.teardowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn adopt_role_canonicalizes_at_the_boundary() {
        let mut session = session_with(&[]);
        session.adopt_role(RoleSpec::new("Night Watch"));

        let roles = session.intents().active_roles();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, "night_watch");
    }
}
