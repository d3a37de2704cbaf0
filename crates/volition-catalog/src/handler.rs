//! [`ActionHandler`] – the invocation seam every catalog action implements.
//!
//! Handlers receive an [`ExecutionContext`] (the session state relevant to
//! one invocation) plus the decision's parameter map, and return an optional
//! JSON payload.  The catalog converts every possible handler outcome into a
//! structured [`ActionOutcome`][volition_types::ActionOutcome]:
//!
//! | handler returns | catalog produces |
//! |---|---|
//! | `Ok(Some(payload))` | success outcome |
//! | `Ok(None)` | "empty result" failure outcome |
//! | `Err(_)` | execution-failure outcome (never re-raised) |

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;
use volition_types::{CoreError, Goal, MemoryRecall, Perception, Role};

// ─────────────────────────────────────────────────────────────────────────────
// ExecutionContext
// ─────────────────────────────────────────────────────────────────────────────

/// Per-invocation view of the session state, assembled by the caller and
/// handed to every handler.
///
/// The designated error action uses `reasoning`, `active_roles`, and
/// `active_goals` to compose its apology; the memory-recall action uses
/// `memory` and `perception`.
#[derive(Clone)]
pub struct ExecutionContext {
    pub session_id: Uuid,
    /// The perception that triggered the decision being executed, if any.
    pub perception: Option<Perception>,
    pub active_roles: Vec<Role>,
    pub active_goals: Vec<Goal>,
    /// The decision's reasoning text, available as a recent reasoning trace.
    pub reasoning: String,
    /// Narrow memory boundary, when the session has one configured.
    pub memory: Option<Arc<dyn MemoryRecall>>,
}

impl ExecutionContext {
    /// An empty context for the given session.
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            perception: None,
            active_roles: Vec::new(),
            active_goals: Vec::new(),
            reasoning: String::new(),
            memory: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ActionHandler
// ─────────────────────────────────────────────────────────────────────────────

/// An invokable capability.
///
/// Handlers may perform their own I/O; the invocation is a suspension point.
/// Returning `Ok(None)` signals "ran but produced nothing", which the catalog
/// reports as an empty-result failure rather than a silent success.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        parameters: &Map<String, Value>,
    ) -> Result<Option<Value>, CoreError>;
}

/// Adapter turning a plain closure into an [`ActionHandler`].
///
/// Useful for tests and for plugins whose actions have no state of their own.
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(&ExecutionContext, &Map<String, Value>) -> Result<Option<Value>, CoreError>
        + Send
        + Sync
        + 'static,
{
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self(f))
    }
}

#[async_trait]
impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(&ExecutionContext, &Map<String, Value>) -> Result<Option<Value>, CoreError>
        + Send
        + Sync
        + 'static,
{
    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        parameters: &Map<String, Value>,
    ) -> Result<Option<Value>, CoreError> {
        (self.0)(ctx, parameters)
    }
}
