//! Built-in actions.
//!
//! The canonical capabilities every session carries: the conversational
//! fallback, the memory-retrieval fallback, the designated error action, the
//! idle no-op, and the adaptive-strategy route.  These are the action names
//! the Decision Synthesizer substitutes when a completion reply names
//! something the catalog does not know.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::warn;
use volition_types::CoreError;

use crate::handler::{ActionHandler, ExecutionContext};
use crate::registry::{ActionCatalog, ActionSpec};
use crate::{ACTION_ADAPTIVE, ACTION_ERROR, ACTION_MEMORY_RECALL, ACTION_NO_OP, ACTION_RESPOND};

/// Maximum number of memory snippets the recall action requests.
const MAX_RECALL: usize = 5;

// ─────────────────────────────────────────────────────────────────────────────
// respond
// ─────────────────────────────────────────────────────────────────────────────

/// Conversational fallback: composes a reply from the decision parameters,
/// the reasoning trace, or the triggering perception, in that order.
pub struct RespondHandler;

#[async_trait]
impl ActionHandler for RespondHandler {
    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        parameters: &Map<String, Value>,
    ) -> Result<Option<Value>, CoreError> {
        let supplied = parameters
            .get("text")
            .or_else(|| parameters.get("message"))
            .and_then(Value::as_str);

        let response = match supplied {
            Some(text) => text.to_string(),
            None if !ctx.reasoning.is_empty() => ctx.reasoning.clone(),
            None => match ctx.perception.as_ref().and_then(|p| p.text()) {
                Some(heard) => format!("Let me get back to you on: {heard}"),
                None => "I'm listening.".to_string(),
            },
        };

        Ok(Some(json!({ "response": response })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// respond with memory retrieval
// ─────────────────────────────────────────────────────────────────────────────

/// Memory-retrieval fallback: queries the narrow memory boundary and folds
/// the returned snippets into a reply.
///
/// With no memory backend configured the handler still succeeds, returning an
/// empty memory list, so personal questions degrade to an honest "I don't
/// remember" instead of an execution failure.
pub struct RecallHandler;

#[async_trait]
impl ActionHandler for RecallHandler {
    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        parameters: &Map<String, Value>,
    ) -> Result<Option<Value>, CoreError> {
        let query = parameters
            .get("query")
            .and_then(Value::as_str)
            .or_else(|| ctx.perception.as_ref().and_then(|p| p.text()))
            .unwrap_or_default()
            .to_string();

        let snippets = match &ctx.memory {
            Some(memory) => memory.recall(&query, MAX_RECALL)?,
            None => {
                warn!("memory recall requested but no memory backend is configured");
                Vec::new()
            }
        };

        let response = if snippets.is_empty() {
            format!("I don't have any stored memories matching \"{query}\".")
        } else {
            let recalled: Vec<&str> = snippets.iter().map(|s| s.content.as_str()).collect();
            format!("Here is what I remember: {}", recalled.join("; "))
        };

        Ok(Some(json!({
            "response": response,
            "query": query,
            "memories": serde_json::to_value(&snippets).unwrap_or(Value::Null),
        })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// error
// ─────────────────────────────────────────────────────────────────────────────

/// The designated error action: a best-effort apology composed from whatever
/// context is available, so the agent degrades to a conversational fallback
/// instead of terminating.
pub struct ErrorHandler;

#[async_trait]
impl ActionHandler for ErrorHandler {
    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        parameters: &Map<String, Value>,
    ) -> Result<Option<Value>, CoreError> {
        let requested = parameters.get("requested_action").and_then(Value::as_str);

        let mut response = String::from("I'm sorry, I wasn't able to complete that request.");
        if let Some(name) = requested {
            response.push_str(&format!(" I don't have a capability called '{name}'."));
        }
        if !ctx.reasoning.is_empty() {
            response.push_str(&format!(" For context: {}", ctx.reasoning));
        }
        let goals: Vec<&str> = ctx.active_goals.iter().map(|g| g.name.as_str()).collect();
        if !goals.is_empty() {
            response.push_str(&format!(" I'm still working toward: {}.", goals.join(", ")));
        }

        Ok(Some(json!({
            "response": response,
            "requested_action": requested,
        })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// no_op
// ─────────────────────────────────────────────────────────────────────────────

/// Does nothing, successfully.
pub struct NoOpHandler;

#[async_trait]
impl ActionHandler for NoOpHandler {
    async fn invoke(
        &self,
        _ctx: &ExecutionContext,
        _parameters: &Map<String, Value>,
    ) -> Result<Option<Value>, CoreError> {
        Ok(Some(json!({ "status": "idle" })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// adaptive_strategy
// ─────────────────────────────────────────────────────────────────────────────

/// Route for contexts that signal simultaneously high urgency and high risk:
/// acknowledges the condition and records the signal values for downstream
/// planning instead of charging ahead with a normal action.
pub struct AdaptiveHandler;

#[async_trait]
impl ActionHandler for AdaptiveHandler {
    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        _parameters: &Map<String, Value>,
    ) -> Result<Option<Value>, CoreError> {
        let signal = |key: &str| {
            ctx.perception
                .as_ref()
                .and_then(|p| p.data.get(key).cloned())
                .unwrap_or(Value::Null)
        };

        Ok(Some(json!({
            "response": "Conditions are both urgent and high-risk; switching to a cautious adaptive strategy.",
            "strategy": "reassess",
            "urgency": signal("urgency"),
            "risk": signal("risk"),
        })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Installation
// ─────────────────────────────────────────────────────────────────────────────

/// Register all five built-in actions on `catalog`.
pub fn install_builtin_actions(catalog: &mut ActionCatalog) -> Result<(), CoreError> {
    catalog.register(
        ActionSpec::new(
            ACTION_RESPOND,
            "Compose a conversational reply from the available context.",
            5,
        )
        .with_parameter("text", false),
        Arc::new(RespondHandler),
    )?;
    catalog.register(
        ActionSpec::new(
            ACTION_MEMORY_RECALL,
            "Answer by retrieving prior memories relevant to a query.",
            6,
        )
        .with_parameter("query", false),
        Arc::new(RecallHandler),
    )?;
    catalog.register(
        ActionSpec::new(
            ACTION_ERROR,
            "Apologize and degrade gracefully when a request cannot be served.",
            8,
        )
        .with_parameter("requested_action", false),
        Arc::new(ErrorHandler),
    )?;
    catalog.register(
        ActionSpec::new(ACTION_NO_OP, "Stay idle for this cycle.", 1),
        Arc::new(NoOpHandler),
    )?;
    catalog.register(
        ActionSpec::new(
            ACTION_ADAPTIVE,
            "Reassess before acting when the situation is both urgent and risky.",
            9,
        ),
        Arc::new(AdaptiveHandler),
    )?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
