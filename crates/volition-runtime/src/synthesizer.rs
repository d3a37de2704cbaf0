//! [`DecisionSynthesizer`] – perception in, validated decision out.
//!
//! Each synthesis cycle builds one structured completion request from the
//! perception, the active roles/goals, and the enabled action catalog, sends
//! it to the [`CompletionBackend`], and normalizes the reply into a
//! [`Decision`] through a strict validation pipeline:
//!
//! 1. the reply must parse as a [`DecisionReply`] (Markdown code fences are
//!    stripped first) – a malformed reply becomes an `"error"` decision
//!    carrying the raw text;
//! 2. the named action must exist in the catalog – unknown names are
//!    remapped to the memory-retrieval action when the context carries
//!    memory vocabulary, and to `"respond"` otherwise, with the substitution
//!    recorded in the reasoning;
//! 3. the priority is normalized to the 1–10 scale (level names accepted,
//!    out-of-range values clamped, garbage defaulting to medium) and raised
//!    to the intent registry's priority floor;
//! 4. the confidence is coerced into `[0, 1]`, defaulting to 0.5.
//!
//! **`synthesize` never returns an error.**  Transport and parse failures
//! are absorbed into `"error"` decisions; a missing perception short-circuits
//! to an already-executed no-op decision without calling the completion
//! capability at all.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use volition_catalog::{
    ACTION_ADAPTIVE, ACTION_ERROR, ACTION_MEMORY_RECALL, ACTION_NO_OP, ACTION_RESPOND,
    ActionCatalog,
};
use volition_intents::IntentRegistry;
use volition_types::{ActionOutcome, Decision, DecisionStatus, Perception, Priority};

use crate::completion::{ChatMessage, CompletionBackend, DecisionReply, Role};

/// Default bound on the short-term perception history.
const DEFAULT_HISTORY_CAPACITY: usize = 32;

/// How many prior perceptions are folded into the prompt as context.
const PROMPT_HISTORY: usize = 3;

/// Standalone words treated as memory/recall vocabulary when deciding where
/// to remap an unknown action.
const MEMORY_VOCAB: &[&str] = &[
    "my", "mine", "i", "me", "we", "us", "our", "remember", "recall", "earlier", "previously",
];

/// Threshold above which a numeric urgency/risk signal counts as high.
const SIGNAL_HIGH: f64 = 0.8;

// ─────────────────────────────────────────────────────────────────────────────
// DecisionSynthesizer
// ─────────────────────────────────────────────────────────────────────────────

/// Turns perceptions into validated decisions via the completion capability.
///
/// Owns the bounded perception history; callers streaming perceptions must
/// serialize their `synthesize` calls to preserve history ordering.
pub struct DecisionSynthesizer {
    backend: Arc<dyn CompletionBackend>,
    history: VecDeque<Perception>,
    capacity: usize,
}

impl DecisionSynthesizer {
    /// Create a synthesizer over the given completion backend with the
    /// default history capacity.
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            history: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Override the perception-history bound.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// The retained perception history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Perception> {
        self.history.iter()
    }

    /// Synthesize one decision.  Never returns an error; see the module docs
    /// for the failure semantics.
    pub async fn synthesize(
        &mut self,
        perception: Option<Perception>,
        intents: &IntentRegistry,
        catalog: &ActionCatalog,
    ) -> Decision {
        let Some(perception) = perception else {
            debug!("no perception available; synthesizing a no-op decision");
            return no_op_decision();
        };

        self.history.push_back(perception.clone());
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        let messages = self.build_messages(&perception, intents, catalog);

        let raw = match self.backend.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "completion transport failed; degrading to an error decision");
                return error_decision(
                    format!("the completion capability could not be reached: {e}"),
                    None,
                );
            }
        };

        let reply: DecisionReply = match serde_json::from_str(strip_code_fences(&raw)) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "completion reply failed to parse; degrading to an error decision");
                return error_decision(
                    format!("the completion reply did not match the expected shape: {e}"),
                    Some(raw),
                );
            }
        };

        self.validate(reply, &perception, intents, catalog)
    }

    // -------------------------------------------------------------------------
    // Validation pipeline
    // -------------------------------------------------------------------------

    fn validate(
        &self,
        reply: DecisionReply,
        perception: &Perception,
        intents: &IntentRegistry,
        catalog: &ActionCatalog,
    ) -> Decision {
        let mut reasoning = reply.reasoning;

        // 2. The action must resolve to a catalog entry.
        let mut action = if catalog.contains(&reply.action) {
            reply.action
        } else {
            let memoryish = perception.text().map(mentions_memory).unwrap_or(false)
                || mentions_memory(&reply.action);
            let substitute = if memoryish {
                ACTION_MEMORY_RECALL
            } else {
                ACTION_RESPOND
            };
            append_note(
                &mut reasoning,
                &format!(
                    "requested action '{}' is not in the catalog; substituting '{substitute}'",
                    reply.action
                ),
            );
            substitute.to_string()
        };

        // High urgency together with high risk routes to the adaptive
        // strategy instead of whatever was requested.
        if is_crisis(perception) && catalog.contains(ACTION_ADAPTIVE) {
            append_note(
                &mut reasoning,
                "urgency and risk are both high; routing to the adaptive strategy",
            );
            action = ACTION_ADAPTIVE.to_string();
        }

        // 3. Normalize the priority, then apply the intent floor.
        let replied_priority = reply
            .priority
            .as_ref()
            .and_then(Priority::from_loose)
            .unwrap_or(Priority::MEDIUM);
        let priority = replied_priority.max(intents.priority_floor());

        // 4. Coerce the confidence into [0, 1].
        let confidence = reply
            .confidence
            .as_ref()
            .and_then(coerce_confidence)
            .unwrap_or(0.5);

        let related_roles = intents
            .active_roles()
            .into_iter()
            .filter(|r| r.priority >= priority)
            .map(|r| r.name.clone())
            .collect();
        let related_goals = intents
            .active_goals()
            .into_iter()
            .filter(|g| g.priority >= priority)
            .map(|g| g.name.clone())
            .collect();

        let mut decision = Decision::new(action);
        decision.parameters = reply.parameters;
        decision.reasoning = reasoning;
        decision.confidence = confidence;
        decision.priority = priority;
        decision.related_roles = related_roles;
        decision.related_goals = related_goals;
        decision
    }

    // -------------------------------------------------------------------------
    // Prompt construction
    // -------------------------------------------------------------------------

    fn build_messages(
        &self,
        perception: &Perception,
        intents: &IntentRegistry,
        catalog: &ActionCatalog,
    ) -> Vec<ChatMessage> {
        let roles: Vec<String> = intents
            .active_roles()
            .into_iter()
            .map(|r| format!("- {} (priority {}, active)", r.name, r.priority))
            .collect();
        let goals: Vec<String> = intents
            .active_goals()
            .into_iter()
            .map(|g| format!("- {} (priority {}, active)", g.name, g.priority))
            .collect();
        let actions: Vec<String> = catalog
            .list_active()
            .into_iter()
            .map(|e| format!("- {} (priority {}): {}", e.name, e.priority, e.description))
            .collect();

        // Everything before the current perception, newest last.
        let recent: Vec<String> = self
            .history
            .iter()
            .rev()
            .skip(1)
            .take(PROMPT_HISTORY)
            .map(|p| format!("- [{}] {}", p.kind, p.text().unwrap_or("(no text)")))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let section = |lines: &[String]| {
            if lines.is_empty() {
                "(none)".to_string()
            } else {
                lines.join("\n")
            }
        };

        let system = format!(
            "You are the decision core of an autonomous agent.\n\
             Decide which single action to take next.\n\
             ## Active roles\n{}\n\
             ## Active goals\n{}\n\
             ## Available actions\n{}\n\
             ## Recent perceptions\n{}",
            section(&roles),
            section(&goals),
            section(&actions),
            section(&recent),
        );

        let user = match perception.text() {
            Some(text) => format!("[{} from {}] {}", perception.kind, perception.source, text),
            None => format!(
                "[{} from {}] {}",
                perception.kind,
                perception.source,
                Value::Object(perception.data.clone())
            ),
        };

        vec![
            ChatMessage {
                role: Role::System,
                content: system,
            },
            ChatMessage {
                role: Role::User,
                content: user,
            },
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision constructors
// ─────────────────────────────────────────────────────────────────────────────

/// The immediate decision returned when no perception is available: already
/// executed, nothing to do, completion capability untouched.
fn no_op_decision() -> Decision {
    let mut decision = Decision::new(ACTION_NO_OP);
    decision.priority = Priority::MEDIUM_LOW;
    decision.status = DecisionStatus::Executed;
    decision.reasoning = "no perception available; idling".to_string();
    decision.result = Some(ActionOutcome::success(
        serde_json::json!({ "status": "idle" }),
    ));
    decision
}

/// An `"error"` decision absorbing a transport or parse failure.  Left
/// `NotExecuted` so the executor runs the designated error action, which
/// composes the user-facing apology.
fn error_decision(reasoning: String, raw_reply: Option<String>) -> Decision {
    let mut decision = Decision::new(ACTION_ERROR);
    decision.reasoning = reasoning;
    decision.confidence = 0.0;
    if let Some(raw) = raw_reply {
        decision.parameters.insert("raw_reply".into(), Value::String(raw));
    }
    decision
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn append_note(reasoning: &mut String, note: &str) {
    if !reasoning.is_empty() {
        reasoning.push_str("; ");
    }
    reasoning.push_str(note);
}

/// Strip a single surrounding Markdown code fence, if present.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// `true` when `text` contains memory/recall vocabulary: first-person and
/// recall words as standalone tokens, or the phrase "last time".
fn mentions_memory(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if lowered.contains("last time") {
        return true;
    }
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| MEMORY_VOCAB.contains(&w))
}

/// `true` when the perception signals simultaneously high urgency and high
/// risk.
fn is_crisis(perception: &Perception) -> bool {
    signal_is_high(perception.data.get("urgency")) && signal_is_high(perception.data.get("risk"))
}

fn signal_is_high(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f >= SIGNAL_HIGH),
        Some(Value::String(s)) => {
            let lowered = s.to_lowercase();
            lowered == "high" || lowered == "critical"
        }
        _ => false,
    }
}

/// Coerce a loose confidence value into `[0, 1]`.  Returns `None` for
/// values that are neither numbers nor numeric strings.
fn coerce_confidence(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if number.is_finite() {
        Some(number.clamp(0.0, 1.0))
    } else {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
