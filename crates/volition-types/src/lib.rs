//! `volition-types` – shared value types for the decision core.
//!
//! Every other crate in the workspace depends on this one and nothing here
//! depends on anything else in the workspace.  The types fall into four
//! groups:
//!
//! - The **priority scale**: [`Priority`], a clamped 1–10 scale with named
//!   levels, used by roles, goals, catalog entries, tasks, and decisions.
//! - The **perception/decision pair**: [`Perception`] (a normalized input
//!   event) and [`Decision`] (the structured outcome of reasoning over one).
//! - The **intent types**: [`Role`] and [`Goal`], the prioritized stateful
//!   intents that bias decision priority.
//! - The **error taxonomy**: [`CoreError`], spanning registration validation,
//!   unknown references, completion transport, reply parsing, and handler
//!   execution failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Error taxonomy
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type spanning catalog registration, entity lookup, completion
/// transport, reply parsing, and action execution failures.
///
/// Propagation policy: [`CoreError::Validation`] and [`CoreError::NotFound`]
/// indicate programmer or configuration mistakes and propagate directly to
/// the caller.  [`CoreError::Transport`] and [`CoreError::Parse`] are fully
/// absorbed by the Decision Synthesizer and converted into "error" decisions.
/// [`CoreError::Execution`] is absorbed inside the Action Catalog and only
/// surfaces as a structured [`ActionOutcome`] on the decision.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Completion transport failure: {0}")]
    Transport(String),

    #[error("Reply parse failure: {0}")]
    Parse(String),

    #[error("Action execution failure: {0}")]
    Execution(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Priority scale
// ─────────────────────────────────────────────────────────────────────────────

/// A priority on the canonical 1–10 scale.
///
/// Two construction paths with deliberately different semantics:
///
/// - [`Priority::validated`] rejects out-of-range values with
///   [`CoreError::Validation`] – the registration path, where an out-of-range
///   priority is a caller mistake.
/// - [`Priority::clamped`] clamps to the nearest bound – the normalization
///   path for values arriving from the completion capability, which must
///   never fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const LOWEST: Priority = Priority(1);
    pub const LOW: Priority = Priority(3);
    pub const MEDIUM_LOW: Priority = Priority(4);
    pub const MEDIUM: Priority = Priority(5);
    pub const MEDIUM_HIGH: Priority = Priority(6);
    pub const HIGH: Priority = Priority(8);
    pub const CRITICAL: Priority = Priority(10);

    /// Construct a priority, failing with [`CoreError::Validation`] when the
    /// value falls outside `1..=10`.
    pub fn validated(value: i64) -> Result<Self, CoreError> {
        if (1..=10).contains(&value) {
            Ok(Priority(value as u8))
        } else {
            Err(CoreError::Validation(format!(
                "priority {value} is outside the 1-10 scale"
            )))
        }
    }

    /// Construct a priority by clamping `value` to the nearest bound of
    /// `1..=10`.
    pub fn clamped(value: i64) -> Self {
        Priority(value.clamp(1, 10) as u8)
    }

    /// Normalize a loosely-typed priority value from a completion reply.
    ///
    /// Accepts integers (clamped), floats (rounded then clamped), level names
    /// (`"low"`, `"medium"`, `"high"`, …), and numeric strings.  Returns
    /// `None` for anything else; the caller decides the default.
    pub fn from_loose(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Priority::clamped(i))
                } else {
                    n.as_f64().map(|f| Priority::clamped(f.round() as i64))
                }
            }
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The raw 1–10 value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    /// Parse a level name or numeric string, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        if let Ok(n) = lowered.parse::<i64>() {
            return Ok(Priority::clamped(n));
        }
        match lowered.replace(['-', ' '], "_").as_str() {
            "lowest" => Ok(Priority::LOWEST),
            "low" => Ok(Priority::LOW),
            "medium_low" => Ok(Priority::MEDIUM_LOW),
            "medium" | "normal" => Ok(Priority::MEDIUM),
            "medium_high" => Ok(Priority::MEDIUM_HIGH),
            "high" => Ok(Priority::HIGH),
            "highest" | "critical" | "urgent" => Ok(Priority::CRITICAL),
            other => Err(CoreError::Parse(format!(
                "'{other}' is not a recognized priority level"
            ))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Perception
// ─────────────────────────────────────────────────────────────────────────────

/// A single normalized input event delivered to the agent.
///
/// Created at the boundary, consumed once by the Decision Synthesizer, then
/// appended to its bounded perception history as short-term context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perception {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Modality label, e.g. `"hearing"`, `"vision"`, `"timer"`.
    pub kind: String,
    /// Free-form payload keyed by field name.  Conventionally `"text"` holds
    /// the natural-language content for conversational modalities.
    pub data: Map<String, Value>,
    /// Originating collaborator, e.g. `"channel::voice"`.
    pub source: String,
}

impl Perception {
    /// Construct an empty perception of the given kind and source, stamped
    /// with a fresh id and the current UTC time.
    pub fn new(kind: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind: kind.into(),
            data: Map::new(),
            source: source.into(),
        }
    }

    /// Builder-style helper to attach one payload field.
    pub fn with_datum(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// The `"text"` payload field, when present and a string.
    pub fn text(&self) -> Option<&str> {
        self.data.get("text").and_then(Value::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles and goals
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a [`Role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    Active,
    Inactive,
    Abandoned,
}

/// A prioritized, stateful role the agent is currently playing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Stable identifier; duplicate ids merge last-write-wins in the registry.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Permission labels this role confers, e.g. `"memory:read"`.
    pub permissions: Vec<String>,
    pub priority: Priority,
    pub status: RoleStatus,
}

impl Role {
    pub fn is_active(&self) -> bool {
        self.status == RoleStatus::Active
    }
}

/// Lifecycle state of a [`Goal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Abandoned,
}

/// A prioritized, stateful goal the agent is pursuing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Unique name; duplicate names merge last-write-wins in the registry.
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub status: GoalStatus,
}

impl Goal {
    pub fn is_active(&self) -> bool {
        self.status == GoalStatus::Active
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decisions
// ─────────────────────────────────────────────────────────────────────────────

/// Policy governing whether a decision runs immediately, awaits approval, or
/// is deferred to an external scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Auto,
    UserApproval,
    Deferred,
}

/// Lifecycle state of a [`Decision`].
///
/// `NotExecuted` is the initial state; the Decision Executor transitions it
/// exactly once to one of the other three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    NotExecuted,
    PendingApproval,
    Deferred,
    Executed,
}

/// Structured result of one action execution.
///
/// The Action Catalog's `execute` never raises: handler failures, empty
/// returns, and unknown-action redirects all land here as `success = false`
/// outcomes with a populated `error` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    /// Handler payload on success; best-effort context on failure.
    pub payload: Value,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn success(payload: Value) -> Self {
        Self {
            success: true,
            payload,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: Value::Null,
            error: Some(message.into()),
        }
    }
}

/// The structured outcome of reasoning over a [`Perception`]: which action to
/// invoke, with what parameters, and under what execution policy.
///
/// Created once by the Decision Synthesizer (status `NotExecuted`), mutated
/// exactly once by the Decision Executor (status + result), then retained as
/// immutable history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Name of the catalog action to invoke.  After synthesis this always
    /// resolves to a registered entry – never left dangling.
    pub action: String,
    pub parameters: Map<String, Value>,
    pub reasoning: String,
    /// Model self-estimate in `[0, 1]`.
    pub confidence: f64,
    pub priority: Priority,
    pub execution_mode: ExecutionMode,
    pub status: DecisionStatus,
    /// Populated by the executor once the decision has run.
    pub result: Option<ActionOutcome>,
    /// Names of currently-active roles whose priority is at least this
    /// decision's priority.
    pub related_roles: Vec<String>,
    /// Names of currently-active goals whose priority is at least this
    /// decision's priority.
    pub related_goals: Vec<String>,
}

impl Decision {
    /// Construct a decision targeting `action` with neutral defaults:
    /// medium priority, confidence 0.5, mode `Auto`, status `NotExecuted`.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            action: action.into(),
            parameters: Map::new(),
            reasoning: String::new(),
            confidence: 0.5,
            priority: Priority::MEDIUM,
            execution_mode: ExecutionMode::Auto,
            status: DecisionStatus::NotExecuted,
            result: None,
            related_roles: Vec::new(),
            related_goals: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory boundary
// ─────────────────────────────────────────────────────────────────────────────

/// A prior memory fragment returned by the narrow memory boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnippet {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Component that recorded the memory.
    pub source: String,
    pub content: String,
}

/// The only memory capability the decision core consumes: given a query
/// string, return zero or more prior memory snippets.
///
/// Implemented by `volition-memory`; storage internals are a collaborator
/// concern.
pub trait MemoryRecall: Send + Sync {
    fn recall(&self, query: &str, limit: usize) -> Result<Vec<MemorySnippet>, CoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
