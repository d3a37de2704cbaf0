//! `volition-catalog` – the Action Catalog.
//!
//! The registry of invokable capabilities that decisions resolve against.
//!
//! # Modules
//!
//! - [`handler`] – [`ActionHandler`][handler::ActionHandler]: the async
//!   invocation seam every action implements, plus the
//!   [`ExecutionContext`][handler::ExecutionContext] handed to each call.
//! - [`registry`] – [`ActionCatalog`][registry::ActionCatalog]: the
//!   name → entry map with priority/description metadata, a declared
//!   parameter schema validated at registration time, and the
//!   graceful-degradation `execute` contract: **`execute` never fails** –
//!   handler errors, empty returns, and unknown action names all come back
//!   as structured [`ActionOutcome`][volition_types::ActionOutcome] values.
//! - [`builtin`] – the canonical actions the Decision Synthesizer targets:
//!   [`ACTION_RESPOND`], [`ACTION_MEMORY_RECALL`], [`ACTION_ERROR`],
//!   [`ACTION_NO_OP`], and [`ACTION_ADAPTIVE`].
//! - [`plugin`] – [`ActionPlugin`][plugin::ActionPlugin]: the load-time
//!   boundary through which collaborators contribute actions and intents,
//!   with a per-action teardown hook fired on unregistration.

pub mod builtin;
pub mod handler;
pub mod plugin;
pub mod registry;

pub use builtin::install_builtin_actions;
pub use handler::{ActionHandler, ExecutionContext, FnHandler};
pub use plugin::{ActionPlugin, PluginIntents, install_plugin};
pub use registry::{ActionCatalog, ActionEntry, ActionSpec, ParamSpec};

/// Canonical fallback action for conversational replies.
pub const ACTION_RESPOND: &str = "respond";

/// Canonical action for replies that require querying prior memories.
pub const ACTION_MEMORY_RECALL: &str = "respond with memory retrieval";

/// The designated error action: composes a best-effort apology so the agent
/// degrades to a conversational fallback instead of terminating.
pub const ACTION_ERROR: &str = "error";

/// Canonical idle action produced when no perception is available.
pub const ACTION_NO_OP: &str = "no_op";

/// Canonical route for contexts that signal simultaneously high urgency and
/// high risk.
pub const ACTION_ADAPTIVE: &str = "adaptive_strategy";
