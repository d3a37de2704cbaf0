//! `volition-intents` – the Role/Goal Registry.
//!
//! Holds the prioritized, stateful intents that bias decision priority and
//! routing.
//!
//! # Modules
//!
//! - [`registry`] – [`IntentRegistry`][registry::IntentRegistry]: add,
//!   remove, list, and set-status operations for roles and goals, plus the
//!   aggregate [`priority_floor`][registry::IntentRegistry::priority_floor]
//!   (max over active entries, medium when nothing is active) that the
//!   Decision Synthesizer applies to every synthesized decision.
//! - [`adapter`] – [`RoleSpec`][adapter::RoleSpec] /
//!   [`GoalSpec`][adapter::GoalSpec]: permissive boundary descriptors with an
//!   explicit `canonicalize()` step producing exactly one canonical
//!   [`Role`][volition_types::Role] / [`Goal`][volition_types::Goal] value,
//!   so no consumer ever branches on input shape at runtime.

pub mod adapter;
pub mod registry;

pub use adapter::{GoalSpec, RoleSpec};
pub use registry::IntentRegistry;
