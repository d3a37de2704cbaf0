//! `volition-tasks` – the Workflow/Task Manager.
//!
//! Optional higher-level grouping of execution beyond a single decision:
//! workflows own ordered task lists, tasks carry priorities, dependencies,
//! and subtask references, and the manager selects the next task to run.
//!
//! # Modules
//!
//! - [`workflow`] – the [`Task`][workflow::Task] and
//!   [`Workflow`][workflow::Workflow] value types with their lifecycle
//!   states.
//! - [`manager`] – [`WorkflowManager`][manager::WorkflowManager]: create
//!   workflows, add tasks (auto-creating a missing workflow, warn-logged),
//!   pick the highest-priority pending task, drive status transitions, and
//!   fire cooperative per-task cancel hooks.
//!
//! Entities live in session memory for the lifetime of the agent; there is
//! no garbage collection.

pub mod manager;
pub mod workflow;

pub use manager::WorkflowManager;
pub use workflow::{Task, TaskStatus, Workflow};
