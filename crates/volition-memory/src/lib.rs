//! `volition-memory` – the narrow memory boundary.
//!
//! The decision core consumes exactly one memory capability: given a query
//! string, return zero or more prior memory snippets
//! ([`MemoryRecall`][volition_types::MemoryRecall]).  This crate provides the
//! session-local implementation, [`RecallStore`][recall::RecallStore]: a
//! SQLite-backed snippet store with keyword-overlap recall.  Anything richer
//! (embeddings, consolidation, forgetting) belongs to an external
//! collaborator behind the same trait.

pub mod recall;

pub use recall::{RecallError, RecallStore};
