//! [`RecallStore`] – SQLite-backed memory snippets with keyword recall.
//!
//! # Storage layout
//!
//! A single table `memory_snippets` is created (if it does not already
//! exist) with the following columns:
//!
//! | column    | type | description                          |
//! |-----------|------|--------------------------------------|
//! | id        | TEXT | UUID v4 primary key                  |
//! | timestamp | TEXT | RFC-3339 creation time (UTC)         |
//! | source    | TEXT | Component that recorded the snippet  |
//! | content   | TEXT | The remembered text                  |
//!
//! # Recall
//!
//! Recall ranks stored snippets by how many of the query's words appear in
//! the snippet content (case-insensitive), most-overlapping first, ties
//! broken by recency.  An empty query returns the most recent snippets.
//!
//! # Example
//!
//! ```rust
//! use volition_memory::RecallStore;
//! use volition_types::MemoryRecall;
//!
//! let store = RecallStore::open_in_memory().unwrap();
//! store.record("session", "The user's next meeting is Friday at 3pm.").unwrap();
//!
//! let hits = store.recall("next meeting", 5).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;
use volition_types::{CoreError, MemoryRecall, MemorySnippet};

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from recall-store operations.
#[derive(Error, Debug)]
pub enum RecallError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("recall store lock poisoned")]
    Poisoned,
}

// ─────────────────────────────────────────────────────────────────────────────
// RecallStore
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed snippet store implementing the core's
/// [`MemoryRecall`] boundary.
///
/// The connection sits behind a mutex so the store can be shared as an
/// `Arc<dyn MemoryRecall>` across handlers.
pub struct RecallStore {
    conn: Mutex<Connection>,
}

impl RecallStore {
    /// Open (or create) a persistent store at `path`.
    pub fn open(path: &str) -> Result<Self, RecallError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a temporary in-memory store (data lost on drop).
    pub fn open_in_memory() -> Result<Self, RecallError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, RecallError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memory_snippets (
                id        TEXT NOT NULL PRIMARY KEY,
                timestamp TEXT NOT NULL,
                source    TEXT NOT NULL,
                content   TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Store one snippet and return its generated id.
    pub fn record(&self, source: &str, content: &str) -> Result<Uuid, RecallError> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().map_err(|_| RecallError::Poisoned)?;
        conn.execute(
            "INSERT INTO memory_snippets (id, timestamp, source, content)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), now, source, content],
        )?;
        Ok(id)
    }

    /// Rank stored snippets against `query` and return the top `limit`.
    pub fn recall_matching(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemorySnippet>, RecallError> {
        let conn = self.conn.lock().map_err(|_| RecallError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, source, content
             FROM memory_snippets ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map([], row_to_snippet)?;
        let snippets = rows.collect::<Result<Vec<_>, _>>()?;

        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            // Nothing to match against: most recent first, already ordered.
            return Ok(snippets.into_iter().take(limit).collect());
        }

        let mut scored: Vec<(usize, MemorySnippet)> = snippets
            .into_iter()
            .filter_map(|snippet| {
                let content_tokens = tokenize(&snippet.content);
                let overlap = query_tokens
                    .iter()
                    .filter(|t| content_tokens.contains(*t))
                    .count();
                (overlap > 0).then_some((overlap, snippet))
            })
            .collect();
        // Rows arrive newest-first, and the sort is stable, so equal scores
        // stay ordered by recency.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        debug!(matched = scored.len(), limit, "recall query scored");
        Ok(scored.into_iter().take(limit).map(|(_, s)| s).collect())
    }

    /// Total number of stored snippets.
    pub fn len(&self) -> Result<usize, RecallError> {
        let conn = self.conn.lock().map_err(|_| RecallError::Poisoned)?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM memory_snippets", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, RecallError> {
        Ok(self.len()? == 0)
    }
}

impl MemoryRecall for RecallStore {
    fn recall(&self, query: &str, limit: usize) -> Result<Vec<MemorySnippet>, CoreError> {
        self.recall_matching(query, limit)
            .map_err(|e| CoreError::Execution(format!("memory recall failed: {e}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Lowercased alphanumeric words of `text`.
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn row_to_snippet(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemorySnippet> {
    let id_str: String = row.get(0)?;
    let timestamp_str: String = row.get(1)?;
    let source: String = row.get(2)?;
    let content: String = row.get(3)?;

    let id = Uuid::parse_str(&id_str).map_err(|_| {
        rusqlite::Error::InvalidColumnType(0, id_str, rusqlite::types::Type::Text)
    })?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(1, timestamp_str, rusqlite::types::Type::Text)
        })?;

    Ok(MemorySnippet {
        id,
        timestamp,
        source,
        content,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> RecallStore {
        RecallStore::open_in_memory().unwrap()
    }

    #[test]
    fn record_then_recall_by_keyword() {
        let store = make_store();
        store
            .record("session", "The user's next meeting is Friday at 3pm.")
            .unwrap();
        store.record("session", "The user likes green tea.").unwrap();

        let hits = store.recall_matching("next meeting", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("Friday"));
    }

    #[test]
    fn recall_ranks_by_overlap() {
        let store = make_store();
        store.record("session", "meeting notes from last week").unwrap();
        store
            .record("session", "next meeting agenda: budget review")
            .unwrap();

        let hits = store.recall_matching("next meeting agenda", 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].content.contains("budget review"));
    }

    #[test]
    fn recall_respects_limit() {
        let store = make_store();
        for i in 0..10 {
            store.record("session", &format!("note {i} about tea")).unwrap();
        }
        let hits = store.recall_matching("tea", 3).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn empty_query_returns_most_recent() {
        let store = make_store();
        store.record("session", "first note").unwrap();
        store.record("session", "second note").unwrap();

        let hits = store.recall_matching("", 1).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn unmatched_query_returns_nothing() {
        let store = make_store();
        store.record("session", "the user likes green tea").unwrap();
        let hits = store.recall_matching("quantum chromodynamics", 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let store = make_store();
        store.record("session", "Remember the BIRTHDAY on June 4th").unwrap();
        let hits = store.recall_matching("birthday", 5).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn len_counts_records() {
        let store = make_store();
        assert!(store.is_empty().unwrap());
        store.record("session", "one").unwrap();
        store.record("session", "two").unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn trait_object_recall_maps_errors_into_core_error() {
        use std::sync::Arc;
        let store: Arc<dyn MemoryRecall> = Arc::new(make_store());
        let hits = store.recall("anything", 5).unwrap();
        assert!(hits.is_empty());
    }
}
