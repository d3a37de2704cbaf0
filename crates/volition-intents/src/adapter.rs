//! Boundary adapters producing canonical [`Role`] and [`Goal`] values.
//!
//! Collaborators describe intents loosely: a config file may give only a
//! name, a plugin may omit the status, a caller may pass a raw priority
//! number.  Rather than letting every consumer branch on what it was given,
//! the descriptor types here accept the loose shape and `canonicalize()`
//! exactly once at the boundary.  Everything past the adapter works with one
//! canonical value type.

use serde::Deserialize;
use volition_types::{Goal, GoalStatus, Priority, Role, RoleStatus};

/// Reduce a display name to a stable identifier: lowercase, whitespace
/// collapsed to underscores, everything but `[a-z0-9_-]` dropped.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if (c.is_whitespace() || c == '-' || c == '_') && !last_was_sep && !slug.is_empty() {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

// ─────────────────────────────────────────────────────────────────────────────
// RoleSpec
// ─────────────────────────────────────────────────────────────────────────────

/// Permissive role descriptor accepted at the boundary.
///
/// Only `name` is mandatory; everything else has a canonical default: the id
/// is a slug of the name, the priority is medium (out-of-range values are
/// clamped, since boundary input must not abort intent loading), and the
/// status is active.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleSpec {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub status: Option<RoleStatus>,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Produce the one canonical [`Role`] this descriptor denotes.
    pub fn canonicalize(self) -> Role {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| slugify(&self.name));
        Role {
            id,
            name: self.name,
            description: self.description.unwrap_or_default(),
            permissions: self.permissions.unwrap_or_default(),
            priority: self.priority.map(Priority::clamped).unwrap_or(Priority::MEDIUM),
            status: self.status.unwrap_or(RoleStatus::Active),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GoalSpec
// ─────────────────────────────────────────────────────────────────────────────

/// Permissive goal descriptor accepted at the boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub status: Option<GoalStatus>,
}

impl GoalSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Produce the one canonical [`Goal`] this descriptor denotes.
    pub fn canonicalize(self) -> Goal {
        Goal {
            name: self.name,
            description: self.description.unwrap_or_default(),
            priority: self.priority.map(Priority::clamped).unwrap_or(Priority::MEDIUM),
            status: self.status.unwrap_or(GoalStatus::Active),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_gets_canonical_defaults() {
        let role = RoleSpec::new("Personal Assistant").canonicalize();
        assert_eq!(role.id, "personal_assistant");
        assert_eq!(role.priority, Priority::MEDIUM);
        assert_eq!(role.status, RoleStatus::Active);
        assert!(role.permissions.is_empty());
    }

    #[test]
    fn explicit_fields_are_preserved() {
        let role = RoleSpec {
            name: "Guardian".into(),
            id: Some("guardian_prime".into()),
            description: Some("Watches for risky requests.".into()),
            permissions: Some(vec!["memory:read".into()]),
            priority: Some(9),
            status: Some(RoleStatus::Inactive),
        }
        .canonicalize();

        assert_eq!(role.id, "guardian_prime");
        assert_eq!(role.priority, Priority::clamped(9));
        assert_eq!(role.status, RoleStatus::Inactive);
        assert_eq!(role.permissions, vec!["memory:read"]);
    }

    #[test]
    fn out_of_range_priority_is_clamped_not_rejected() {
        let goal = GoalSpec {
            name: "overdrive".into(),
            priority: Some(42),
            ..GoalSpec::default()
        }
        .canonicalize();
        assert_eq!(goal.priority, Priority::clamped(10));
    }

    #[test]
    fn goal_defaults_to_active_medium() {
        let goal = GoalSpec::new("answer questions").canonicalize();
        assert_eq!(goal.priority, Priority::MEDIUM);
        assert_eq!(goal.status, GoalStatus::Active);
    }

    #[test]
    fn slugify_collapses_separators_and_drops_punctuation() {
        assert_eq!(slugify("  Personal   Assistant! "), "personal_assistant");
        assert_eq!(slugify("day-planner"), "day_planner");
        assert_eq!(slugify("Goal #1"), "goal_1");
    }

    #[test]
    fn specs_deserialize_from_config_shaped_json() {
        let spec: RoleSpec = serde_json::from_str(
            r#"{"name": "Archivist", "priority": 6, "status": "inactive"}"#,
        )
        .unwrap();
        let role = spec.canonicalize();
        assert_eq!(role.id, "archivist");
        assert_eq!(role.priority, Priority::MEDIUM_HIGH);
        assert_eq!(role.status, RoleStatus::Inactive);
    }
}
