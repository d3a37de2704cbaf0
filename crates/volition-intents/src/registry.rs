//! [`IntentRegistry`] – the currently active roles and goals.
//!
//! Roles are keyed by id, goals by name.  Upserting an existing key merges
//! last-write-wins (the incoming status and priority replace the stored
//! ones); removal and status changes on unknown keys fail fast with
//! [`CoreError::NotFound`].
//!
//! The registry's one derived quantity is [`priority_floor`]: the maximum
//! priority over all active entries, [`Priority::MEDIUM`] when nothing is
//! active.  The Decision Synthesizer raises every synthesized decision to at
//! least this floor.
//!
//! [`priority_floor`]: IntentRegistry::priority_floor

use std::collections::HashMap;

use tracing::debug;
use volition_types::{CoreError, Goal, GoalStatus, Priority, Role, RoleStatus};

/// Registry of active intents, owned by the agent session.
#[derive(Default)]
pub struct IntentRegistry {
    roles: HashMap<String, Role>,
    goals: HashMap<String, Goal>,
}

impl IntentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Roles
    // -------------------------------------------------------------------------

    /// Insert or replace a role.  Duplicate ids merge last-write-wins.
    pub fn upsert_role(&mut self, role: Role) {
        if self.roles.contains_key(&role.id) {
            debug!(role = %role.id, "duplicate role id; last write wins");
        }
        self.roles.insert(role.id.clone(), role);
    }

    /// Remove a role by id.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when no role with that id exists.
    pub fn remove_role(&mut self, id: &str) -> Result<(), CoreError> {
        self.roles
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("role '{id}'")))
    }

    /// Update a role's status.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when no role with that id exists.
    pub fn set_role_status(&mut self, id: &str, status: RoleStatus) -> Result<(), CoreError> {
        let role = self
            .roles
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("role '{id}'")))?;
        role.status = status;
        Ok(())
    }

    /// All roles, highest priority first (ties ordered by id).
    pub fn roles(&self) -> Vec<&Role> {
        let mut all: Vec<&Role> = self.roles.values().collect();
        all.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        all
    }

    /// Active roles only, highest priority first.
    pub fn active_roles(&self) -> Vec<&Role> {
        self.roles().into_iter().filter(|r| r.is_active()).collect()
    }

    // -------------------------------------------------------------------------
    // Goals
    // -------------------------------------------------------------------------

    /// Insert or replace a goal.  Duplicate names merge last-write-wins.
    pub fn upsert_goal(&mut self, goal: Goal) {
        if self.goals.contains_key(&goal.name) {
            debug!(goal = %goal.name, "duplicate goal name; last write wins");
        }
        self.goals.insert(goal.name.clone(), goal);
    }

    /// Remove a goal by name.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when no goal with that name exists.
    pub fn remove_goal(&mut self, name: &str) -> Result<(), CoreError> {
        self.goals
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("goal '{name}'")))
    }

    /// Update a goal's status.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when no goal with that name exists.
    pub fn set_goal_status(&mut self, name: &str, status: GoalStatus) -> Result<(), CoreError> {
        let goal = self
            .goals
            .get_mut(name)
            .ok_or_else(|| CoreError::NotFound(format!("goal '{name}'")))?;
        goal.status = status;
        Ok(())
    }

    /// All goals, highest priority first (ties ordered by name).
    pub fn goals(&self) -> Vec<&Goal> {
        let mut all: Vec<&Goal> = self.goals.values().collect();
        all.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.name.cmp(&b.name)));
        all
    }

    /// Active goals only, highest priority first.
    pub fn active_goals(&self) -> Vec<&Goal> {
        self.goals().into_iter().filter(|g| g.is_active()).collect()
    }

    // -------------------------------------------------------------------------
    // Aggregate priority
    // -------------------------------------------------------------------------

    /// The aggregate priority of the active intent set: the maximum priority
    /// over active roles and goals, [`Priority::MEDIUM`] when nothing is
    /// active.
    pub fn priority_floor(&self) -> Priority {
        self.roles
            .values()
            .filter(|r| r.is_active())
            .map(|r| r.priority)
            .chain(
                self.goals
                    .values()
                    .filter(|g| g.is_active())
                    .map(|g| g.priority),
            )
            .max()
            .unwrap_or(Priority::MEDIUM)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: &str, priority: u8, status: RoleStatus) -> Role {
        Role {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            permissions: Vec::new(),
            priority: Priority::clamped(priority as i64),
            status,
        }
    }

    fn goal(name: &str, priority: u8, status: GoalStatus) -> Goal {
        Goal {
            name: name.into(),
            description: String::new(),
            priority: Priority::clamped(priority as i64),
            status,
        }
    }

    #[test]
    fn empty_registry_floor_is_medium() {
        let registry = IntentRegistry::new();
        assert_eq!(registry.priority_floor(), Priority::MEDIUM);
    }

    #[test]
    fn floor_is_max_over_active_roles_and_goals() {
        let mut registry = IntentRegistry::new();
        registry.upsert_role(role("assistant", 4, RoleStatus::Active));
        registry.upsert_goal(goal("ship_release", 9, GoalStatus::Active));
        assert_eq!(registry.priority_floor(), Priority::clamped(9));
    }

    #[test]
    fn inactive_entries_do_not_raise_the_floor() {
        let mut registry = IntentRegistry::new();
        registry.upsert_role(role("assistant", 4, RoleStatus::Active));
        registry.upsert_role(role("guardian", 10, RoleStatus::Inactive));
        registry.upsert_goal(goal("archive", 10, GoalStatus::Abandoned));
        assert_eq!(registry.priority_floor(), Priority::MEDIUM_LOW);
    }

    #[test]
    fn duplicate_role_id_merges_last_write_wins() {
        let mut registry = IntentRegistry::new();
        registry.upsert_role(role("assistant", 4, RoleStatus::Active));
        registry.upsert_role(role("assistant", 7, RoleStatus::Inactive));

        let roles = registry.roles();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].priority, Priority::clamped(7));
        assert_eq!(roles[0].status, RoleStatus::Inactive);
    }

    #[test]
    fn set_role_status_flips_activity() {
        let mut registry = IntentRegistry::new();
        registry.upsert_role(role("assistant", 4, RoleStatus::Active));
        assert_eq!(registry.active_roles().len(), 1);

        registry
            .set_role_status("assistant", RoleStatus::Abandoned)
            .unwrap();
        assert!(registry.active_roles().is_empty());
    }

    #[test]
    fn unknown_ids_fail_fast() {
        let mut registry = IntentRegistry::new();
        assert!(matches!(
            registry.remove_role("ghost"),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            registry.set_goal_status("ghost", GoalStatus::Completed),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn listings_are_priority_ordered() {
        let mut registry = IntentRegistry::new();
        registry.upsert_goal(goal("minor", 2, GoalStatus::Active));
        registry.upsert_goal(goal("major", 8, GoalStatus::Active));
        registry.upsert_goal(goal("middling", 5, GoalStatus::Active));

        let names: Vec<&str> = registry.goals().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["major", "middling", "minor"]);
    }

    #[test]
    fn remove_goal_then_floor_recomputes() {
        let mut registry = IntentRegistry::new();
        registry.upsert_goal(goal("ship_release", 9, GoalStatus::Active));
        registry.remove_goal("ship_release").unwrap();
        assert_eq!(registry.priority_floor(), Priority::MEDIUM);
    }
}
