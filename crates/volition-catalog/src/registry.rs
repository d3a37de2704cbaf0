//! [`ActionCatalog`] – dynamic name → handler registry and dispatcher.
//!
//! The catalog stores one [`ActionEntry`] per unique action name, carrying
//! the handler, a description and priority used for prompt construction, and
//! the parameter schema declared at registration time.
//!
//! # Graceful degradation
//!
//! [`ActionCatalog::execute`] is the catalog's core guarantee: it **never
//! fails**.  Handler errors are caught and converted into structured failure
//! outcomes, empty handler returns become empty-result failures, and unknown
//! action names are redirected to the designated [`ACTION_ERROR`] handler so
//! the caller still receives a usable outcome.
//!
//! Registration and unregistration, by contrast, fail fast: an out-of-range
//! priority is a [`CoreError::Validation`] and unregistering an unknown name
//! is a [`CoreError::NotFound`] – both indicate caller mistakes.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use volition_types::{ActionOutcome, CoreError, Priority};

use crate::ACTION_ERROR;
use crate::handler::{ActionHandler, ExecutionContext};
use crate::plugin::ActionPlugin;

// ─────────────────────────────────────────────────────────────────────────────
// Registration types
// ─────────────────────────────────────────────────────────────────────────────

/// One declared parameter of an action.
///
/// The schema is declared at registration time and checked on every
/// invocation; it is never inferred from the handler itself.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
}

/// Registration descriptor for one action.
#[derive(Debug, Clone)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    /// Raw priority; validated against the 1–10 scale at registration.
    pub priority: i64,
    pub parameters: Vec<ParamSpec>,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, priority: i64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            priority,
            parameters: Vec::new(),
        }
    }

    /// Builder-style helper declaring one expected parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, required: bool) -> Self {
        self.parameters.push(ParamSpec {
            name: name.into(),
            required,
        });
        self
    }
}

/// A registered action: metadata plus the handler it dispatches to.
pub struct ActionEntry {
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub parameters: Vec<ParamSpec>,
    pub enabled: bool,
    handler: Arc<dyn ActionHandler>,
    /// Set when the entry was contributed by a plugin; its teardown hook is
    /// fired on unregistration.
    plugin: Option<Arc<dyn ActionPlugin>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// ActionCatalog
// ─────────────────────────────────────────────────────────────────────────────

/// The dynamic action registry, owned by the agent session and injected into
/// every consumer.
#[derive(Default)]
pub struct ActionCatalog {
    entries: HashMap<String, ActionEntry>,
}

impl ActionCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action.
    ///
    /// An entry with the same name is overwritten (last-write-wins) and the
    /// conflict is logged as a warning.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] when `spec.priority` is outside `1..=10`.
    pub fn register(
        &mut self,
        spec: ActionSpec,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), CoreError> {
        self.insert_entry(spec, handler, None)
    }

    /// Register an action on behalf of a plugin, remembering the owner so
    /// [`ActionCatalog::unregister`] can fire its teardown hook.
    pub(crate) fn register_from_plugin(
        &mut self,
        spec: ActionSpec,
        handler: Arc<dyn ActionHandler>,
        plugin: Arc<dyn ActionPlugin>,
    ) -> Result<(), CoreError> {
        self.insert_entry(spec, handler, Some(plugin))
    }

    fn insert_entry(
        &mut self,
        spec: ActionSpec,
        handler: Arc<dyn ActionHandler>,
        plugin: Option<Arc<dyn ActionPlugin>>,
    ) -> Result<(), CoreError> {
        let priority = Priority::validated(spec.priority)?;
        if self.entries.contains_key(&spec.name) {
            warn!(action = %spec.name, "action name conflict; overwriting existing entry");
        }
        debug!(action = %spec.name, priority = %priority, "registering action");
        self.entries.insert(
            spec.name.clone(),
            ActionEntry {
                name: spec.name,
                description: spec.description,
                priority,
                parameters: spec.parameters,
                enabled: true,
                handler,
                plugin,
            },
        );
        Ok(())
    }

    /// Remove an action, firing the owning plugin's teardown hook when the
    /// entry was plugin-contributed.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when no entry with that name exists.
    pub fn unregister(&mut self, name: &str) -> Result<(), CoreError> {
        let entry = self
            .entries
            .remove(name)
            .ok_or_else(|| CoreError::NotFound(format!("action '{name}'")))?;
        if let Some(plugin) = &entry.plugin {
            debug!(action = name, plugin = plugin.name(), "firing plugin teardown hook");
            plugin.teardown(name);
        }
        Ok(())
    }

    /// Look up an entry by name.
    pub fn lookup(&self, name: &str) -> Option<&ActionEntry> {
        self.entries.get(name)
    }

    /// `true` when an enabled entry with that name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.enabled)
    }

    /// All enabled entries, highest priority first (ties ordered by name so
    /// prompt construction is deterministic).
    pub fn list_active(&self) -> Vec<&ActionEntry> {
        let mut active: Vec<&ActionEntry> =
            self.entries.values().filter(|e| e.enabled).collect();
        active.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.name.cmp(&b.name)));
        active
    }

    /// Enable or disable an entry without removing it.
    ///
    /// Disabled entries are skipped by [`ActionCatalog::list_active`] and
    /// treated as unknown by [`ActionCatalog::execute`].
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] when no entry with that name exists.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), CoreError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| CoreError::NotFound(format!("action '{name}'")))?;
        entry.enabled = enabled;
        Ok(())
    }

    /// Names of every registered entry, disabled ones included, sorted for
    /// determinism.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered entries, disabled ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execute the named action with the given parameters and context.
    ///
    /// This method **never fails**:
    ///
    /// - an unknown (or disabled) name is redirected to the designated
    ///   [`ACTION_ERROR`] handler, with the original name recorded in the
    ///   `requested_action` parameter;
    /// - a missing required parameter produces a failure outcome;
    /// - a handler error produces a failure outcome;
    /// - a handler returning no payload produces an empty-result failure.
    pub async fn execute(
        &self,
        name: &str,
        parameters: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> ActionOutcome {
        let mut params = parameters.clone();
        let entry = match self.entries.get(name).filter(|e| e.enabled) {
            Some(entry) => entry,
            None => {
                warn!(action = name, "action not in catalog; redirecting to the error handler");
                params.insert("requested_action".into(), Value::String(name.to_string()));
                match self.entries.get(ACTION_ERROR).filter(|e| e.enabled) {
                    Some(entry) => entry,
                    None => {
                        return ActionOutcome::failure(format!(
                            "action '{name}' is not registered and no error handler is available"
                        ));
                    }
                }
            }
        };

        let missing: Vec<&str> = entry
            .parameters
            .iter()
            .filter(|p| p.required && !params.contains_key(&p.name))
            .map(|p| p.name.as_str())
            .collect();
        if !missing.is_empty() {
            return ActionOutcome::failure(format!(
                "action '{}' is missing required parameter(s): {}",
                entry.name,
                missing.join(", ")
            ));
        }

        match entry.handler.invoke(ctx, &params).await {
            Ok(Some(payload)) => ActionOutcome::success(payload),
            Ok(None) => {
                warn!(action = %entry.name, "handler returned an empty result");
                ActionOutcome::failure(format!(
                    "action '{}' returned an empty result",
                    entry.name
                ))
            }
            Err(e) => {
                warn!(action = %entry.name, error = %e, "handler failed during execution");
                ActionOutcome::failure(format!("action '{}' failed: {e}", entry.name))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FnHandler;
    use serde_json::json;
    use uuid::Uuid;

    fn ok_handler(tag: &'static str) -> Arc<dyn ActionHandler> {
        FnHandler::new(move |_, _| Ok(Some(json!({ "tag": tag }))))
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Uuid::new_v4())
    }

    #[test]
    fn register_rejects_out_of_range_priority() {
        let mut catalog = ActionCatalog::new();
        let result = catalog.register(ActionSpec::new("bad", "", 15), ok_handler("bad"));
        assert!(matches!(result, Err(CoreError::Validation(_))));

        let result = catalog.register(ActionSpec::new("bad", "", 0), ok_handler("bad"));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn register_accepts_scale_bounds() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(ActionSpec::new("low", "", 1), ok_handler("low"))
            .unwrap();
        catalog
            .register(ActionSpec::new("high", "", 10), ok_handler("high"))
            .unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn register_conflict_is_last_write_wins() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(ActionSpec::new("greet", "", 5), ok_handler("first"))
            .unwrap();
        catalog
            .register(ActionSpec::new("greet", "", 5), ok_handler("second"))
            .unwrap();
        assert_eq!(catalog.len(), 1);

        let outcome = catalog.execute("greet", &Map::new(), &ctx()).await;
        assert!(outcome.success);
        assert_eq!(outcome.payload, json!({"tag": "second"}));
    }

    #[test]
    fn unregister_unknown_is_not_found() {
        let mut catalog = ActionCatalog::new();
        let result = catalog.unregister("ghost");
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn unregister_removes_entry() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(ActionSpec::new("greet", "", 5), ok_handler("x"))
            .unwrap();
        catalog.unregister("greet").unwrap();
        assert!(catalog.lookup("greet").is_none());
    }

    #[test]
    fn list_active_skips_disabled_and_orders_by_priority() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(ActionSpec::new("minor", "", 2), ok_handler("a"))
            .unwrap();
        catalog
            .register(ActionSpec::new("major", "", 9), ok_handler("b"))
            .unwrap();
        catalog
            .register(ActionSpec::new("hidden", "", 9), ok_handler("c"))
            .unwrap();
        catalog.set_enabled("hidden", false).unwrap();

        let names: Vec<&str> = catalog.list_active().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["major", "minor"]);
        assert!(!catalog.contains("hidden"));
    }

    #[test]
    fn set_enabled_unknown_is_not_found() {
        let mut catalog = ActionCatalog::new();
        assert!(matches!(
            catalog.set_enabled("ghost", false),
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn execute_success_wraps_payload() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(ActionSpec::new("greet", "", 5), ok_handler("hello"))
            .unwrap();
        let outcome = catalog.execute("greet", &Map::new(), &ctx()).await;
        assert!(outcome.success);
        assert_eq!(outcome.payload, json!({"tag": "hello"}));
    }

    #[tokio::test]
    async fn execute_converts_handler_error_into_failure_outcome() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(
                ActionSpec::new("explode", "", 5),
                FnHandler::new(|_, _| Err(CoreError::Execution("kaboom".into()))),
            )
            .unwrap();
        let outcome = catalog.execute("explode", &Map::new(), &ctx()).await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("kaboom"));
    }

    #[tokio::test]
    async fn execute_converts_empty_return_into_failure_outcome() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(ActionSpec::new("silent", "", 5), FnHandler::new(|_, _| Ok(None)))
            .unwrap();
        let outcome = catalog.execute("silent", &Map::new(), &ctx()).await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("empty result"));
    }

    #[tokio::test]
    async fn execute_unknown_redirects_to_error_handler() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(
                ActionSpec::new(ACTION_ERROR, "", 8),
                FnHandler::new(|_, params| {
                    Ok(Some(json!({
                        "requested_action": params.get("requested_action").cloned()
                    })))
                }),
            )
            .unwrap();

        let outcome = catalog.execute("lookup_fact", &Map::new(), &ctx()).await;
        assert!(outcome.success);
        assert_eq!(
            outcome.payload,
            json!({"requested_action": "lookup_fact"})
        );
    }

    #[tokio::test]
    async fn execute_unknown_without_error_handler_still_returns_outcome() {
        let catalog = ActionCatalog::new();
        let outcome = catalog.execute("lookup_fact", &Map::new(), &ctx()).await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("lookup_fact"));
    }

    #[tokio::test]
    async fn execute_disabled_action_is_treated_as_unknown() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(ActionSpec::new("greet", "", 5), ok_handler("x"))
            .unwrap();
        catalog.set_enabled("greet", false).unwrap();

        let outcome = catalog.execute("greet", &Map::new(), &ctx()).await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn execute_enforces_declared_required_parameters() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(
                ActionSpec::new("fetch", "", 5).with_parameter("url", true),
                ok_handler("fetched"),
            )
            .unwrap();

        let outcome = catalog.execute("fetch", &Map::new(), &ctx()).await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("url"));

        let mut params = Map::new();
        params.insert("url".into(), json!("https://example.org"));
        let outcome = catalog.execute("fetch", &params, &ctx()).await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn execute_allows_missing_optional_parameters() {
        let mut catalog = ActionCatalog::new();
        catalog
            .register(
                ActionSpec::new("fetch", "", 5).with_parameter("depth", false),
                ok_handler("fetched"),
            )
            .unwrap();
        let outcome = catalog.execute("fetch", &Map::new(), &ctx()).await;
        assert!(outcome.success);
    }
}
