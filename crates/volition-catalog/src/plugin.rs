//! [`ActionPlugin`] – the load-time plugin boundary.
//!
//! Collaborator plugins contribute `(spec, handler)` tuples to the Action
//! Catalog and may contribute Role/Goal entries for the intent registry.
//! The catalog remembers which plugin owns each contributed entry and fires
//! that plugin's [`teardown`][ActionPlugin::teardown] hook when the entry is
//! unregistered.

use std::sync::Arc;

use tracing::info;
use volition_types::{CoreError, Goal, Role};

use crate::handler::ActionHandler;
use crate::registry::{ActionCatalog, ActionSpec};

/// Canonical Role/Goal contributions from a plugin, already adapted to the
/// core's value types.
#[derive(Default)]
pub struct PluginIntents {
    pub roles: Vec<Role>,
    pub goals: Vec<Goal>,
}

/// A collaborator that supplies actions (and optionally intents) at load
/// time.
pub trait ActionPlugin: Send + Sync {
    /// Stable plugin name, used for logging.
    fn name(&self) -> &str;

    /// The actions this plugin contributes.  Called once at install time.
    fn actions(&self) -> Vec<(ActionSpec, Arc<dyn ActionHandler>)>;

    /// Role/Goal entries this plugin contributes.  Empty by default.
    fn intents(&self) -> PluginIntents {
        PluginIntents::default()
    }

    /// Hook fired when one of this plugin's actions is unregistered, so the
    /// plugin can release any per-action resources.
    fn teardown(&self, _action: &str) {}
}

/// Register every action a plugin supplies, recording the plugin as owner so
/// unregistration fires its teardown hook.  Returns the installed action
/// names in registration order.
///
/// # Errors
///
/// Propagates [`CoreError::Validation`] from the first action whose declared
/// priority is outside the 1–10 scale; actions registered before the failure
/// stay registered.
pub fn install_plugin(
    catalog: &mut ActionCatalog,
    plugin: Arc<dyn ActionPlugin>,
) -> Result<Vec<String>, CoreError> {
    let mut installed = Vec::new();
    for (spec, handler) in plugin.actions() {
        let name = spec.name.clone();
        catalog.register_from_plugin(spec, handler, Arc::clone(&plugin))?;
        installed.push(name);
    }
    info!(
        plugin = plugin.name(),
        actions = installed.len(),
        "plugin actions installed"
    );
    Ok(installed)
}
