//! Dependency bundle injected into plugins at initialize time.
//!
//! Plugins receive a shared action registry for cross-cutting callables, a
//! restricted capability to resolve approved internal modules, and the node's
//! process-level configuration. Nothing else of the host is reachable.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::plugin::{PluginError, PluginResult};

/// A named cross-cutting callable registered by a plugin for other
/// components to invoke.
pub type Action = Arc<dyn Fn(serde_json::Value) -> serde_json::Value + Send + Sync>;

/// Shared mutable registry of named actions.
///
/// Cheap to clone; clones share the same underlying table.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: Arc<RwLock<HashMap<String, Action>>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry").field("actions", &self.actions.read().len()).finish()
    }
}

impl ActionRegistry {
    /// Create an empty action registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an action under `name`.
    pub fn register(&self, name: impl Into<String>, action: Action) {
        self.actions.write().insert(name.into(), action);
    }

    /// Remove an action by name.
    pub fn unregister(&self, name: &str) -> bool {
        self.actions.write().remove(name).is_some()
    }

    /// Whether an action with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.read().contains_key(name)
    }

    /// Invoke an action by name.
    pub fn invoke(&self, name: &str, input: serde_json::Value) -> Option<serde_json::Value> {
        let action = self.actions.read().get(name).cloned();
        action.map(|a| a(input))
    }

    /// Names of all registered actions.
    pub fn names(&self) -> Vec<String> {
        self.actions.read().keys().cloned().collect()
    }
}

/// Restricted module-loading capability.
///
/// Plugins may only resolve module names on the approved list; anything else
/// is refused before any lookup happens.
#[derive(Debug, Clone, Default)]
pub struct ModuleGate {
    approved: Arc<Vec<String>>,
}

impl ModuleGate {
    /// Create a gate over an approved module list.
    pub fn new(approved: Vec<String>) -> Self {
        Self { approved: Arc::new(approved) }
    }

    /// Whether `module` is on the approved list.
    pub fn is_approved(&self, module: &str) -> bool {
        self.approved.iter().any(|m| m == module)
    }

    /// Resolve an approved module name, refusing anything off-list.
    ///
    /// The returned name borrows from the caller's input, not the gate.
    pub fn require<'a>(&self, module: &'a str) -> PluginResult<&'a str> {
        if self.is_approved(module) {
            Ok(module)
        } else {
            Err(PluginError::Validation {
                name: module.to_string(),
                reason: "module is not on the approved list".to_string(),
            })
        }
    }
}

/// The bundle handed to `Plugin::initialize`.
#[derive(Debug, Clone, Default)]
pub struct PluginDeps {
    /// Shared action registry.
    pub actions: ActionRegistry,
    /// Restricted internal-module capability.
    pub modules: ModuleGate,
    /// Process-level configuration, free-form.
    pub process_config: serde_json::Value,
}

impl PluginDeps {
    /// Create a bundle.
    pub fn new(actions: ActionRegistry, modules: ModuleGate, process_config: serde_json::Value) -> Self {
        Self { actions, modules, process_config }
    }
}
