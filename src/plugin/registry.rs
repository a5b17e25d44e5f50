//! In-process table of loaded plugin descriptors.

use std::collections::HashMap;

use super::PluginDescriptor;

/// Private, single-writer descriptor table.
///
/// Not concurrency-safe by itself: every mutation happens inside a manager
/// operation that holds the registry lock for its whole critical section.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginDescriptor>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a descriptor exists for `name`.
    pub fn has(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Get the descriptor for `name`.
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(name)
    }

    /// Install a descriptor, replacing any previous entry under its name.
    pub fn insert(&mut self, descriptor: PluginDescriptor) {
        self.plugins.insert(descriptor.name.clone(), descriptor);
    }

    /// Remove and return the descriptor for `name`.
    pub fn remove(&mut self, name: &str) -> Option<PluginDescriptor> {
        self.plugins.remove(name)
    }

    /// Names of all loaded plugins.
    pub fn names(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    /// Number of loaded plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is loaded.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
