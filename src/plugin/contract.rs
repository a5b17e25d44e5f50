//! The plugin contract and the factory table that instantiates plugins.
//!
//! Plugins are statically compiled implementations of [`Plugin`], produced
//! by factories registered at process start. The distributed payload carries
//! metadata and configuration, not code: a node can only instantiate plugin
//! names its binary ships a factory for.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{PluginPayload, PluginResult};
use crate::deps::PluginDeps;
use crate::router::{RouteKey, RouteTable};

/// Contract every loadable plugin implements.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Required lifecycle hook, run once per load before any route exists.
    ///
    /// Receives the injected dependency bundle and may register
    /// cross-cutting actions for other components to call.
    async fn initialize(&mut self, deps: &PluginDeps) -> PluginResult<()>;

    /// Optional: attach handlers to the live route table and return their
    /// keys so the manager can reverse the attachment on unload.
    fn register_routes(&mut self, _table: &mut RouteTable) -> Vec<RouteKey> {
        Vec::new()
    }

    /// Optional: release resources before the plugin is dropped.
    async fn cleanup(&mut self) -> PluginResult<()> {
        Ok(())
    }
}

/// Builds a plugin instance from a validated payload.
pub trait PluginFactory: Send + Sync {
    /// Plugin name this factory serves.
    fn name(&self) -> &str;

    /// Construct a fresh, uninitialized instance.
    fn build(&self, payload: &PluginPayload) -> PluginResult<Box<dyn Plugin>>;
}

/// Process-start lookup table of plugin factories.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone, Default)]
pub struct FactoryTable {
    factories: Arc<HashMap<String, Arc<dyn PluginFactory>>>,
}

impl std::fmt::Debug for FactoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryTable").field("factories", &self.factories.len()).finish()
    }
}

impl FactoryTable {
    /// Build a table from a set of factories.
    pub fn new(factories: impl IntoIterator<Item = Arc<dyn PluginFactory>>) -> Self {
        let map = factories.into_iter().map(|f| (f.name().to_string(), f)).collect();
        Self { factories: Arc::new(map) }
    }

    /// Look up the factory for a plugin name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginFactory>> {
        self.factories.get(name).cloned()
    }

    /// Whether a factory exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of all registered factories.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopPlugin;

    #[async_trait]
    impl Plugin for NoopPlugin {
        async fn initialize(&mut self, _deps: &PluginDeps) -> PluginResult<()> {
            Ok(())
        }
    }

    struct NoopFactory;

    impl PluginFactory for NoopFactory {
        fn name(&self) -> &str {
            "noop"
        }

        fn build(&self, _payload: &PluginPayload) -> PluginResult<Box<dyn Plugin>> {
            Ok(Box::new(NoopPlugin))
        }
    }

    #[test]
    fn test_table_lookup() {
        let table = FactoryTable::new([Arc::new(NoopFactory) as Arc<dyn PluginFactory>]);

        assert_eq!(table.len(), 1);
        assert!(table.contains("noop"));
        assert!(table.get("noop").is_some());
        assert!(table.get("other").is_none());
    }

    #[tokio::test]
    async fn test_default_hooks() {
        let mut plugin = NoopPlugin;
        let mut routes = RouteTable::new();

        assert!(plugin.register_routes(&mut routes).is_empty());
        assert!(routes.is_empty());
        assert!(plugin.cleanup().await.is_ok());
    }
}
