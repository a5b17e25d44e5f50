//! Plugin loader: validates the contract, instantiates, runs lifecycle
//! hooks, and collects registered routes.

use chrono::Utc;

use super::{
    content_hash, FactoryTable, PluginDescriptor, PluginError, PluginOrigin, PluginPayload,
    PluginResult,
};
use crate::deps::PluginDeps;
use crate::router::RouteTable;

/// Turns a payload into a fully populated, initialized descriptor.
pub struct PluginLoader {
    factories: FactoryTable,
}

impl PluginLoader {
    /// Create a loader over the process's factory table.
    pub fn new(factories: FactoryTable) -> Self {
        Self { factories }
    }

    /// Load a plugin from its payload text.
    ///
    /// Validation runs before any side effect: a payload that fails to
    /// parse, declares the wrong name, or names a plugin this binary ships
    /// no factory for aborts with nothing registered. `initialize` failures
    /// drop the half-built instance the same way. Route registration
    /// mutates `table` as a side effect of this call.
    pub async fn load(
        &self,
        name: &str,
        source: &str,
        deps: &PluginDeps,
        table: &mut RouteTable,
        origin: PluginOrigin,
    ) -> PluginResult<PluginDescriptor> {
        let hash = content_hash(source);

        let payload = PluginPayload::from_toml(name, source)?;
        payload.validate(name)?;

        let factory = self.factories.get(name).ok_or_else(|| PluginError::Validation {
            name: name.to_string(),
            reason: "no factory registered for this plugin name".to_string(),
        })?;

        let mut instance = factory.build(&payload).map_err(|e| PluginError::Execution {
            name: name.to_string(),
            reason: format!("factory failed: {e}"),
        })?;

        if let Err(e) = instance.initialize(deps).await {
            return Err(PluginError::Execution {
                name: name.to_string(),
                reason: format!("initialize failed: {e}"),
            });
        }

        let routes = instance.register_routes(table);
        tracing::debug!(plugin = %name, routes = routes.len(), "plugin routes registered");

        Ok(PluginDescriptor {
            name: name.to_string(),
            version: payload.plugin.version.clone(),
            source: source.to_string(),
            content_hash: hash,
            instance,
            routes,
            origin,
            loaded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::plugin::{Plugin, PluginFactory};
    use crate::router::{Method, RouteKey};

    struct EchoPlugin {
        fail_init: bool,
    }

    #[async_trait]
    impl Plugin for EchoPlugin {
        async fn initialize(&mut self, _deps: &PluginDeps) -> PluginResult<()> {
            if self.fail_init {
                return Err(PluginError::Execution {
                    name: "echo".to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(())
        }

        fn register_routes(&mut self, table: &mut RouteTable) -> Vec<RouteKey> {
            let key = RouteKey::new(Method::Get, "/echo");
            table.add(key.clone(), Arc::new(|body: &str| body.to_string()));
            vec![key]
        }
    }

    struct EchoFactory {
        fail_init: bool,
    }

    impl PluginFactory for EchoFactory {
        fn name(&self) -> &str {
            "echo"
        }

        fn build(&self, _payload: &PluginPayload) -> PluginResult<Box<dyn Plugin>> {
            Ok(Box::new(EchoPlugin { fail_init: self.fail_init }))
        }
    }

    const PAYLOAD: &str = "[plugin]\nname = \"echo\"\nversion = \"0.1.0\"\n";

    fn loader(fail_init: bool) -> PluginLoader {
        PluginLoader::new(FactoryTable::new([
            Arc::new(EchoFactory { fail_init }) as Arc<dyn PluginFactory>
        ]))
    }

    #[tokio::test]
    async fn test_load_populates_descriptor() {
        let loader = loader(false);
        let deps = PluginDeps::default();
        let mut table = RouteTable::new();

        let descriptor = loader
            .load("echo", PAYLOAD, &deps, &mut table, PluginOrigin::LocalFile(PathBuf::from("/p")))
            .await
            .unwrap();

        assert_eq!(descriptor.name, "echo");
        assert_eq!(descriptor.version, "0.1.0");
        assert_eq!(descriptor.content_hash, content_hash(PAYLOAD));
        assert_eq!(descriptor.routes, vec![RouteKey::new(Method::Get, "/echo")]);
        assert!(table.contains(Method::Get, "/echo"));
    }

    #[tokio::test]
    async fn test_unknown_name_fails_validation_without_side_effects() {
        let loader = loader(false);
        let deps = PluginDeps::default();
        let mut table = RouteTable::new();

        let payload = "[plugin]\nname = \"ghost\"\nversion = \"1.0\"\n";
        let result = loader
            .load("ghost", payload, &deps, &mut table, PluginOrigin::LocalFile(PathBuf::from("/p")))
            .await;

        assert!(matches!(result, Err(PluginError::Validation { .. })));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_failure_registers_nothing() {
        let loader = loader(true);
        let deps = PluginDeps::default();
        let mut table = RouteTable::new();

        let result = loader
            .load("echo", PAYLOAD, &deps, &mut table, PluginOrigin::LocalFile(PathBuf::from("/p")))
            .await;

        assert!(matches!(result, Err(PluginError::Execution { .. })));
        assert!(table.is_empty());
    }
}
