//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use plugmesh::cluster::{InMemoryBus, InMemoryStore};
use plugmesh::config::{ClusterMode, ClusterRole, NodeConfig};
use plugmesh::plugin::{
    FactoryTable, Plugin, PluginFactory, PluginManager, PluginPayload, PluginResult,
};
use plugmesh::{Method, PluginDeps, RouteKey, RouteTable};

/// Lifecycle counters shared between a factory and the instances it builds.
#[derive(Default)]
pub struct Counters {
    pub inits: AtomicUsize,
    pub cleanups: AtomicUsize,
}

impl Counters {
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

/// Test plugin: registers an action named after itself and one GET route
/// taken from the payload config.
pub struct TestPlugin {
    name: String,
    route: RouteKey,
    counters: Arc<Counters>,
}

#[async_trait]
impl Plugin for TestPlugin {
    async fn initialize(&mut self, deps: &PluginDeps) -> PluginResult<()> {
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        let name = self.name.clone();
        deps.actions.register(&self.name, Arc::new(move |_| serde_json::json!({"from": name})));
        Ok(())
    }

    fn register_routes(&mut self, table: &mut RouteTable) -> Vec<RouteKey> {
        table.add(self.route.clone(), Arc::new(|body: &str| format!("handled: {body}")));
        vec![self.route.clone()]
    }

    async fn cleanup(&mut self) -> PluginResult<()> {
        self.counters.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct TestFactory {
    pub plugin_name: String,
    pub counters: Arc<Counters>,
}

impl PluginFactory for TestFactory {
    fn name(&self) -> &str {
        &self.plugin_name
    }

    fn build(&self, payload: &PluginPayload) -> PluginResult<Box<dyn Plugin>> {
        let route = payload
            .config
            .get("route")
            .and_then(|v| v.as_str())
            .unwrap_or("/default")
            .to_string();
        Ok(Box::new(TestPlugin {
            name: self.plugin_name.clone(),
            route: RouteKey::new(Method::Get, route),
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// A payload whose `[config] route` controls the registered route.
pub fn payload(name: &str, version: &str, route: &str) -> String {
    format!(
        "[plugin]\nname = \"{name}\"\nversion = \"{version}\"\n\n[config]\nroute = \"{route}\"\n"
    )
}

/// One node of a test cluster.
pub struct TestNode {
    pub manager: Arc<PluginManager>,
    pub counters: Arc<Counters>,
    pub dir: TempDir,
}

/// Build a node with a factory for `plugin_name`, sharing `bus` and `store`.
pub fn node(
    server_id: &str,
    mode: ClusterMode,
    role: ClusterRole,
    plugin_name: &str,
    bus: Arc<InMemoryBus>,
    store: Arc<InMemoryStore>,
) -> TestNode {
    let dir = TempDir::new().unwrap();
    let counters = Arc::new(Counters::default());
    let factories = FactoryTable::new([Arc::new(TestFactory {
        plugin_name: plugin_name.to_string(),
        counters: Arc::clone(&counters),
    }) as Arc<dyn PluginFactory>]);

    let config = NodeConfig {
        cluster_name: "itest".to_string(),
        server_id: server_id.to_string(),
        mode,
        role,
        plugin_dir: dir.path().to_path_buf(),
        ..NodeConfig::default()
    };

    let manager = Arc::new(PluginManager::new(config, factories, bus, store));
    TestNode { manager, counters, dir }
}

/// Poll until the plugin's presence on `manager` matches `present`.
pub async fn wait_for_presence(manager: &Arc<PluginManager>, name: &str, present: bool) -> bool {
    for _ in 0..300 {
        if manager.has(name).await == present {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
