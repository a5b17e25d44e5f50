//! Plugin lifecycle orchestration.
//!
//! The manager owns the descriptor registry and the live route table, reads
//! payloads from disk or the cluster blob store, delegates instantiation to
//! the loader, and announces changes on the notification bus.
//!
//! Operations on the same plugin name are serialized behind a per-name
//! async mutex, so an administrative unload cannot interleave with a
//! remote-triggered resync of the same plugin. Every bus and store call is
//! bounded by the configured operation timeout.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use super::{
    content_hash, AutoloadManifest, FactoryTable, PluginError, PluginLoader, PluginOrigin,
    PluginRegistry, PluginResult,
};
use crate::cluster::{
    code_key, events_channel, BlobStore, NotificationBus, PluginAction, PluginEvent, StoreRecord,
};
use crate::config::{ClusterMode, ClusterRole, NodeConfig};
use crate::deps::{ActionRegistry, ModuleGate, PluginDeps};
use crate::router::RouteTable;

/// Summary of a loaded plugin, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSummary {
    /// Plugin name.
    pub name: String,
    /// Version from the payload header.
    pub version: String,
    /// Hex SHA-256 of the payload.
    pub content_hash: String,
    /// Number of routes attributed to the plugin.
    pub routes: usize,
    /// When the load completed.
    pub loaded_at: DateTime<Utc>,
}

/// Orchestrates plugin load, unload, and cluster synchronization.
pub struct PluginManager {
    config: NodeConfig,
    loader: PluginLoader,
    deps: PluginDeps,
    bus: Arc<dyn NotificationBus>,
    store: Arc<dyn BlobStore>,
    registry: AsyncMutex<PluginRegistry>,
    routes: Arc<AsyncMutex<RouteTable>>,
    name_locks: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    event_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl PluginManager {
    /// Create a manager over the node's factories and cluster transports.
    pub fn new(
        config: NodeConfig,
        factories: FactoryTable,
        bus: Arc<dyn NotificationBus>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        let deps = PluginDeps::new(
            ActionRegistry::new(),
            ModuleGate::new(config.approved_modules.clone()),
            config.process_config_json(),
        );

        Self {
            loader: PluginLoader::new(factories),
            deps,
            bus,
            store,
            registry: AsyncMutex::new(PluginRegistry::new()),
            routes: Arc::new(AsyncMutex::new(RouteTable::new())),
            name_locks: parking_lot::Mutex::new(HashMap::new()),
            event_task: parking_lot::Mutex::new(None),
            config,
        }
    }

    /// The node configuration this manager runs under.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Shared action registry plugins register into.
    pub fn actions(&self) -> &ActionRegistry {
        &self.deps.actions
    }

    /// The live route table owned by this manager.
    pub fn routes(&self) -> Arc<AsyncMutex<RouteTable>> {
        Arc::clone(&self.routes)
    }

    /// Whether a plugin is currently loaded.
    pub async fn has(&self, name: &str) -> bool {
        self.registry.lock().await.has(name)
    }

    /// Content hash of a loaded plugin, if present.
    pub async fn loaded_hash(&self, name: &str) -> Option<String> {
        self.registry.lock().await.get(name).map(|d| d.content_hash.clone())
    }

    /// Summaries of all loaded plugins.
    pub async fn list(&self) -> Vec<PluginSummary> {
        let registry = self.registry.lock().await;
        let mut summaries: Vec<PluginSummary> = registry
            .names()
            .iter()
            .filter_map(|n| registry.get(n))
            .map(|d| PluginSummary {
                name: d.name.clone(),
                version: d.version.clone(),
                content_hash: d.content_hash.clone(),
                routes: d.routes.len(),
                loaded_at: d.loaded_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    fn name_lock(&self, name: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.name_locks.lock();
        // Drop entries nobody holds anymore so the map tracks the working
        // set of names, not every name ever seen.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(name.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> PluginResult<T>
    where
        F: Future<Output = PluginResult<T>>,
    {
        let seconds = self.config.op_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(seconds), fut).await {
            Ok(result) => result,
            Err(_) => Err(PluginError::Timeout { operation: operation.to_string(), seconds }),
        }
    }

    /// Load a plugin by name.
    ///
    /// Local mode (and the master side of network mode) reads the payload
    /// from the plugin directory. A name that is already loaded warns and
    /// no-ops without comparing hashes; replacing a local plugin requires an
    /// explicit unload first. A network-mode worker never consults the local
    /// directory and delegates entirely to [`sync_from_store`](Self::sync_from_store).
    ///
    /// With `broadcast` set in network mode, the payload is pushed to the
    /// blob store and a load event is published after a successful load.
    pub async fn load_plugin(&self, name: &str, broadcast: bool) -> PluginResult<()> {
        let lock = self.name_lock(name);
        let _guard = lock.lock().await;

        if self.config.mode == ClusterMode::Network && self.config.role == ClusterRole::Worker {
            return self.sync_locked(name).await;
        }

        if self.registry.lock().await.has(name) {
            tracing::warn!(plugin = %name, "plugin already loaded, ignoring load request");
            return Ok(());
        }

        let path = self.config.payload_path(name);
        if !path.exists() {
            return Err(PluginError::NotFound(path));
        }
        let source = std::fs::read_to_string(&path)?;

        let descriptor = {
            let mut table = self.routes.lock().await;
            self.loader
                .load(name, &source, &self.deps, &mut table, PluginOrigin::LocalFile(path))
                .await?
        };
        let hash = descriptor.content_hash.clone();
        self.registry.lock().await.insert(descriptor);
        tracing::info!(plugin = %name, %hash, "plugin loaded");

        if broadcast && self.config.mode == ClusterMode::Network {
            self.push_and_announce(name, &source, None).await?;
        }

        Ok(())
    }

    /// Unload a plugin by name.
    ///
    /// Absent names warn and no-op. Cleanup and route removal failures are
    /// logged as teardown errors but never keep the registry entry alive;
    /// after this call the name is gone from this node regardless. With
    /// `broadcast` set in network mode, an unload event is published.
    pub async fn unload_plugin(&self, name: &str, broadcast: bool) -> PluginResult<()> {
        let lock = self.name_lock(name);
        let _guard = lock.lock().await;
        self.unload_locked(name, broadcast).await
    }

    async fn unload_locked(&self, name: &str, broadcast: bool) -> PluginResult<()> {
        let descriptor = self.registry.lock().await.remove(name);
        let Some(mut descriptor) = descriptor else {
            tracing::warn!(plugin = %name, "plugin not loaded, ignoring unload request");
            return Ok(());
        };

        if let Err(e) = descriptor.instance.cleanup().await {
            let teardown = PluginError::Teardown {
                name: name.to_string(),
                reason: format!("cleanup failed: {e}"),
            };
            tracing::warn!(plugin = %name, error = %teardown, "continuing unload");
        }

        {
            let mut table = self.routes.lock().await;
            for key in &descriptor.routes {
                if table.remove(key.method, &key.path) == 0 {
                    tracing::warn!(plugin = %name, route = %key, "route was already gone");
                }
            }
        }

        if descriptor.origin.is_disposable() {
            if let Err(e) = std::fs::remove_file(descriptor.origin.path()) {
                tracing::warn!(plugin = %name, error = %e, "failed to delete disposable payload unit");
            }
        }

        tracing::info!(plugin = %name, "plugin unloaded");

        if broadcast && self.config.mode == ClusterMode::Network {
            let event = PluginEvent::new(PluginAction::Unload, name, &self.config.server_id);
            let channel = events_channel(&self.config.cluster_name);
            self.bounded("bus publish", self.bus.publish(&channel, &event.to_json())).await?;
        }

        Ok(())
    }

    /// Pull the payload for `name` from the blob store and converge on it.
    ///
    /// An absent record fails with a sync error and leaves any existing
    /// descriptor untouched. A record hashing identically to the loaded
    /// descriptor is a no-op: `initialize` is not re-run and routes are
    /// unchanged. A differing hash tears the old descriptor down completely
    /// before the new one is installed; old and new routes are never live at
    /// the same time.
    pub async fn sync_from_store(&self, name: &str) -> PluginResult<()> {
        let lock = self.name_lock(name);
        let _guard = lock.lock().await;
        self.sync_locked(name).await
    }

    async fn sync_locked(&self, name: &str) -> PluginResult<()> {
        let key = code_key(&self.config.cluster_name, name);
        let record = self.bounded("store get", self.store.get(&key)).await?;
        let Some(record) = record else {
            return Err(PluginError::Sync {
                name: name.to_string(),
                reason: "no payload in blob store".to_string(),
            });
        };

        let fetched_hash = content_hash(&record.source);
        if let Some(current) = self.registry.lock().await.get(name) {
            if current.content_hash == fetched_hash {
                tracing::debug!(plugin = %name, hash = %fetched_hash, "already current, skipping sync");
                return Ok(());
            }
        }

        if self.registry.lock().await.has(name) {
            self.unload_locked(name, false).await?;
        }

        let unit = tempfile::Builder::new()
            .prefix(&format!("{name}-"))
            .suffix(".toml")
            .tempfile()
            .map_err(PluginError::Io)?;
        std::fs::write(unit.path(), &record.source)?;
        // Persist past drop; deletion is owned by unload from here on.
        let (_file, unit_path) = unit.keep().map_err(|e| PluginError::Io(e.error))?;

        let load_result = {
            let mut table = self.routes.lock().await;
            self.loader
                .load(
                    name,
                    &record.source,
                    &self.deps,
                    &mut table,
                    PluginOrigin::TempUnit(unit_path.clone()),
                )
                .await
        };

        match load_result {
            Ok(descriptor) => {
                self.registry.lock().await.insert(descriptor);
                tracing::info!(plugin = %name, hash = %fetched_hash, "plugin synced from store");
                Ok(())
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&unit_path) {
                    tracing::warn!(plugin = %name, error = %rm, "failed to delete disposable payload unit");
                }
                Err(e)
            }
        }
    }

    /// Administrative push: read a payload from `path`, write it to the
    /// blob store under the cluster key, and publish a load event carrying
    /// the plugin name only. Subscribers pull the payload and verify it by
    /// hash; no payload bytes travel on the bus.
    ///
    /// Master-only: workers converge by pulling, they never push.
    pub async fn load_and_broadcast(
        &self,
        name: &str,
        path: &Path,
        config: Option<serde_json::Value>,
    ) -> PluginResult<()> {
        if self.config.role != ClusterRole::Master {
            return Err(PluginError::Config(
                "only a master node may push plugin payloads".to_string(),
            ));
        }
        if !path.exists() {
            return Err(PluginError::NotFound(path.to_path_buf()));
        }

        let source = std::fs::read_to_string(path)?;
        self.push_and_announce(name, &source, config).await
    }

    async fn push_and_announce(
        &self,
        name: &str,
        source: &str,
        config: Option<serde_json::Value>,
    ) -> PluginResult<()> {
        let key = code_key(&self.config.cluster_name, name);
        let record = StoreRecord::new(source, config);
        self.bounded("store set", self.store.set(&key, record)).await?;

        let event = PluginEvent::new(PluginAction::Load, name, &self.config.server_id);
        let channel = events_channel(&self.config.cluster_name);
        self.bounded("bus publish", self.bus.publish(&channel, &event.to_json())).await?;

        tracing::info!(plugin = %name, "payload pushed and load event published");
        Ok(())
    }

    /// Handle one raw bus message.
    ///
    /// Never propagates: there is no caller to surface an error to, and a
    /// failure here must not crash the node or desynchronize it from the
    /// cluster. Everything is caught and logged.
    pub async fn handle_event(&self, raw: &str) {
        let event = match PluginEvent::from_json(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed bus message");
                return;
            }
        };

        if event.server_id == self.config.server_id {
            tracing::debug!(plugin = %event.plugin_name, "ignoring self-echo");
            return;
        }

        match event.action {
            PluginAction::Load => {
                if let Err(e) = self.sync_from_store(&event.plugin_name).await {
                    tracing::error!(plugin = %event.plugin_name, error = %e, "remote load failed");
                }
            }
            PluginAction::Unload => {
                if let Err(e) = self.unload_plugin(&event.plugin_name, false).await {
                    tracing::error!(plugin = %event.plugin_name, error = %e, "remote unload failed");
                }
            }
            PluginAction::Unknown => {
                tracing::warn!(plugin = %event.plugin_name, "ignoring unknown bus action");
            }
        }
    }

    /// Subscribe to the cluster event channel and dispatch messages until
    /// the bus closes. Network mode only; a local-mode call is a no-op.
    pub async fn start_event_loop(self: Arc<Self>) -> PluginResult<()> {
        if self.config.mode != ClusterMode::Network {
            tracing::debug!("local mode, no event loop to start");
            return Ok(());
        }

        let channel = events_channel(&self.config.cluster_name);
        let mut subscription =
            self.bounded("bus subscribe", self.bus.subscribe(&channel)).await?;

        let manager = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                manager.handle_event(&message).await;
            }
            tracing::info!("cluster event channel closed");
        });
        // A restart replaces the previous loop; the old subscription must
        // die with it or every event dispatches twice.
        if let Some(previous) = self.event_task.lock().replace(handle) {
            previous.abort();
        }

        tracing::info!(channel = %channel, server_id = %self.config.server_id, "listening for cluster plugin events");
        Ok(())
    }

    /// Load every plugin named by the startup manifest, in order.
    ///
    /// A missing manifest loads nothing. Entries fail independently: an
    /// entry that errors is logged and the remaining entries still load.
    pub async fn autoload_plugins(&self) -> PluginResult<()> {
        let manifest = AutoloadManifest::from_dir(&self.config.plugin_dir)?;
        if manifest.plugins.is_empty() {
            tracing::debug!("autoload manifest absent or empty");
            return Ok(());
        }

        for name in &manifest.plugins {
            if let Err(e) = self.load_plugin(name, false).await {
                tracing::error!(plugin = %name, error = %e, "autoload entry failed");
            }
        }
        Ok(())
    }

    /// Unload every plugin without broadcasting and stop the event loop.
    ///
    /// A node leaving the cluster must not declare its plugins globally
    /// gone; they are only gone from this node.
    pub async fn close(&self) {
        if let Some(handle) = self.event_task.lock().take() {
            handle.abort();
        }

        let names = self.registry.lock().await.names();
        for name in names {
            if let Err(e) = self.unload_plugin(&name, false).await {
                tracing::error!(plugin = %name, error = %e, "unload during close failed");
            }
        }
    }
}
