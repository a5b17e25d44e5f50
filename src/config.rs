//! Node configuration.
//!
//! Loaded from a TOML file; every field has a default so a bare file (or no
//! file at all) yields a working local-mode node.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::plugin::{PluginError, PluginResult};

/// Operating mode of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMode {
    /// Plugins load from the local plugin directory only.
    Local,
    /// Plugins synchronize through the cluster bus and store.
    Network,
}

/// Role of a node within its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRole {
    /// May push payloads and broadcast load events.
    Master,
    /// Pulls payloads in response to bus events.
    Worker,
}

/// Configuration of a plugmesh node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Cluster namespace; prefixes every bus channel and store key.
    pub cluster_name: String,

    /// Unique id of this node. Required to be distinct per process in
    /// network mode; defaults to a generated UUID.
    pub server_id: String,

    /// Operating mode.
    pub mode: ClusterMode,

    /// Node role.
    pub role: ClusterRole,

    /// Directory holding local plugin payloads and the autoload manifest.
    pub plugin_dir: PathBuf,

    /// Bound, in seconds, on every bus and store operation.
    pub op_timeout_secs: u64,

    /// Internal module names plugins are allowed to resolve.
    pub approved_modules: Vec<String>,

    /// Process-level configuration handed to plugins verbatim.
    pub process_config: toml::Table,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cluster_name: "plugmesh".to_string(),
            server_id: uuid::Uuid::new_v4().to_string(),
            mode: ClusterMode::Local,
            role: ClusterRole::Worker,
            plugin_dir: default_plugin_dir(),
            op_timeout_secs: 10,
            approved_modules: Vec::new(),
            process_config: toml::Table::new(),
        }
    }
}

fn default_plugin_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from("plugins"), |d| d.join("plugmesh/plugins"))
}

impl NodeConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(content: &str) -> PluginResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PluginError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> PluginResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> PluginResult<()> {
        if self.cluster_name.is_empty() {
            return Err(PluginError::Config("cluster_name must not be empty".to_string()));
        }
        if self.mode == ClusterMode::Network && self.server_id.is_empty() {
            return Err(PluginError::Config(
                "server_id is required in network mode".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the payload file for `name` in the local plugin directory.
    pub fn payload_path(&self, name: &str) -> PathBuf {
        self.plugin_dir.join(format!("{name}.toml"))
    }

    /// Process config as JSON for the dependency bundle.
    pub fn process_config_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.process_config).unwrap_or(serde_json::Value::Null)
    }
}
