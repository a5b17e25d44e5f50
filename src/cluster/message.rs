//! Wire schema for cluster plugin events.

use serde::{Deserialize, Serialize};

/// Lifecycle action announced on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginAction {
    /// A plugin payload was pushed; subscribers should pull and sync.
    Load,
    /// A plugin was unloaded cluster-wide.
    Unload,
    /// Forward compatibility: an action this node does not understand.
    #[serde(other)]
    Unknown,
}

/// Control message published on the cluster event channel.
///
/// Carries the plugin name only; payload bytes travel through the BlobStore
/// and are pulled by each subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEvent {
    /// What happened.
    pub action: PluginAction,
    /// Name of the affected plugin.
    pub plugin_name: String,
    /// Id of the publishing node, used for self-echo suppression.
    pub server_id: String,
}

impl PluginEvent {
    /// Create an event.
    pub fn new(action: PluginAction, plugin_name: impl Into<String>, server_id: impl Into<String>) -> Self {
        Self { action, plugin_name: plugin_name.into(), server_id: server_id.into() }
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> String {
        // Serialization of this shape cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a wire message.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Bus channel name for a cluster's plugin events.
pub fn events_channel(cluster_name: &str) -> String {
    format!("{cluster_name}:plugin:events")
}

/// BlobStore key for a plugin's payload within a cluster.
pub fn code_key(cluster_name: &str, plugin_name: &str) -> String {
    format!("{cluster_name}:plugin:code:{plugin_name}")
}
