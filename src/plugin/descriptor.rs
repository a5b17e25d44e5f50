//! Descriptor of a loaded plugin.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::Plugin;
use crate::router::RouteKey;

/// Where a plugin's payload came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOrigin {
    /// Real file in the node's plugin directory (local mode).
    LocalFile(PathBuf),
    /// Disposable temp file holding a network-sourced payload; deleted when
    /// the descriptor is destroyed.
    TempUnit(PathBuf),
}

impl PluginOrigin {
    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        match self {
            Self::LocalFile(p) | Self::TempUnit(p) => p,
        }
    }

    /// Whether this origin is a disposable temp unit.
    pub fn is_disposable(&self) -> bool {
        matches!(self, Self::TempUnit(_))
    }
}

/// A loaded plugin: identity, payload provenance, live instance, and the
/// routes attributed to it.
///
/// Created only on a successful load; replaced (never merged) when a sync
/// detects a differing hash; destroyed on unload.
pub struct PluginDescriptor {
    /// Unique name within this process.
    pub name: String,
    /// Version declared by the payload header, informational.
    pub version: String,
    /// Raw payload text.
    pub source: String,
    /// Hex SHA-256 of `source`, computed at load.
    pub content_hash: String,
    /// The initialized plugin instance.
    pub instance: Box<dyn Plugin>,
    /// Route keys this plugin attached, in registration order.
    pub routes: Vec<RouteKey>,
    /// Payload provenance.
    pub origin: PluginOrigin,
    /// When the load completed.
    pub loaded_at: DateTime<Utc>,
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("content_hash", &self.content_hash)
            .field("routes", &self.routes.len())
            .field("origin", &self.origin)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}
