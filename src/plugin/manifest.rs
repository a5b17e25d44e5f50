//! Startup autoload manifest.
//!
//! An ordered list of plugin names read once at startup from the plugin
//! directory. Absence is tolerated: a node without a manifest simply starts
//! with nothing loaded.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{PluginError, PluginResult};

/// Manifest file name inside the plugin directory.
pub const AUTOLOAD_MANIFEST: &str = "autoload.toml";

/// Ordered autoload manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoloadManifest {
    /// Plugin names, loaded in order.
    #[serde(default)]
    pub plugins: Vec<String>,
}

impl AutoloadManifest {
    /// Parse a manifest from TOML text.
    pub fn from_toml(content: &str) -> PluginResult<Self> {
        toml::from_str(content).map_err(|e| PluginError::Config(format!("invalid autoload manifest: {e}")))
    }

    /// Read the manifest from a plugin directory.
    ///
    /// A missing file yields an empty manifest.
    pub fn from_dir(plugin_dir: &Path) -> PluginResult<Self> {
        let path = plugin_dir.join(AUTOLOAD_MANIFEST);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_ordered_list() {
        let manifest = AutoloadManifest::from_toml("plugins = [\"auth\", \"pricing\"]").unwrap();
        assert_eq!(manifest.plugins, vec!["auth", "pricing"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = AutoloadManifest::from_dir(dir.path()).unwrap();
        assert!(manifest.plugins.is_empty());
    }

    #[test]
    fn test_reads_from_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(AUTOLOAD_MANIFEST), "plugins = [\"greeter\"]").unwrap();

        let manifest = AutoloadManifest::from_dir(dir.path()).unwrap();
        assert_eq!(manifest.plugins, vec!["greeter"]);
    }

    #[test]
    fn test_invalid_manifest_is_config_error() {
        let result = AutoloadManifest::from_toml("plugins = 3");
        assert!(matches!(result, Err(PluginError::Config(_))));
    }
}
