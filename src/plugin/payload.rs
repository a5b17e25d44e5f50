//! Plugin payload parsing, validation, and content hashing.
//!
//! A payload is the unit of distribution: a TOML document with a `[plugin]`
//! metadata header and a free-form `[config]` table consumed by the plugin's
//! factory. The content hash is computed over the raw text and is the sole
//! mechanism for detecting that the same version is already present.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use super::{PluginError, PluginResult};

/// Hex SHA-256 digest of a payload text.
///
/// Always recomputed from the text; a stored hash is never trusted.
pub fn content_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Parsed plugin payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginPayload {
    /// Metadata header.
    pub plugin: PayloadHeader,
    /// Plugin-specific configuration handed to the factory.
    #[serde(default)]
    pub config: toml::Table,
}

/// `[plugin]` header of a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadHeader {
    /// Plugin name (unique identifier within a process).
    pub name: String,
    /// Plugin version, informational.
    pub version: String,
    /// Plugin description.
    #[serde(default)]
    pub description: Option<String>,
}

impl PluginPayload {
    /// Parse a payload from its TOML text.
    pub fn from_toml(name: &str, content: &str) -> PluginResult<Self> {
        toml::from_str(content).map_err(|e| PluginError::Validation {
            name: name.to_string(),
            reason: format!("payload is not valid TOML: {e}"),
        })
    }

    /// Parse a payload from a file.
    pub fn from_file(name: &str, path: &Path) -> PluginResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(name, &content)
    }

    /// Validate the payload against the name it was requested under.
    ///
    /// Runs before any side effect; a failure here means nothing was
    /// registered anywhere.
    pub fn validate(&self, expected_name: &str) -> PluginResult<()> {
        if self.plugin.name.is_empty() {
            return Err(PluginError::Validation {
                name: expected_name.to_string(),
                reason: "payload header is missing a plugin name".to_string(),
            });
        }

        if self.plugin.name != expected_name {
            return Err(PluginError::Validation {
                name: expected_name.to_string(),
                reason: format!("payload declares name '{}'", self.plugin.name),
            });
        }

        if !self.plugin.name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(PluginError::Validation {
                name: expected_name.to_string(),
                reason: "plugin name must contain only alphanumeric characters, hyphens, and underscores"
                    .to_string(),
            });
        }

        if self.plugin.version.is_empty() {
            return Err(PluginError::Validation {
                name: expected_name.to_string(),
                reason: "payload header is missing a version".to_string(),
            });
        }

        Ok(())
    }
}
