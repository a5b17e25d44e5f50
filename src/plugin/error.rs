//! Plugin lifecycle error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for plugin lifecycle operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur during plugin lifecycle operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin payload file not found.
    #[error("Plugin payload not found: {0}")]
    NotFound(PathBuf),

    /// Plugin contract validation failed; nothing was registered.
    #[error("Plugin '{name}' failed validation: {reason}")]
    Validation { name: String, reason: String },

    /// Plugin code failed during instantiation or initialize.
    #[error("Plugin '{name}' failed during execution: {reason}")]
    Execution { name: String, reason: String },

    /// BlobStore fetch failed or returned nothing; prior state is preserved.
    #[error("Sync failed for plugin '{name}': {reason}")]
    Sync { name: String, reason: String },

    /// Cleanup or route removal failed during unload. Non-fatal: the
    /// registry entry is removed regardless.
    #[error("Teardown of plugin '{name}' partially failed: {reason}")]
    Teardown { name: String, reason: String },

    /// Bus or store operation exceeded the configured bound.
    #[error("Operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// NotificationBus transport failure.
    #[error("Notification bus error: {0}")]
    Bus(String),

    /// BlobStore transport failure.
    #[error("Blob store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
