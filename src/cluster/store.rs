//! Blob store port.
//!
//! Shared keyed persistence for plugin payloads. Writes are unconditional
//! overwrites (last-writer-wins, no version token); consumers recompute the
//! content hash from the payload on every read and never trust a stored one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::plugin::PluginResult;

/// Record stored per plugin name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Opaque payload text the content hash is computed over.
    pub source: String,
    /// Optional free-form config pushed alongside the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl StoreRecord {
    /// Create a record.
    pub fn new(source: impl Into<String>, config: Option<serde_json::Value>) -> Self {
        Self { source: source.into(), config }
    }
}

/// Keyed store port for bulk plugin payloads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the record under `key`, if any.
    async fn get(&self, key: &str) -> PluginResult<Option<StoreRecord>>;

    /// Write `record` under `key`, overwriting unconditionally.
    async fn set(&self, key: &str, record: StoreRecord) -> PluginResult<()>;

    /// Delete the record under `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> PluginResult<()>;
}

/// In-memory store for single-process clusters and tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<String, StoreRecord>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryStore {
    async fn get(&self, key: &str) -> PluginResult<Option<StoreRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn set(&self, key: &str, record: StoreRecord) -> PluginResult<()> {
        self.records.write().insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PluginResult<()> {
        self.records.write().remove(key);
        Ok(())
    }
}
