//! Plugin lifecycle subsystem.
//!
//! Plugins are named, versioned units that register routes and shared
//! actions. Each node keeps a private registry of loaded descriptors; a
//! cluster keeps nodes converged by announcing load/unload events on the
//! notification bus and distributing payloads through the blob store.
//!
//! # Example payload
//!
//! ```toml
//! [plugin]
//! name = "pricing"
//! version = "1.2.0"
//!
//! [config]
//! base_rate = 100
//! ```

mod contract;
mod descriptor;
mod error;
mod loader;
mod manager;
mod manifest;
mod payload;
mod registry;

pub use contract::{FactoryTable, Plugin, PluginFactory};
pub use descriptor::{PluginDescriptor, PluginOrigin};
pub use error::{PluginError, PluginResult};
pub use loader::PluginLoader;
pub use manager::{PluginManager, PluginSummary};
pub use manifest::{AutoloadManifest, AUTOLOAD_MANIFEST};
pub use payload::{content_hash, PayloadHeader, PluginPayload};
pub use registry::PluginRegistry;
