//! # Plugmesh
//!
//! Distributed plugin lifecycle manager: load, unload, and hot-synchronize
//! plugins across a cluster of cooperating node processes without
//! restarting any of them.
//!
//! A plugin is a statically compiled implementation of the [`Plugin`] trait,
//! registered in a process-start [`FactoryTable`] and configured by a TOML
//! payload. Payloads are distributed through a shared [`cluster::BlobStore`];
//! small load/unload control messages travel on a [`cluster::NotificationBus`].
//! Nodes converge by pulling payloads and comparing content hashes, never by
//! receiving bytes on the bus.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use plugmesh::cluster::{InMemoryBus, InMemoryStore};
//! use plugmesh::config::NodeConfig;
//! use plugmesh::plugin::{FactoryTable, PluginManager};
//!
//! # async fn demo() -> plugmesh::plugin::PluginResult<()> {
//! let manager = Arc::new(PluginManager::new(
//!     NodeConfig::default(),
//!     FactoryTable::default(),
//!     Arc::new(InMemoryBus::new()),
//!     Arc::new(InMemoryStore::new()),
//! ));
//! manager.autoload_plugins().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]

pub mod cluster;
pub mod config;
pub mod deps;
pub mod plugin;
pub mod router;

pub use config::{ClusterMode, ClusterRole, NodeConfig};
pub use deps::{Action, ActionRegistry, ModuleGate, PluginDeps};
pub use plugin::{
    content_hash, FactoryTable, Plugin, PluginError, PluginFactory, PluginManager, PluginResult,
};
pub use router::{Method, RouteKey, RouteTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "plugmesh";
