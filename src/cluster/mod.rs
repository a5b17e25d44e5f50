//! Cluster transport ports composed by the plugin manager.
//!
//! Two deliberately separate ports: the [`NotificationBus`] carries small
//! control messages, the [`BlobStore`] carries bulk plugin payloads. A
//! broadcast is one store write plus one notify; every subscriber pulls the
//! payload and verifies it by hash rather than receiving bytes on the wire.

mod bus;
mod message;
mod store;

pub use bus::{BusSubscription, InMemoryBus, NotificationBus};
pub use message::{code_key, events_channel, PluginAction, PluginEvent};
pub use store::{BlobStore, InMemoryStore, StoreRecord};
