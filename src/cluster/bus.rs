//! Notification bus port.
//!
//! Small control messages only; bulk payload bytes go through the
//! [`BlobStore`](super::store::BlobStore). Delivery is best effort: a node
//! offline at publish time misses the event and self-heals via autoload or a
//! manual resync. No ordering guarantee holds across distinct publishers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::plugin::PluginResult;

/// Receiving half of a channel subscription.
pub struct BusSubscription {
    rx: broadcast::Receiver<String>,
}

impl BusSubscription {
    /// Wait for the next message on the channel.
    ///
    /// Returns `None` when the channel is closed. A slow subscriber that
    /// lagged behind skips the missed messages rather than failing; the
    /// pull-based sync model makes missed control messages recoverable.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "bus subscriber lagged, skipping missed messages");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Publish/subscribe port for cluster control messages.
#[async_trait]
pub trait NotificationBus: Send + Sync {
    /// Publish a message to every current subscriber of `channel`.
    async fn publish(&self, channel: &str, message: &str) -> PluginResult<()>;

    /// Subscribe to `channel`, receiving messages published after this call.
    async fn subscribe(&self, channel: &str) -> PluginResult<BusSubscription>;
}

/// In-memory bus backed by tokio broadcast channels, one per channel name.
///
/// Suitable for single-process clusters and tests; a networked transport
/// implements the same trait.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
}

impl InMemoryBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }
}

#[async_trait]
impl NotificationBus for InMemoryBus {
    async fn publish(&self, channel: &str, message: &str) -> PluginResult<()> {
        // Fire and forget: no subscribers is not an error.
        let _ = self.sender(channel).send(message.to_string());
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> PluginResult<BusSubscription> {
        let rx = self.sender(channel).subscribe();
        Ok(BusSubscription { rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe("c1").await.unwrap();

        bus.publish("c1", "hello").await.unwrap();
        assert_eq!(sub.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InMemoryBus::new();
        assert!(bus.publish("empty", "dropped").await.is_ok());
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let bus = InMemoryBus::new();
        let mut sub_a = bus.subscribe("a").await.unwrap();

        bus.publish("b", "for-b").await.unwrap();
        bus.publish("a", "for-a").await.unwrap();

        assert_eq!(sub_a.recv().await.as_deref(), Some("for-a"));
    }

    #[tokio::test]
    async fn test_subscription_misses_prior_messages() {
        let bus = InMemoryBus::new();
        bus.publish("late", "before").await.unwrap();

        let mut sub = bus.subscribe("late").await.unwrap();
        bus.publish("late", "after").await.unwrap();

        assert_eq!(sub.recv().await.as_deref(), Some("after"));
    }
}
