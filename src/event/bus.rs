use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Default number of messages a room channel buffers per subscriber
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Best-effort, room-scoped broadcast transport
///
/// `publish` never fails and gives no delivery or ordering guarantee.
/// Subscribers only see messages published while they are subscribed.
/// Channels are keyed by name, so every subscriber to the same name shares
/// one channel.
#[async_trait]
pub trait RoomBus: Send + Sync {
    async fn publish(&self, channel: &str, payload: String);

    async fn subscribe(&self, channel: &str) -> broadcast::Receiver<String>;

    /// Drops the channel once nobody listens to it anymore
    async fn release(&self, channel: &str);
}

/// In-process bus backed by one tokio broadcast channel per room
#[derive(Debug, Clone)]
pub struct InMemoryRoomBus {
    /// Room channels: channel name -> sender
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
    capacity: usize,
}

impl Default for InMemoryRoomBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RoomBus for InMemoryRoomBus {
    async fn publish(&self, channel: &str, payload: String) {
        let channels = self.channels.read().await;

        match channels.get(channel) {
            Some(sender) => match sender.send(payload) {
                Ok(receivers) => {
                    debug!(channel = %channel, receivers, "Room message published");
                }
                Err(_) => {
                    debug!(channel = %channel, "Room message published with no receivers");
                }
            },
            None => {
                debug!(channel = %channel, "No room channel open, message dropped");
            }
        }
    }

    async fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(channel) {
                return sender.subscribe();
            }
        }

        let mut channels = self.channels.write().await;
        // Another subscriber may have opened it between the two locks
        let sender = channels.entry(channel.to_string()).or_insert_with(|| {
            debug!(channel = %channel, "Creating new room channel for subscription");
            broadcast::channel(self.capacity).0
        });
        sender.subscribe()
    }

    async fn release(&self, channel: &str) {
        let mut channels = self.channels.write().await;

        if let Some(sender) = channels.get(channel) {
            if sender.receiver_count() == 0 {
                channels.remove(channel);
                debug!(channel = %channel, "Room channel released");
            } else {
                debug!(
                    channel = %channel,
                    receivers = sender.receiver_count(),
                    "Room channel still in use"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_to_same_room_share_a_channel() {
        let bus = InMemoryRoomBus::new();
        let mut first = bus.subscribe("ashwaq_room_ASH-1234").await;
        let mut second = bus.subscribe("ashwaq_room_ASH-1234").await;

        bus.publish("ashwaq_room_ASH-1234", "hello".into()).await;

        assert_eq!(first.recv().await.unwrap(), "hello");
        assert_eq!(second.recv().await.unwrap(), "hello");
        assert_eq!(bus.channel_count().await, 1);
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let bus = InMemoryRoomBus::new();
        let mut other = bus.subscribe("ashwaq_room_ASH-9999").await;
        let _own = bus.subscribe("ashwaq_room_ASH-1234").await;

        bus.publish("ashwaq_room_ASH-1234", "hello".into()).await;

        assert!(matches!(
            other.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn messages_before_subscription_are_lost() {
        let bus = InMemoryRoomBus::new();
        bus.publish("room", "early".into()).await;

        let mut receiver = bus.subscribe("room").await;
        bus.publish("room", "late".into()).await;

        assert_eq!(receiver.recv().await.unwrap(), "late");
    }

    #[tokio::test]
    async fn release_keeps_channel_while_subscribed() {
        let bus = InMemoryRoomBus::new();
        let receiver = bus.subscribe("room").await;

        bus.release("room").await;
        assert_eq!(bus.channel_count().await, 1);

        drop(receiver);
        bus.release("room").await;
        assert_eq!(bus.channel_count().await, 0);
        assert_eq!(bus.subscriber_count("room").await, 0);
    }
}
