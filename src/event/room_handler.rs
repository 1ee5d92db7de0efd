use async_trait::async_trait;
use thiserror::Error;

use super::messages::Envelope;

/// Errors that can occur when handling room messages
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoomMessageError {
    #[error("Failed to decode room message: {0}")]
    Decode(String),

    #[error("Failed to encode room message: {0}")]
    Encode(String),

    /// The consumer is gone; the subscription should stop
    #[error("Handler closed: {0}")]
    HandlerClosed(String),
}

/// Trait for components that react to messages arriving on a room channel
#[async_trait]
pub trait RoomMessageHandler: Send + Sync {
    async fn handle_room_message(
        &self,
        channel: &str,
        envelope: Envelope,
    ) -> Result<(), RoomMessageError>;

    /// Get a human-readable name for this handler (for logging/debugging)
    fn handler_name(&self) -> &'static str;
}
