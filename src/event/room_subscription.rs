use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    bus::RoomBus,
    messages::Envelope,
    room_handler::{RoomMessageError, RoomMessageHandler},
};

/// Listens on one room channel and routes decoded messages to a handler
///
/// The participant's own messages come back on the shared channel and are
/// dropped here, as are payloads that fail to decode.
pub struct RoomSubscription {
    channel: String,
    local_id: Uuid,
    handler: Arc<dyn RoomMessageHandler>,
    bus: Arc<dyn RoomBus>,
}

impl RoomSubscription {
    pub fn new(
        channel: String,
        local_id: Uuid,
        handler: Arc<dyn RoomMessageHandler>,
        bus: Arc<dyn RoomBus>,
    ) -> Self {
        Self {
            channel,
            local_id,
            handler,
            bus,
        }
    }

    /// Subscribes before returning, then spawns the routing task
    pub async fn start(self) -> JoinHandle<()> {
        let channel = self.channel.clone();
        let handler_name = self.handler.handler_name();

        info!(
            channel = %channel,
            handler = handler_name,
            "Starting room subscription"
        );

        let mut receiver = self.bus.subscribe(&channel).await;

        tokio::spawn(async move {
            loop {
                let raw = match receiver.recv().await {
                    Ok(raw) => raw,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(channel = %channel, skipped, "Room subscription lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let envelope = match Envelope::decode(&raw) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        debug!(channel = %channel, error = %e, "Dropping undecodable room message");
                        continue;
                    }
                };

                if envelope.sender == self.local_id {
                    continue;
                }

                debug!(
                    channel = %channel,
                    handler = handler_name,
                    message_type = envelope.message.message_type(),
                    sender_role = %envelope.role,
                    "Received room message"
                );

                match self.handler.handle_room_message(&channel, envelope).await {
                    Ok(()) => {}
                    Err(RoomMessageError::HandlerClosed(reason)) => {
                        info!(channel = %channel, reason = %reason, "Room handler closed");
                        break;
                    }
                    Err(e) => {
                        warn!(
                            channel = %channel,
                            handler = handler_name,
                            error = %e,
                            "Room message handler failed"
                        );
                    }
                }
            }

            debug!(
                channel = %channel,
                handler = handler_name,
                "Room subscription ended"
            );
        })
    }
}
