use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::room_handler::RoomMessageError;
use crate::content::{RoundContent, Topic};
use crate::room::Role;
use crate::round::Choice;

/// Messages exchanged between host and guest on a room channel
///
/// Every variant is safe to receive duplicated, out of order, or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum_macros::IntoStaticStr)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomMessage {
    /// Guest: looking for a host
    PresenceProbe,
    /// Host: probe seen, content follows
    PresenceAck,
    /// Host: the full round batch, repeated until the guest moves on
    ContentSync { topic: Topic, content: RoundContent },
    /// Both: liveness once the room is active
    RoomHeartbeat,
    /// Both: one participant's answer for `round`
    Choice { round: usize, choice: Choice },
    /// Host: final summary text
    SummarySync { text: String },
}

impl RoomMessage {
    /// Wire tag, e.g. `CONTENT_SYNC`
    pub fn message_type(&self) -> &'static str {
        self.into()
    }
}

/// A message stamped with who sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: Uuid,
    pub role: Role,
    pub sent_at: DateTime<Utc>,
    #[serde(flatten)]
    pub message: RoomMessage,
}

impl Envelope {
    pub fn new(sender: Uuid, role: Role, message: RoomMessage) -> Self {
        Self {
            sender,
            role,
            sent_at: Utc::now(),
            message,
        }
    }

    pub fn encode(&self) -> Result<String, RoomMessageError> {
        serde_json::to_string(self).map_err(|e| RoomMessageError::Encode(e.to_string()))
    }

    pub fn decode(raw: &str) -> Result<Self, RoomMessageError> {
        serde_json::from_str(raw).map_err(|e| RoomMessageError::Decode(e.to_string()))
    }
}
