// Room message transport
//
// A best-effort broadcast bus keyed by room channel, the wire messages that
// travel on it, and the subscription task that feeds them to a handler.

// Public API - what other modules can use
pub use bus::{InMemoryRoomBus, RoomBus, DEFAULT_CHANNEL_CAPACITY};
pub use messages::{Envelope, RoomMessage};
pub use room_handler::{RoomMessageError, RoomMessageHandler};
pub use room_subscription::RoomSubscription;

// Internal modules
mod bus;
mod messages;
mod room_handler;
mod room_subscription;
