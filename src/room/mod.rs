// Public API - what other modules can use
pub use handshake::{Handshake, HandshakeStage, ProbeOutcome};
pub use models::{Role, RoomCode, ROOM_CODE_PREFIX};
pub use presence::{PresenceMonitor, PresenceState};

// Internal modules
mod handshake;
mod models;
mod presence;
