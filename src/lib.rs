// Two-participant room session library
// This file exposes the public API for the binary and integration tests

pub mod client;
pub mod content;
pub mod event;
pub mod results;
pub mod room;
pub mod round;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use client::{
    ClientDriver, ClientHandle, ClientSession, SessionConfig, SessionEvent, SessionSnapshot,
    StageKind,
};
pub use content::{CatalogContentGenerator, ContentGenerator, RoundContent, Topic};
pub use event::{Envelope, InMemoryRoomBus, RoomBus, RoomMessage};
pub use results::{SessionResult, SummaryGenerator, TemplateSummaryGenerator, FALLBACK_SUMMARY};
pub use room::{PresenceState, Role, RoomCode};
pub use round::{Choice, EndReason};
pub use shared::{AppError, GenerationError};
