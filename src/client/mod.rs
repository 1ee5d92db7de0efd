// Public API - what other modules can use
pub use config::{ConfigKey, SessionConfig};
pub use driver::{ClientDriver, ClientHandle};
pub use effects::{Effect, Input, SessionEvent, SessionSnapshot, StageKind};
pub use session::ClientSession;

// Internal modules
mod config;
mod driver;
mod effects;
mod session;
