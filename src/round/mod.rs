// Public API - what other modules can use
pub use choice::{Choice, ChoiceRejected};
pub use countdown::{Countdown, CountdownTick};
pub use machine::{EndReason, PeerChoiceIgnored, RoundMachine, RoundPhase, RoundUpdate};

// Internal modules
mod choice;
mod countdown;
mod machine;
