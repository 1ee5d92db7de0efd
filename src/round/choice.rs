use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::OPTIONS_PER_PROMPT;

/// Why a local choice was not accepted
///
/// These are guards, not failures: the session logs them and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChoiceRejected {
    #[error("Choice {0} is outside 1..=4")]
    OutOfRange(u8),

    #[error("No round is active")]
    NoActiveRound,

    #[error("Round {0} is already resolved")]
    RoundResolved(usize),

    #[error("Round countdown has expired")]
    CountdownExpired,

    #[error("Partner is disconnected")]
    PartnerDisconnected,

    #[error("A choice was already submitted for round {0}")]
    AlreadyChosen(usize),
}

/// One participant's option for a round, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Choice(u8);

impl Choice {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = OPTIONS_PER_PROMPT as u8;

    pub fn new(value: u8) -> Result<Self, ChoiceRejected> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ChoiceRejected::OutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Zero-based index into a prompt's options
    pub fn option_index(self) -> usize {
        (self.0 - Self::MIN) as usize
    }
}

impl TryFrom<u8> for Choice {
    type Error = ChoiceRejected;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Choice> for u8 {
    fn from(choice: Choice) -> Self {
        choice.0
    }
}
