use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::AppError;

/// Prefix shown on every room code
pub const ROOM_CODE_PREFIX: &str = "ASH-";

const CHANNEL_PREFIX: &str = "ashwaq_room_";
const MIN_CODE_BODY_LEN: usize = 3;
const MAX_CODE_BODY_LEN: usize = 8;

/// Short human-typeable room identifier, always stored with the prefix normalized
///
/// Collisions are a usability concern only: two rooms sharing a code share a
/// channel, and the peer lock in the session keeps pairs apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generates a fresh host code such as `ASH-4821`
    pub fn generate() -> Self {
        let number: u16 = rand::rng().random_range(1000..=9999);
        Self(format!("{ROOM_CODE_PREFIX}{number}"))
    }

    /// Parses user input, case-insensitively, adding the prefix when missing
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let upper = input.trim().to_uppercase();
        let body = upper.strip_prefix(ROOM_CODE_PREFIX).unwrap_or(&upper);

        if body.len() < MIN_CODE_BODY_LEN || body.len() > MAX_CODE_BODY_LEN {
            return Err(AppError::InvalidRoomCode(format!(
                "'{}' must have between {} and {} characters after the prefix",
                input.trim(),
                MIN_CODE_BODY_LEN,
                MAX_CODE_BODY_LEN
            )));
        }

        if !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::InvalidRoomCode(format!(
                "'{}' may only contain letters and digits",
                input.trim()
            )));
        }

        Ok(Self(format!("{ROOM_CODE_PREFIX}{body}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bus channel for this room; identical on both participants' processes
    pub fn channel_name(&self) -> String {
        format!("{CHANNEL_PREFIX}{}", self.0)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Which side of the room a participant plays
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    /// The role the remote participant must hold
    pub fn peer(self) -> Role {
        match self {
            Role::Host => Role::Guest,
            Role::Guest => Role::Host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn generated_codes_use_prefix_and_four_digits() {
        for _ in 0..50 {
            let code = RoomCode::generate();
            let body = code.as_str().strip_prefix(ROOM_CODE_PREFIX).unwrap();
            let number: u16 = body.parse().unwrap();
            assert!((1000..=9999).contains(&number));
        }
    }

    #[rstest]
    #[case("ASH-1234", "ASH-1234")]
    #[case("ash-1234", "ASH-1234")]
    #[case("1234", "ASH-1234")]
    #[case("  ab12 ", "ASH-AB12")]
    fn parse_normalizes_input(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(RoomCode::parse(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("12")]
    #[case("ASH-")]
    #[case("ASH-12 4")]
    #[case("123456789")]
    fn parse_rejects_bad_input(#[case] input: &str) {
        assert!(matches!(
            RoomCode::parse(input),
            Err(AppError::InvalidRoomCode(_))
        ));
    }

    #[test]
    fn channel_name_is_deterministic() {
        let a = RoomCode::parse("ash-1234").unwrap();
        let b: RoomCode = "ASH-1234".parse().unwrap();
        assert_eq!(a.channel_name(), b.channel_name());
        assert_eq!(a.channel_name(), "ashwaq_room_ASH-1234");
    }

    #[test]
    fn roles_pair_with_each_other() {
        assert_eq!(Role::Host.peer(), Role::Guest);
        assert_eq!(Role::Guest.peer(), Role::Host);
        assert_eq!(Role::Guest.to_string(), "GUEST");
    }
}
