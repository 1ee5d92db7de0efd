use serde::{Deserialize, Serialize};

use crate::round::EndReason;

/// Score units awarded for each agreed round
pub const POINTS_PER_MATCH: u32 = 10;

/// Prose half of the result, which only the host produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryState {
    Computing,
    Ready(String),
}

impl SummaryState {
    pub fn text(&self) -> Option<&str> {
        match self {
            SummaryState::Computing => None,
            SummaryState::Ready(text) => Some(text),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SummaryState::Ready(_))
    }
}

/// Final outcome of a session
///
/// Every numeric field is a pure function of `total_rounds` and `matches`, so
/// both sides derive identical numbers without exchanging them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub total_rounds: usize,
    pub matches: u32,
    pub percentage: u8,
    pub points: u32,
    pub reason: EndReason,
    pub summary: SummaryState,
}

impl SessionResult {
    pub fn from_tally(total_rounds: usize, matches: u32, reason: EndReason) -> Self {
        Self {
            total_rounds,
            matches,
            percentage: match_percentage(matches, total_rounds),
            points: matches * POINTS_PER_MATCH,
            reason,
            summary: SummaryState::Computing,
        }
    }
}

/// Rounded share of agreed rounds; zero rounds count as one
pub fn match_percentage(matches: u32, total_rounds: usize) -> u8 {
    let total = total_rounds.max(1) as f64;
    let ratio = (matches as f64 / total).clamp(0.0, 1.0);
    (ratio * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2, 3, 67)]
    #[case(1, 3, 33)]
    #[case(0, 10, 0)]
    #[case(10, 10, 100)]
    #[case(0, 0, 0)]
    fn percentage_is_rounded(#[case] matches: u32, #[case] total: usize, #[case] expected: u8) {
        assert_eq!(match_percentage(matches, total), expected);
    }

    #[test]
    fn tally_derives_points_and_starts_computing() {
        let result = SessionResult::from_tally(3, 2, EndReason::Completed);

        assert_eq!(result.points, 20);
        assert_eq!(result.percentage, 67);
        assert_eq!(result.summary, SummaryState::Computing);
        assert_eq!(result.summary.text(), None);
    }
}
