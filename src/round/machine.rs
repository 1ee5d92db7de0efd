use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;
use tracing::{debug, info};

use super::choice::{Choice, ChoiceRejected};
use super::countdown::{Countdown, CountdownTick};

/// How a session reached its end
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    Completed,
    TimedOut,
}

/// Phase of the round under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    /// Prompt shown, neither slot filled
    Presenting,
    /// One slot filled, waiting on the other
    AwaitingChoices,
    /// Both sides chose; held for the display delay before advancing
    Resolved { is_match: bool },
    Ended(EndReason),
}

/// State change produced by a round operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundUpdate {
    Unchanged,
    Resolved { round: usize, is_match: bool },
    Advanced { round: usize },
    Ended { reason: EndReason },
}

/// Why a peer's CHOICE message was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PeerChoiceIgnored {
    #[error("Session is over")]
    NotActive,

    #[error("Choice for past round {round} (current {cursor})")]
    Stale { round: usize, cursor: usize },

    #[error("Choice for future round {round} (current {cursor})")]
    Early { round: usize, cursor: usize },

    #[error("Duplicate of the recorded choice")]
    Duplicate,

    #[error("Conflicts with the recorded choice")]
    Conflicting,
}

/// Drives the shared sequence of rounds from one participant's side
///
/// Resolution is monotonic: the cursor only moves forward, and a round that
/// reached `Resolved` is never reopened. The match counter changes only on
/// the transition into `Resolved`, so it counts each round at most once.
#[derive(Debug, Clone)]
pub struct RoundMachine {
    total: usize,
    cursor: usize,
    own: Option<Choice>,
    peer: Option<Choice>,
    phase: RoundPhase,
    matches: u32,
    countdown: Countdown,
    peer_connected: bool,
    recent_own: Vec<(usize, Choice)>,
}

impl RoundMachine {
    pub fn new(total: usize, round_duration: Duration) -> Self {
        let phase = if total == 0 {
            RoundPhase::Ended(EndReason::Completed)
        } else {
            RoundPhase::Presenting
        };

        Self {
            total,
            cursor: 0,
            own: None,
            peer: None,
            phase,
            matches: 0,
            countdown: Countdown::new(round_duration),
            peer_connected: false,
            recent_own: Vec::new(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn matches(&self) -> u32 {
        self.matches
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn own_choice(&self) -> Option<Choice> {
        self.own
    }

    pub fn peer_choice(&self) -> Option<Choice> {
        self.peer
    }

    pub fn remaining(&self) -> Duration {
        self.countdown.remaining()
    }

    pub fn is_countdown_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, RoundPhase::Ended(_))
    }

    /// Own choices for the current and previous round, kept for redundant resends
    ///
    /// A peer can lag at most one round behind: this side only advances past
    /// round k after receiving the peer's choice for k.
    pub fn recent_own_choices(&self) -> &[(usize, Choice)] {
        &self.recent_own
    }

    fn is_open(&self) -> bool {
        matches!(
            self.phase,
            RoundPhase::Presenting | RoundPhase::AwaitingChoices
        )
    }

    /// Countdown runs only while the round is open and the peer is reachable
    pub fn set_peer_connected(&mut self, connected: bool) {
        self.peer_connected = connected;
        self.sync_countdown();
    }

    fn sync_countdown(&mut self) {
        if self.is_open() && self.peer_connected {
            self.countdown.resume();
        } else {
            self.countdown.pause();
        }
    }

    pub fn submit_own(&mut self, choice: Choice) -> Result<RoundUpdate, ChoiceRejected> {
        match self.phase {
            RoundPhase::Ended(EndReason::TimedOut) => return Err(ChoiceRejected::CountdownExpired),
            RoundPhase::Ended(EndReason::Completed) => return Err(ChoiceRejected::NoActiveRound),
            RoundPhase::Resolved { .. } => return Err(ChoiceRejected::RoundResolved(self.cursor)),
            RoundPhase::Presenting | RoundPhase::AwaitingChoices => {}
        }
        if self.own.is_some() {
            return Err(ChoiceRejected::AlreadyChosen(self.cursor));
        }
        if !self.peer_connected {
            return Err(ChoiceRejected::PartnerDisconnected);
        }

        debug!(round = self.cursor, choice = choice.value(), "Own choice recorded");
        let cursor = self.cursor;
        self.own = Some(choice);
        self.recent_own.retain(|(round, _)| round + 1 >= cursor);
        self.recent_own.push((cursor, choice));
        self.phase = RoundPhase::AwaitingChoices;
        Ok(self.try_resolve())
    }

    pub fn receive_peer(
        &mut self,
        round: usize,
        choice: Choice,
    ) -> Result<RoundUpdate, PeerChoiceIgnored> {
        if self.is_over() {
            return Err(PeerChoiceIgnored::NotActive);
        }
        if round < self.cursor {
            return Err(PeerChoiceIgnored::Stale {
                round,
                cursor: self.cursor,
            });
        }
        if round > self.cursor {
            return Err(PeerChoiceIgnored::Early {
                round,
                cursor: self.cursor,
            });
        }

        match self.peer {
            Some(existing) if existing == choice => return Err(PeerChoiceIgnored::Duplicate),
            Some(_) => return Err(PeerChoiceIgnored::Conflicting),
            None => {}
        }

        debug!(round, choice = choice.value(), "Peer choice recorded");
        self.peer = Some(choice);
        self.phase = RoundPhase::AwaitingChoices;
        Ok(self.try_resolve())
    }

    /// Re-evaluated after either side's choice changes
    fn try_resolve(&mut self) -> RoundUpdate {
        let (Some(own), Some(peer)) = (self.own, self.peer) else {
            return RoundUpdate::Unchanged;
        };
        if !self.is_open() {
            return RoundUpdate::Unchanged;
        }

        let is_match = own == peer;
        if is_match {
            self.matches += 1;
        }
        self.phase = RoundPhase::Resolved { is_match };
        self.countdown.pause();

        info!(
            round = self.cursor,
            is_match,
            matches = self.matches,
            "Round resolved"
        );
        RoundUpdate::Resolved {
            round: self.cursor,
            is_match,
        }
    }

    /// Moves past a resolved round; stale requests for other rounds are ignored
    pub fn advance(&mut self, round: usize) -> RoundUpdate {
        if round != self.cursor || !matches!(self.phase, RoundPhase::Resolved { .. }) {
            debug!(round, cursor = self.cursor, phase = %self.phase, "Ignoring stale advance");
            return RoundUpdate::Unchanged;
        }

        if self.cursor + 1 >= self.total {
            info!(matches = self.matches, total = self.total, "All rounds completed");
            self.phase = RoundPhase::Ended(EndReason::Completed);
            self.countdown.pause();
            return RoundUpdate::Ended {
                reason: EndReason::Completed,
            };
        }

        self.cursor += 1;
        self.own = None;
        self.peer = None;
        self.phase = RoundPhase::Presenting;
        self.countdown.reset();
        self.sync_countdown();

        info!(round = self.cursor, total = self.total, "Advanced to next round");
        RoundUpdate::Advanced { round: self.cursor }
    }

    /// Expiry ends the whole session, never just the round
    pub fn tick(&mut self, elapsed: Duration) -> RoundUpdate {
        match self.countdown.tick(elapsed) {
            CountdownTick::Expired if self.is_open() => {
                info!(round = self.cursor, matches = self.matches, "Round countdown expired");
                self.phase = RoundPhase::Ended(EndReason::TimedOut);
                RoundUpdate::Ended {
                    reason: EndReason::TimedOut,
                }
            }
            _ => RoundUpdate::Unchanged,
        }
    }
}
