use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Reachability of the remote participant, as computed locally
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceState {
    Connected,
    Disconnected,
}

/// Tracks the last heartbeat received from the peer
///
/// Receipt and expiry are decoupled: `record_heartbeat` can only ever move the
/// state to `Connected`, and only `check` (run on its own interval) can move
/// it to `Disconnected`, so silence alone drives a disconnect.
#[derive(Debug, Clone)]
pub struct PresenceMonitor {
    timeout: Duration,
    last_seen: Option<Instant>,
    state: PresenceState,
}

impl PresenceMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_seen: None,
            state: PresenceState::Disconnected,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == PresenceState::Connected
    }

    pub fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Records a heartbeat-class message; returns the new state on a transition
    pub fn record_heartbeat(&mut self, now: Instant) -> Option<PresenceState> {
        self.last_seen = Some(match self.last_seen {
            Some(previous) if previous > now => previous,
            _ => now,
        });

        if self.state == PresenceState::Disconnected {
            debug!("Peer heartbeat received, marking connected");
            self.state = PresenceState::Connected;
            return Some(PresenceState::Connected);
        }
        None
    }

    /// Periodic liveness check; returns the new state on a transition
    pub fn check(&mut self, now: Instant) -> Option<PresenceState> {
        if self.state == PresenceState::Disconnected {
            return None;
        }

        let silent_for = self
            .last_seen
            .map(|seen| now.saturating_duration_since(seen))
            .unwrap_or(Duration::MAX);

        if silent_for > self.timeout {
            debug!(
                silent_ms = silent_for.as_millis() as u64,
                timeout_ms = self.timeout.as_millis() as u64,
                "Peer heartbeat expired, marking disconnected"
            );
            self.state = PresenceState::Disconnected;
            return Some(PresenceState::Disconnected);
        }
        None
    }

    /// Forgets the peer entirely, e.g. when entering a new phase of the room
    pub fn reset(&mut self) -> Option<PresenceState> {
        self.last_seen = None;
        if self.state == PresenceState::Connected {
            self.state = PresenceState::Disconnected;
            return Some(PresenceState::Disconnected);
        }
        None
    }
}
