//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use tokio::sync::broadcast;
use tokio::time::{timeout, Duration};

use duet::{
    client::StageKind, ClientHandle, EndReason, PresenceState, SessionEvent, SessionSnapshot,
};

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct SnapshotAssertion {
    label: &'static str,
    snapshot: SessionSnapshot,
}

impl SnapshotAssertion {
    /// Assert against the participant's latest snapshot
    pub fn for_participant(label: &'static str, handle: &ClientHandle) -> Self {
        Self {
            label,
            snapshot: handle.snapshot(),
        }
    }

    pub fn is_in_stage(self, stage: StageKind) -> Self {
        assert_eq!(self.snapshot.stage, stage, "{} is in the wrong stage", self.label);
        self
    }

    pub fn is_at_round(self, round: usize) -> Self {
        assert_eq!(
            self.snapshot.round,
            Some(round),
            "{} is at the wrong round",
            self.label
        );
        self
    }

    pub fn has_matches(self, matches: u32) -> Self {
        assert_eq!(
            self.snapshot.matches, matches,
            "{} counted the wrong number of matches",
            self.label
        );
        self
    }

    pub fn has_presence(self, presence: PresenceState) -> Self {
        assert_eq!(
            self.snapshot.presence, presence,
            "{} sees the wrong peer presence",
            self.label
        );
        self
    }

    pub fn has_result(self, percentage: u8, points: u32, reason: EndReason) -> Self {
        let result = self
            .snapshot
            .result
            .as_ref()
            .unwrap_or_else(|| panic!("{} has no result", self.label));
        assert_eq!(result.percentage, percentage, "{} percentage", self.label);
        assert_eq!(result.points, points, "{} points", self.label);
        assert_eq!(result.reason, reason, "{} end reason", self.label);
        self
    }

    pub fn has_summary(self, text: &str) -> Self {
        assert_eq!(
            self.snapshot.summary(),
            Some(text),
            "{} shows the wrong summary",
            self.label
        );
        self
    }

    pub fn snapshot(self) -> SessionSnapshot {
        self.snapshot
    }
}

/// Waits for the first event matching `predicate`, skipping others
pub async fn expect_event(
    events: &mut broadcast::Receiver<SessionEvent>,
    predicate: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    timeout(Duration::from_secs(30), async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("expected event did not arrive")
}
