use duet::{client::StageKind, SessionSnapshot};
use futures::future::join;

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Host opens the room under the setup's code
    pub fn host_creates_room(&self) {
        self.host.create_room_with_code(self.code.clone()).unwrap();
    }

    /// Guest types the setup's code
    pub fn guest_joins(&self) {
        self.guest.join(self.code.as_str()).unwrap();
    }

    pub async fn wait_host(&self, predicate: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        self.host.wait_for(predicate).await.unwrap()
    }

    pub async fn wait_guest(&self, predicate: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        self.guest.wait_for(predicate).await.unwrap()
    }

    pub async fn wait_both_in_stage(&self, stage: StageKind) -> (SessionSnapshot, SessionSnapshot) {
        join(
            self.wait_host(|s| s.stage == stage),
            self.wait_guest(|s| s.stage == stage),
        )
        .await
    }

    /// Handshake, topic selection and content sync, until both see each other in the room
    pub async fn start_session(&self) {
        self.host_creates_room();
        self.guest_joins();

        self.wait_host(|s| s.stage == StageKind::SelectContent).await;
        self.host.select_topic(self.topic.clone()).unwrap();

        self.wait_host(|s| s.stage == StageKind::RoomActive && s.is_connected())
            .await;
        self.wait_guest(|s| s.stage == StageKind::RoomActive && s.is_connected())
            .await;
    }

    /// Both submit for `round`, then wait until each side has moved past it
    pub async fn play_round(&self, round: usize, host_choice: u8, guest_choice: u8) {
        self.wait_host(|s| s.round == Some(round)).await;
        self.wait_guest(|s| s.round == Some(round)).await;

        self.guest.submit_choice(guest_choice).unwrap();
        self.host.submit_choice(host_choice).unwrap();

        let moved_on = |s: &SessionSnapshot| {
            s.stage == StageKind::Results || s.round.is_some_and(|r| r > round)
        };
        join(self.wait_host(moved_on), self.wait_guest(moved_on)).await;
    }

    /// Both sides leave and their drivers stop
    pub async fn both_leave(&self) {
        self.host.leave().unwrap();
        self.guest.leave().unwrap();
        self.wait_both_in_stage(StageKind::Closed).await;
    }
}
