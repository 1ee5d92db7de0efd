use tokio::time::Duration;
use uuid::Uuid;

use crate::content::{Prompt, RoundContent, Topic};
use crate::event::{Envelope, RoomMessage};
use crate::results::{SessionResult, SummaryRequest};
use crate::room::{PresenceState, Role, RoomCode};
use crate::round::{Choice, ChoiceRejected, RoundPhase};
use crate::shared::GenerationError;

/// Everything that can drive a session forward
///
/// Local commands, received bus messages, timer ticks and completed
/// background work all arrive as one of these, in one queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    CreateRoom(RoomCode),
    JoinRoom(RoomCode),
    BeginSelection,
    SelectTopic(Topic),
    SubmitChoice(u8),
    Leave,
    Received(Envelope),
    /// Guest probe / host content redistribution timer
    ProbeTick,
    HeartbeatTick,
    PresenceCheck,
    CountdownTick(Duration),
    AdvanceDue {
        round: usize,
    },
    ContentGenerated {
        topic: Topic,
        result: Result<RoundContent, GenerationError>,
    },
    SummaryGenerated {
        result: Result<String, GenerationError>,
    },
}

/// Work the session asks its driver to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Subscribe(RoomCode),
    /// Release the room subscription; must complete before the next input
    Unsubscribe,
    Publish(RoomMessage),
    GenerateContent {
        room: RoomCode,
        topic: Topic,
        count: usize,
    },
    GenerateSummary(SummaryRequest),
    ScheduleAdvance {
        round: usize,
        after: Duration,
    },
    /// Countdown went from idle to running; its next tick is a full period away
    RestartCountdown,
    Emit(SessionEvent),
}

/// Notifications for whatever presents the session to a user
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StageChanged(StageKind),
    PresenceChanged(PresenceState),
    ContentFailed {
        topic: Topic,
        error: GenerationError,
    },
    RoundStarted {
        round: usize,
        total: usize,
        prompt: Prompt,
    },
    ChoiceRejected(ChoiceRejected),
    RoundResolved {
        round: usize,
        is_match: bool,
        matches: u32,
    },
    SessionEnded(SessionResult),
    SummaryReady(String),
}

/// Screen-level stage of a session
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StageKind {
    Entry,
    Lobby,
    SelectContent,
    JoinInput,
    WaitingForHost,
    RoomActive,
    Results,
    Closed,
}

/// Read-only view of a session after the last processed input
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub participant: Uuid,
    pub stage: StageKind,
    pub role: Option<Role>,
    pub room: Option<RoomCode>,
    pub peer: Option<Uuid>,
    pub presence: PresenceState,
    pub topic: Option<Topic>,
    pub content: Option<RoundContent>,
    pub generating: bool,
    pub round: Option<usize>,
    pub phase: Option<RoundPhase>,
    pub total_rounds: usize,
    pub matches: u32,
    pub own_choice: Option<Choice>,
    pub peer_choice: Option<Choice>,
    pub remaining: Option<Duration>,
    pub result: Option<SessionResult>,
}

impl SessionSnapshot {
    pub fn summary(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.summary.text())
    }

    pub fn is_connected(&self) -> bool {
        self.presence == PresenceState::Connected
    }
}
