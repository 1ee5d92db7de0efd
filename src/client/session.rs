use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::effects::{Effect, Input, SessionEvent, SessionSnapshot, StageKind};
use crate::content::{ContentDistributor, ContentMirror, MirrorOutcome, RoundContent, Topic};
use crate::event::{Envelope, RoomMessage};
use crate::results::{resolve_summary, ResultsAggregator, SummaryRequest};
use crate::room::{
    Handshake, HandshakeStage, PresenceMonitor, PresenceState, Role, RoomCode,
};
use crate::round::{Choice, ChoiceRejected, EndReason, RoundMachine, RoundUpdate};
use crate::shared::GenerationError;

enum Stage {
    Entry,
    Handshake(Handshake),
    Active,
    Results,
    Closed,
}

/// Per-room state, created when the participant picks a side
struct RoomState {
    code: RoomCode,
    role: Role,
    peer: Option<Uuid>,
    presence: PresenceMonitor,
    /// Host only
    distributor: ContentDistributor,
    /// Guest only
    mirror: ContentMirror,
    results: ResultsAggregator,
    topic: Option<Topic>,
    content: Option<RoundContent>,
    rounds: Option<RoundMachine>,
}

impl RoomState {
    fn new(code: RoomCode, role: Role, config: &SessionConfig) -> Self {
        Self {
            code,
            role,
            peer: None,
            presence: PresenceMonitor::new(config.presence_timeout),
            distributor: ContentDistributor::new(),
            mirror: ContentMirror::new(),
            results: ResultsAggregator::new(role),
            topic: None,
            content: None,
            rounds: None,
        }
    }
}

#[derive(Default)]
struct Outbox(Vec<Effect>);

impl Outbox {
    fn push(&mut self, effect: Effect) {
        self.0.push(effect);
    }

    fn publish(&mut self, message: RoomMessage) {
        self.0.push(Effect::Publish(message));
    }

    fn emit(&mut self, event: SessionEvent) {
        self.0.push(Effect::Emit(event));
    }

    fn take(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.0)
    }
}

/// One participant's view of a room, as a pure state machine
///
/// `handle` never performs I/O or reads the clock: every bus message, timer
/// tick, local command and generator answer is an [`Input`], and everything
/// the session wants done is returned as [`Effect`]s. Running all inputs
/// through this single function is what keeps timer callbacks and message
/// handling from racing each other.
pub struct ClientSession {
    participant: Uuid,
    config: SessionConfig,
    stage: Stage,
    room: Option<RoomState>,
    outbox: Outbox,
}

impl ClientSession {
    pub fn new(participant: Uuid, config: SessionConfig) -> Self {
        Self {
            participant,
            config,
            stage: Stage::Entry,
            room: None,
            outbox: Outbox::default(),
        }
    }

    pub fn participant(&self) -> Uuid {
        self.participant
    }

    pub fn role(&self) -> Option<Role> {
        self.room.as_ref().map(|room| room.role)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.stage, Stage::Closed)
    }

    pub fn stage(&self) -> StageKind {
        match &self.stage {
            Stage::Entry => StageKind::Entry,
            Stage::Handshake(handshake) => match handshake.stage() {
                HandshakeStage::Lobby => StageKind::Lobby,
                HandshakeStage::SelectContent => StageKind::SelectContent,
                HandshakeStage::JoinInput => StageKind::JoinInput,
                HandshakeStage::WaitingForHost => StageKind::WaitingForHost,
            },
            Stage::Active => StageKind::RoomActive,
            Stage::Results => StageKind::Results,
            Stage::Closed => StageKind::Closed,
        }
    }

    pub fn handle(&mut self, input: Input, now: Instant) -> Vec<Effect> {
        if self.is_closed() {
            debug!(input = ?input, "Session closed, ignoring input");
            return Vec::new();
        }
        let was_counting = self.is_countdown_running();

        match input {
            Input::CreateRoom(code) => self.create_room(code),
            Input::JoinRoom(code) => self.join_room(code),
            Input::BeginSelection => self.begin_selection(),
            Input::SelectTopic(topic) => self.select_topic(topic),
            Input::SubmitChoice(value) => self.submit_choice(value),
            Input::Leave => self.leave(),
            Input::Received(envelope) => self.receive(envelope, now),
            Input::ProbeTick => self.on_probe_tick(),
            Input::HeartbeatTick => self.on_heartbeat_tick(),
            Input::PresenceCheck => self.on_presence_check(now),
            Input::CountdownTick(elapsed) => self.on_countdown_tick(elapsed),
            Input::AdvanceDue { round } => self.on_advance_due(round),
            Input::ContentGenerated { topic, result } => {
                self.on_content_generated(topic, result, now)
            }
            Input::SummaryGenerated { result } => self.on_summary_generated(result),
        }

        if !was_counting && self.is_countdown_running() {
            self.outbox.push(Effect::RestartCountdown);
        }
        self.outbox.take()
    }

    fn is_countdown_running(&self) -> bool {
        self.room
            .as_ref()
            .and_then(|room| room.rounds.as_ref())
            .is_some_and(|rounds| rounds.is_countdown_running())
    }

    fn create_room(&mut self, code: RoomCode) {
        if !matches!(self.stage, Stage::Entry) {
            warn!(room_id = %code, "Already in a room, ignoring create");
            return;
        }

        info!(room_id = %code, participant = %self.participant, "Creating room as host");
        self.room = Some(RoomState::new(code.clone(), Role::Host, &self.config));
        self.stage = Stage::Handshake(Handshake::host());
        self.outbox.push(Effect::Subscribe(code));
        self.outbox.emit(SessionEvent::StageChanged(StageKind::Lobby));
    }

    fn join_room(&mut self, code: RoomCode) {
        if !matches!(self.stage, Stage::Entry) {
            warn!(room_id = %code, "Already in a room, ignoring join");
            return;
        }

        info!(room_id = %code, participant = %self.participant, "Joining room as guest");
        self.room = Some(RoomState::new(code.clone(), Role::Guest, &self.config));
        self.stage = Stage::Handshake(Handshake::guest());
        self.outbox.push(Effect::Subscribe(code));
        self.outbox.publish(RoomMessage::PresenceProbe);
        self.outbox.emit(SessionEvent::StageChanged(StageKind::JoinInput));
    }

    fn begin_selection(&mut self) {
        if let Stage::Handshake(handshake) = &mut self.stage {
            if handshake.begin_selection() {
                info!("Host opened topic selection");
                self.outbox
                    .emit(SessionEvent::StageChanged(StageKind::SelectContent));
                return;
            }
        }
        debug!("Topic selection not available in this stage");
    }

    fn select_topic(&mut self, topic: Topic) {
        let selecting = matches!(&self.stage, Stage::Handshake(h) if h.is_selecting_content());
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if !selecting || room.role != Role::Host {
            debug!(topic = %topic.name, "Not selecting content, ignoring topic");
            return;
        }

        if room.distributor.request(&topic) {
            self.outbox.push(Effect::GenerateContent {
                room: room.code.clone(),
                topic,
                count: self.config.batch_size,
            });
        }
    }

    fn submit_choice(&mut self, value: u8) {
        let choice = match Choice::new(value) {
            Ok(choice) => choice,
            Err(reason) => return self.reject(reason),
        };
        let Some(rounds) = self.room.as_mut().and_then(|room| room.rounds.as_mut()) else {
            return self.reject(ChoiceRejected::NoActiveRound);
        };

        let round = rounds.cursor();
        match rounds.submit_own(choice) {
            Ok(update) => {
                self.outbox.publish(RoomMessage::Choice { round, choice });
                self.apply_round_update(update);
            }
            Err(reason) => self.reject(reason),
        }
    }

    fn reject(&mut self, reason: ChoiceRejected) {
        debug!(reason = %reason, "Choice rejected");
        self.outbox.emit(SessionEvent::ChoiceRejected(reason));
    }

    fn leave(&mut self) {
        info!(stage = %self.stage(), "Leaving session");
        if self.room.is_some() {
            self.outbox.push(Effect::Unsubscribe);
        }
        self.stage = Stage::Closed;
        self.outbox.emit(SessionEvent::StageChanged(StageKind::Closed));
    }

    fn receive(&mut self, envelope: Envelope, now: Instant) {
        let in_room = matches!(self.stage, Stage::Active | Stage::Results);
        if !in_room && !matches!(self.stage, Stage::Handshake(_)) {
            return;
        }
        let Some(room) = self.room.as_mut() else {
            return;
        };

        if envelope.role != room.role.peer() {
            debug!(
                sender = %envelope.sender,
                sender_role = %envelope.role,
                "Ignoring message from participant with the same role"
            );
            return;
        }
        match room.peer {
            None => {
                info!(room_id = %room.code, peer = %envelope.sender, "Paired with peer");
                room.peer = Some(envelope.sender);
            }
            Some(peer) if peer != envelope.sender => {
                debug!(sender = %envelope.sender, "Ignoring message from unpaired participant");
                return;
            }
            Some(_) => {}
        }

        if counts_as_presence(in_room, room.role, &envelope.message) {
            self.record_presence(now);
        }

        match envelope.message {
            RoomMessage::PresenceProbe => self.on_presence_probe(),
            RoomMessage::PresenceAck => self.on_presence_ack(),
            RoomMessage::ContentSync { topic, content } => self.on_content_sync(topic, content, now),
            RoomMessage::RoomHeartbeat => self.confirm_guest(),
            RoomMessage::Choice { round, choice } => {
                self.confirm_guest();
                self.on_peer_choice(round, choice);
            }
            RoomMessage::SummarySync { text } => self.on_summary_sync(text),
        }
    }

    fn record_presence(&mut self, now: Instant) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if let Some(state) = room.presence.record_heartbeat(now) {
            if let Some(rounds) = room.rounds.as_mut() {
                rounds.set_peer_connected(true);
            }
            info!(room_id = %room.code, presence = %state, "Peer presence changed");
            self.outbox.emit(SessionEvent::PresenceChanged(state));
        }
    }

    fn on_presence_probe(&mut self) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if room.role != Role::Host {
            return;
        }

        match &mut self.stage {
            Stage::Handshake(handshake) => {
                let outcome = handshake.on_probe();
                if outcome.acknowledge {
                    self.outbox.publish(RoomMessage::PresenceAck);
                }
                if outcome.advanced {
                    info!(room_id = %room.code, "Guest found, opening topic selection");
                    self.outbox
                        .emit(SessionEvent::StageChanged(StageKind::SelectContent));
                }
            }
            Stage::Active | Stage::Results => {
                room.distributor.reopen();
                self.outbox.publish(RoomMessage::PresenceAck);
            }
            Stage::Entry | Stage::Closed => {}
        }
    }

    fn on_presence_ack(&mut self) {
        if let Stage::Handshake(handshake) = &mut self.stage {
            if handshake.on_ack() {
                info!("Host acknowledged, waiting for content");
                self.outbox
                    .emit(SessionEvent::StageChanged(StageKind::WaitingForHost));
            }
        }
    }

    fn on_content_sync(&mut self, topic: Topic, content: RoundContent, now: Instant) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if room.role != Role::Guest {
            return;
        }

        let outcome = room.mirror.apply(&topic, &content);
        if outcome == MirrorOutcome::Applied && matches!(self.stage, Stage::Handshake(_)) {
            self.enter_room(topic, content, now);
        }
    }

    fn confirm_guest(&mut self) {
        if let Some(room) = self.room.as_mut() {
            if room.role == Role::Host {
                room.distributor.confirm_guest();
            }
        }
    }

    fn on_peer_choice(&mut self, round: usize, choice: Choice) {
        if !matches!(self.stage, Stage::Active | Stage::Results) {
            debug!(round, "Discarding choice received before content");
            return;
        }
        let Some(rounds) = self.room.as_mut().and_then(|room| room.rounds.as_mut()) else {
            return;
        };

        match rounds.receive_peer(round, choice) {
            Ok(update) => self.apply_round_update(update),
            Err(reason) => debug!(round, reason = %reason, "Ignoring peer choice"),
        }
    }

    fn on_summary_sync(&mut self, text: String) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if room.role == Role::Guest && room.results.receive_summary(&text) {
            self.outbox.emit(SessionEvent::SummaryReady(text));
        }
    }

    /// Host content is ready or guest content arrived; rounds begin
    fn enter_room(&mut self, topic: Topic, content: RoundContent, now: Instant) {
        let round_duration = self.config.round_duration;
        let Some(room) = self.room.as_mut() else {
            return;
        };

        // The host only counts in-room traffic from here on
        if room.role == Role::Host {
            if let Some(state) = room.presence.reset() {
                self.outbox.emit(SessionEvent::PresenceChanged(state));
            }
        } else if let Some(state) = room.presence.record_heartbeat(now) {
            self.outbox.emit(SessionEvent::PresenceChanged(state));
        }

        let total = content.len();
        let mut rounds = RoundMachine::new(total, round_duration);
        rounds.set_peer_connected(room.presence.is_connected());

        let first_prompt = content.get(0).cloned();
        info!(
            room_id = %room.code,
            role = %room.role,
            topic = %topic.name,
            rounds = total,
            "Room active"
        );

        room.topic = Some(topic);
        room.content = Some(content);
        room.rounds = Some(rounds);
        self.stage = Stage::Active;

        self.outbox
            .emit(SessionEvent::StageChanged(StageKind::RoomActive));
        if let Some(prompt) = first_prompt {
            self.outbox.emit(SessionEvent::RoundStarted {
                round: 0,
                total,
                prompt,
            });
        }
    }

    fn on_probe_tick(&mut self) {
        let Some(room) = self.room.as_ref() else {
            return;
        };

        match (room.role, &self.stage) {
            (Role::Guest, Stage::Handshake(handshake)) if handshake.is_probing() => {
                self.outbox.publish(RoomMessage::PresenceProbe);
            }
            (Role::Host, Stage::Handshake(_) | Stage::Active | Stage::Results) => {
                if let Some(message) = room.distributor.sync_message() {
                    self.outbox.publish(message);
                }
            }
            _ => {}
        }
    }

    fn on_heartbeat_tick(&mut self) {
        if !matches!(self.stage, Stage::Active | Stage::Results) {
            return;
        }
        let Some(room) = self.room.as_ref() else {
            return;
        };

        self.outbox.publish(RoomMessage::RoomHeartbeat);
        if let Some(rounds) = room.rounds.as_ref() {
            for &(round, choice) in rounds.recent_own_choices() {
                self.outbox.publish(RoomMessage::Choice { round, choice });
            }
        }
        if let Some(message) = room.results.sync_message() {
            self.outbox.publish(message);
        }
    }

    fn on_presence_check(&mut self, now: Instant) {
        if matches!(self.stage, Stage::Entry | Stage::Closed) {
            return;
        }
        let Some(room) = self.room.as_mut() else {
            return;
        };

        if let Some(state) = room.presence.check(now) {
            if let Some(rounds) = room.rounds.as_mut() {
                rounds.set_peer_connected(false);
            }
            info!(room_id = %room.code, presence = %state, "Peer presence changed");
            self.outbox.emit(SessionEvent::PresenceChanged(state));
        }
    }

    fn on_countdown_tick(&mut self, elapsed: Duration) {
        if !matches!(self.stage, Stage::Active) {
            return;
        }
        if let Some(rounds) = self.room.as_mut().and_then(|room| room.rounds.as_mut()) {
            let update = rounds.tick(elapsed);
            self.apply_round_update(update);
        }
    }

    fn on_advance_due(&mut self, round: usize) {
        if !matches!(self.stage, Stage::Active) {
            return;
        }
        if let Some(rounds) = self.room.as_mut().and_then(|room| room.rounds.as_mut()) {
            let update = rounds.advance(round);
            self.apply_round_update(update);
        }
    }

    fn on_content_generated(
        &mut self,
        topic: Topic,
        result: Result<RoundContent, GenerationError>,
        now: Instant,
    ) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        let Some(outcome) = room.distributor.complete(&topic, result) else {
            return;
        };

        match outcome {
            Ok(content) => {
                if let Some(message) = room.distributor.sync_message() {
                    self.outbox.publish(message);
                }
                if matches!(self.stage, Stage::Handshake(_)) {
                    self.enter_room(topic, content, now);
                }
            }
            Err(error) => {
                self.outbox
                    .emit(SessionEvent::ContentFailed { topic, error });
            }
        }
    }

    fn on_summary_generated(&mut self, result: Result<String, GenerationError>) {
        let Some(room) = self.room.as_mut() else {
            return;
        };

        let text = resolve_summary(result);
        if room.results.complete_summary(text.clone()) {
            self.outbox.emit(SessionEvent::SummaryReady(text.clone()));
            self.outbox.publish(RoomMessage::SummarySync { text });
        }
    }

    fn apply_round_update(&mut self, update: RoundUpdate) {
        match update {
            RoundUpdate::Unchanged => {}
            RoundUpdate::Resolved { round, is_match } => {
                let matches = self
                    .room
                    .as_ref()
                    .and_then(|room| room.rounds.as_ref())
                    .map(|rounds| rounds.matches())
                    .unwrap_or_default();
                self.outbox.emit(SessionEvent::RoundResolved {
                    round,
                    is_match,
                    matches,
                });
                self.outbox.push(Effect::ScheduleAdvance {
                    round,
                    after: self.config.resolve_delay,
                });
            }
            RoundUpdate::Advanced { round } => self.announce_round(round),
            RoundUpdate::Ended { reason } => self.finish(reason),
        }
    }

    fn announce_round(&mut self, round: usize) {
        let Some(content) = self.room.as_ref().and_then(|room| room.content.as_ref()) else {
            return;
        };
        if let Some(prompt) = content.get(round).cloned() {
            self.outbox.emit(SessionEvent::RoundStarted {
                round,
                total: content.len(),
                prompt,
            });
        }
    }

    fn finish(&mut self, reason: EndReason) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        let Some((total_rounds, matches)) = room
            .rounds
            .as_ref()
            .map(|rounds| (rounds.total(), rounds.matches()))
        else {
            return;
        };
        let Some(result) = room.results.finalize(total_rounds, matches, reason).cloned() else {
            return;
        };

        self.stage = Stage::Results;
        self.outbox.emit(SessionEvent::StageChanged(StageKind::Results));
        self.outbox.emit(SessionEvent::SessionEnded(result.clone()));

        match (room.role, room.topic.clone()) {
            (Role::Host, Some(topic)) => {
                self.outbox.push(Effect::GenerateSummary(SummaryRequest {
                    topic,
                    total_rounds,
                    matches,
                }));
            }
            (Role::Guest, _) => {
                if let Some(text) = result.summary.text() {
                    self.outbox.emit(SessionEvent::SummaryReady(text.to_string()));
                }
            }
            (Role::Host, None) => {}
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let room = self.room.as_ref();
        let rounds = room.and_then(|room| room.rounds.as_ref());

        SessionSnapshot {
            participant: self.participant,
            stage: self.stage(),
            role: room.map(|room| room.role),
            room: room.map(|room| room.code.clone()),
            peer: room.and_then(|room| room.peer),
            presence: room
                .map(|room| room.presence.state())
                .unwrap_or(PresenceState::Disconnected),
            topic: room.and_then(|room| room.topic.clone()),
            content: room.and_then(|room| room.content.clone()),
            generating: room
                .map(|room| room.distributor.is_generating())
                .unwrap_or(false),
            round: rounds.map(|rounds| rounds.cursor()),
            phase: rounds.map(|rounds| rounds.phase()),
            total_rounds: rounds.map(|rounds| rounds.total()).unwrap_or_default(),
            matches: rounds.map(|rounds| rounds.matches()).unwrap_or_default(),
            own_choice: rounds.and_then(|rounds| rounds.own_choice()),
            peer_choice: rounds.and_then(|rounds| rounds.peer_choice()),
            remaining: rounds
                .filter(|rounds| !rounds.is_over())
                .map(|rounds| rounds.remaining()),
            result: room.and_then(|room| room.results.result().cloned()),
        }
    }
}

/// Inside the room only in-room traffic proves the peer is there
fn counts_as_presence(in_room: bool, own_role: Role, message: &RoomMessage) -> bool {
    if !in_room {
        return true;
    }
    match message {
        RoomMessage::RoomHeartbeat | RoomMessage::Choice { .. } | RoomMessage::SummarySync { .. } => {
            true
        }
        RoomMessage::ContentSync { .. } => own_role == Role::Guest,
        RoomMessage::PresenceProbe | RoomMessage::PresenceAck => false,
    }
}
