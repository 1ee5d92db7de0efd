use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::effects::{Effect, Input, SessionEvent, SessionSnapshot};
use super::session::ClientSession;
use crate::content::{ContentGenerator, RoundContent, Topic};
use crate::event::{
    Envelope, RoomBus, RoomMessage, RoomMessageError, RoomMessageHandler, RoomSubscription,
};
use crate::results::SummaryGenerator;
use crate::room::RoomCode;
use crate::shared::AppError;

const EVENT_BUFFER: usize = 64;

/// Feeds envelopes from the room subscription into the driver's queue
struct InboxForwarder {
    inbox: mpsc::UnboundedSender<Input>,
}

#[async_trait]
impl RoomMessageHandler for InboxForwarder {
    async fn handle_room_message(
        &self,
        _channel: &str,
        envelope: Envelope,
    ) -> Result<(), RoomMessageError> {
        self.inbox
            .send(Input::Received(envelope))
            .map_err(|_| RoomMessageError::HandlerClosed("session driver stopped".to_string()))
    }

    fn handler_name(&self) -> &'static str {
        "InboxForwarder"
    }
}

/// Runs a [`ClientSession`] against a bus, real timers and the generators
///
/// All inputs funnel through one `select!` loop, so the session sees them
/// strictly one at a time. Effects are applied before the next input is
/// taken, which makes an `Unsubscribe` complete before anything else runs.
pub struct ClientDriver {
    session: ClientSession,
    config: SessionConfig,
    bus: Arc<dyn RoomBus>,
    content_generator: Arc<dyn ContentGenerator>,
    summary_generator: Arc<dyn SummaryGenerator>,
    commands: mpsc::UnboundedReceiver<Input>,
    inbox_tx: mpsc::UnboundedSender<Input>,
    inbox_rx: mpsc::UnboundedReceiver<Input>,
    events: broadcast::Sender<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
    subscription: Option<(String, JoinHandle<()>)>,
    background: Vec<JoinHandle<()>>,
    /// Restarted whenever the round countdown starts running
    countdown: Interval,
}

impl ClientDriver {
    /// Spawns the driver task and returns a handle to it
    pub fn spawn(
        config: SessionConfig,
        bus: Arc<dyn RoomBus>,
        content_generator: Arc<dyn ContentGenerator>,
        summary_generator: Arc<dyn SummaryGenerator>,
    ) -> ClientHandle {
        let participant = Uuid::new_v4();
        let session = ClientSession::new(participant, config.clone());

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (snapshot, snapshot_rx) = watch::channel(session.snapshot());
        let mut countdown = interval(config.countdown_tick);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handle = ClientHandle {
            participant,
            commands: commands_tx,
            events: events.clone(),
            snapshot: snapshot_rx,
        };

        let driver = Self {
            session,
            config,
            bus,
            content_generator,
            summary_generator,
            commands,
            inbox_tx,
            inbox_rx,
            events,
            snapshot,
            subscription: None,
            background: Vec::new(),
            countdown,
        };
        tokio::spawn(driver.run());

        handle
    }

    #[instrument(skip(self), fields(participant = %self.session.participant()))]
    async fn run(mut self) {
        let mut probe = interval(self.config.probe_interval);
        let mut heartbeat = interval(self.config.heartbeat_interval);
        let mut presence = interval(self.config.presence_check_interval);
        for timer in [&mut probe, &mut heartbeat, &mut presence] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }
        let tick = self.config.countdown_tick;

        info!("Session driver started");

        loop {
            let input = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(input) => input,
                    // Every handle is gone
                    None => Input::Leave,
                },
                Some(input) = self.inbox_rx.recv() => input,
                _ = probe.tick() => Input::ProbeTick,
                _ = heartbeat.tick() => Input::HeartbeatTick,
                _ = presence.tick() => Input::PresenceCheck,
                _ = self.countdown.tick() => Input::CountdownTick(tick),
            };

            let effects = self.session.handle(input, Instant::now());
            for effect in effects {
                self.apply(effect).await;
            }
            self.snapshot.send_replace(self.session.snapshot());

            if self.session.is_closed() {
                break;
            }
        }

        self.teardown().await;
        info!("Session driver stopped");
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Subscribe(room) => self.subscribe(&room).await,
            Effect::Unsubscribe => self.teardown().await,
            Effect::Publish(message) => self.publish(message).await,
            Effect::GenerateContent { room, topic, count } => {
                self.generate_content(room, topic, count)
            }
            Effect::GenerateSummary(request) => {
                let generator = self.summary_generator.clone();
                let inbox = self.inbox_tx.clone();
                self.spawn_background(async move {
                    debug!(generator = generator.name(), "Generating summary");
                    let result = generator.summarize(&request).await;
                    let _ = inbox.send(Input::SummaryGenerated { result });
                });
            }
            Effect::ScheduleAdvance { round, after } => {
                let inbox = self.inbox_tx.clone();
                self.spawn_background(async move {
                    tokio::time::sleep(after).await;
                    let _ = inbox.send(Input::AdvanceDue { round });
                });
            }
            Effect::RestartCountdown => self.countdown.reset(),
            Effect::Emit(event) => {
                debug!(event = ?event, "Session event");
                // No listeners is fine
                let _ = self.events.send(event);
            }
        }
    }

    async fn subscribe(&mut self, room: &RoomCode) {
        if self.subscription.is_some() {
            warn!(room_id = %room, "Already subscribed, ignoring");
            return;
        }

        let channel = room.channel_name();
        let handler = Arc::new(InboxForwarder {
            inbox: self.inbox_tx.clone(),
        });
        let task = RoomSubscription::new(
            channel.clone(),
            self.session.participant(),
            handler,
            self.bus.clone(),
        )
        .start()
        .await;

        self.subscription = Some((channel, task));
    }

    async fn publish(&self, message: RoomMessage) {
        let (Some((channel, _)), Some(role)) = (&self.subscription, self.session.role()) else {
            debug!(
                message_type = message.message_type(),
                "No room subscription, message lost"
            );
            return;
        };

        match Envelope::new(self.session.participant(), role, message).encode() {
            Ok(raw) => self.bus.publish(channel, raw).await,
            Err(e) => warn!(error = %e, "Failed to encode room message"),
        }
    }

    fn generate_content(&mut self, room: RoomCode, topic: Topic, count: usize) {
        let generator = self.content_generator.clone();
        let inbox = self.inbox_tx.clone();

        self.spawn_background(async move {
            info!(
                generator = generator.name(),
                topic = %topic.name,
                count,
                "Generating round content"
            );
            let result = generator
                .generate(&topic, count)
                .await
                .and_then(|prompts| {
                    RoundContent::from_generated(&room, prompts, Utc::now().timestamp_millis())
                });
            let _ = inbox.send(Input::ContentGenerated { topic, result });
        });
    }

    fn spawn_background<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.background.retain(|handle| !handle.is_finished());
        self.background.push(tokio::spawn(task));
    }

    /// Stops pending timers and work, then releases the room channel
    async fn teardown(&mut self) {
        for handle in self.background.drain(..) {
            handle.abort();
        }

        if let Some((channel, task)) = self.subscription.take() {
            task.abort();
            let _ = task.await;
            self.bus.release(&channel).await;
            info!(channel = %channel, "Room subscription released");
        }
    }
}

/// Cloneable front end to a running [`ClientDriver`]
#[derive(Clone)]
pub struct ClientHandle {
    participant: Uuid,
    commands: mpsc::UnboundedSender<Input>,
    events: broadcast::Sender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl ClientHandle {
    pub fn participant(&self) -> Uuid {
        self.participant
    }

    /// Hosts a room under a freshly generated code
    pub fn create_room(&self) -> Result<RoomCode, AppError> {
        let code = RoomCode::generate();
        self.create_room_with_code(code.clone())?;
        Ok(code)
    }

    pub fn create_room_with_code(&self, code: RoomCode) -> Result<(), AppError> {
        self.send(Input::CreateRoom(code))
    }

    /// Joins the room behind a user-typed code
    pub fn join(&self, input: &str) -> Result<RoomCode, AppError> {
        let code = RoomCode::parse(input)?;
        self.send(Input::JoinRoom(code.clone()))?;
        Ok(code)
    }

    pub fn begin_selection(&self) -> Result<(), AppError> {
        self.send(Input::BeginSelection)
    }

    pub fn select_topic(&self, topic: Topic) -> Result<(), AppError> {
        self.send(Input::SelectTopic(topic))
    }

    pub fn submit_choice(&self, value: u8) -> Result<(), AppError> {
        self.send(Input::SubmitChoice(value))
    }

    pub fn leave(&self) -> Result<(), AppError> {
        self.send(Input::Leave)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Resolves once a snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, AppError> {
        let mut receiver = self.snapshot.clone();
        let snapshot = receiver
            .wait_for(predicate)
            .await
            .map_err(|_| AppError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    fn send(&self, input: Input) -> Result<(), AppError> {
        self.commands
            .send(input)
            .map_err(|_| AppError::SessionClosed)
    }
}
