use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use duet::{
    content::{ContentGenerator, GeneratedPrompt, Topic},
    event::{Envelope, InMemoryRoomBus, RoomBus},
    results::{SummaryGenerator, SummaryRequest},
    GenerationError, Role,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Room bus that records traffic and can lose messages on demand
#[derive(Clone, Default)]
pub struct MockRoomBus {
    inner: InMemoryRoomBus,
    published: Arc<Mutex<Vec<(Role, &'static str)>>>,
    drop_rules: Arc<Mutex<HashMap<(Role, &'static str), usize>>>,
    blocked: Arc<Mutex<HashSet<Role>>>,
    dropped: Arc<AtomicUsize>,
}

impl MockRoomBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loses the next `count` messages of `message_type` sent by `role`
    pub async fn drop_next(&self, role: Role, message_type: &'static str, count: usize) {
        self.drop_rules
            .lock()
            .await
            .insert((role, message_type), count);
    }

    /// Loses everything `role` sends until unblocked
    pub async fn block(&self, role: Role) {
        self.blocked.lock().await.insert(role);
    }

    pub async fn unblock(&self, role: Role) {
        self.blocked.lock().await.remove(&role);
    }

    pub async fn published_count(&self, role: Role, message_type: &str) -> usize {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(r, t)| *r == role && *t == message_type)
            .count()
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn channel_count(&self) -> usize {
        self.inner.channel_count().await
    }

    async fn should_drop(&self, role: Role, message_type: &'static str) -> bool {
        if self.blocked.lock().await.contains(&role) {
            return true;
        }
        let mut rules = self.drop_rules.lock().await;
        match rules.get_mut(&(role, message_type)) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl RoomBus for MockRoomBus {
    async fn publish(&self, channel: &str, payload: String) {
        if let Ok(envelope) = Envelope::decode(&payload) {
            let message_type = envelope.message.message_type();
            self.published
                .lock()
                .await
                .push((envelope.role, message_type));

            if self.should_drop(envelope.role, message_type).await {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        self.inner.publish(channel, payload).await;
    }

    async fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        self.inner.subscribe(channel).await
    }

    async fn release(&self, channel: &str) {
        self.inner.release(channel).await;
    }
}

/// Content generator that is always down
pub struct FailingContentGenerator;

#[async_trait]
impl ContentGenerator for FailingContentGenerator {
    async fn generate(
        &self,
        _topic: &Topic,
        _count: usize,
    ) -> Result<Vec<GeneratedPrompt>, GenerationError> {
        Err(GenerationError::unavailable("content service offline"))
    }

    fn name(&self) -> &'static str {
        "FailingContentGenerator"
    }
}

/// Content generator that returns prompts with the wrong number of options
pub struct MalformedContentGenerator;

#[async_trait]
impl ContentGenerator for MalformedContentGenerator {
    async fn generate(
        &self,
        _topic: &Topic,
        count: usize,
    ) -> Result<Vec<GeneratedPrompt>, GenerationError> {
        Ok((0..count)
            .map(|i| GeneratedPrompt {
                text: format!("Question {i}"),
                options: vec!["yes".into(), "no".into()],
                correct_index: None,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "MalformedContentGenerator"
    }
}

/// Summary generator that is always down, counting how often it was asked
#[derive(Default)]
pub struct FailingSummaryGenerator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SummaryGenerator for FailingSummaryGenerator {
    async fn summarize(&self, _request: &SummaryRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(GenerationError::unavailable("summary service offline"))
    }

    fn name(&self) -> &'static str {
        "FailingSummaryGenerator"
    }
}
