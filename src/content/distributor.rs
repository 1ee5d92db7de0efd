use tracing::{debug, info, warn};

use super::models::{RoundContent, Topic};
use crate::event::RoomMessage;
use crate::shared::GenerationError;

/// Host-side owner of the generated content and its redundant resend
///
/// There is no receipt acknowledgment: the host keeps attaching CONTENT_SYNC
/// to every distribution tick until the guest shows it has moved past
/// probing (a room heartbeat or a choice from it).
#[derive(Debug, Clone, Default)]
pub struct ContentDistributor {
    pending: Option<Topic>,
    distributed: Option<(Topic, RoundContent)>,
    guest_confirmed: bool,
}

impl ContentDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a generation for `topic`; false while one is already in flight
    /// or once content exists
    pub fn request(&mut self, topic: &Topic) -> bool {
        if let Some(pending) = &self.pending {
            debug!(pending = %pending.name, requested = %topic.name, "Generation already in flight");
            return false;
        }
        if self.distributed.is_some() {
            debug!(requested = %topic.name, "Content already generated");
            return false;
        }

        info!(topic = %topic.name, "Requesting round content");
        self.pending = Some(topic.clone());
        true
    }

    pub fn is_generating(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies the generator's answer; the pending request is cleared either way
    pub fn complete(
        &mut self,
        topic: &Topic,
        result: Result<RoundContent, GenerationError>,
    ) -> Option<Result<RoundContent, GenerationError>> {
        match &self.pending {
            Some(pending) if pending == topic => {}
            _ => {
                debug!(topic = %topic.name, "Ignoring generation result without matching request");
                return None;
            }
        }
        self.pending = None;

        match result {
            Ok(content) => {
                info!(topic = %topic.name, rounds = content.len(), "Round content ready");
                self.distributed = Some((topic.clone(), content.clone()));
                self.guest_confirmed = false;
                Some(Ok(content))
            }
            Err(e) => {
                warn!(topic = %topic.name, error = %e, "Round content generation failed");
                Some(Err(e))
            }
        }
    }

    pub fn content(&self) -> Option<&(Topic, RoundContent)> {
        self.distributed.as_ref()
    }

    /// Guest proved it holds the content; stop resending
    pub fn confirm_guest(&mut self) {
        if self.distributed.is_some() && !self.guest_confirmed {
            info!("Guest confirmed content, stopping redistribution");
            self.guest_confirmed = true;
        }
    }

    /// Guest is probing again, so it has not got the content
    pub fn reopen(&mut self) {
        if self.guest_confirmed {
            info!("Guest probing again, resuming redistribution");
            self.guest_confirmed = false;
        }
    }

    pub fn is_guest_confirmed(&self) -> bool {
        self.guest_confirmed
    }

    /// Message to attach to the next distribution tick, if any
    pub fn sync_message(&self) -> Option<RoomMessage> {
        if self.guest_confirmed {
            return None;
        }
        self.distributed
            .as_ref()
            .map(|(topic, content)| RoomMessage::ContentSync {
                topic: topic.clone(),
                content: content.clone(),
            })
    }
}

/// Outcome of a CONTENT_SYNC arriving at the guest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// First delivery; the guest can enter the room
    Applied,
    /// Identical resend; no-op
    Duplicate,
    /// Different batch after one was already applied; ignored
    Conflicting,
}

/// Guest-side copy of the host's content, applied once and then frozen
#[derive(Debug, Clone, Default)]
pub struct ContentMirror {
    received: Option<(Topic, RoundContent)>,
}

impl ContentMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, topic: &Topic, content: &RoundContent) -> MirrorOutcome {
        match &self.received {
            None => {
                info!(topic = %topic.name, rounds = content.len(), "Received round content");
                self.received = Some((topic.clone(), content.clone()));
                MirrorOutcome::Applied
            }
            Some((known_topic, known_content))
                if known_topic == topic && known_content == content =>
            {
                MirrorOutcome::Duplicate
            }
            Some(_) => {
                warn!(topic = %topic.name, "Ignoring conflicting round content");
                MirrorOutcome::Conflicting
            }
        }
    }

    pub fn content(&self) -> Option<&(Topic, RoundContent)> {
        self.received.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::models::Prompt;

    fn content(texts: &[&str]) -> RoundContent {
        RoundContent::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| Prompt {
                    id: format!("p{i}"),
                    text: text.to_string(),
                    options: ["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_index: None,
                })
                .collect(),
        )
        .unwrap()
    }

    fn topic() -> Topic {
        Topic::new("101", "Memory Lane", "Shared moments")
    }

    #[test]
    fn only_one_generation_in_flight() {
        let mut distributor = ContentDistributor::new();
        assert!(distributor.request(&topic()));
        assert!(!distributor.request(&topic()));
        assert!(distributor.is_generating());
    }

    #[test]
    fn failure_allows_choosing_again() {
        let mut distributor = ContentDistributor::new();
        distributor.request(&topic());

        let outcome = distributor.complete(&topic(), Err(GenerationError::EmptyBatch));
        assert_eq!(outcome, Some(Err(GenerationError::EmptyBatch)));
        assert!(distributor.sync_message().is_none());
        assert!(distributor.request(&topic()));
    }

    #[test]
    fn unrequested_result_is_ignored() {
        let mut distributor = ContentDistributor::new();
        assert_eq!(distributor.complete(&topic(), Ok(content(&["q"]))), None);
        assert!(distributor.content().is_none());
    }

    #[test]
    fn resends_until_guest_confirms() {
        let mut distributor = ContentDistributor::new();
        distributor.request(&topic());
        distributor.complete(&topic(), Ok(content(&["q1", "q2"])));

        for _ in 0..3 {
            assert!(matches!(
                distributor.sync_message(),
                Some(RoomMessage::ContentSync { .. })
            ));
        }

        distributor.confirm_guest();
        assert!(distributor.sync_message().is_none());

        distributor.reopen();
        assert!(distributor.sync_message().is_some());
    }

    #[test]
    fn confirmation_before_content_is_ignored() {
        let mut distributor = ContentDistributor::new();
        distributor.confirm_guest();
        assert!(!distributor.is_guest_confirmed());
    }

    #[test]
    fn mirror_applies_once_and_ignores_duplicates() {
        let mut mirror = ContentMirror::new();
        let batch = content(&["q1", "q2", "q3"]);

        assert_eq!(mirror.apply(&topic(), &batch), MirrorOutcome::Applied);
        for _ in 0..4 {
            assert_eq!(mirror.apply(&topic(), &batch), MirrorOutcome::Duplicate);
        }
        assert_eq!(mirror.content().unwrap().1, batch);
    }

    #[test]
    fn mirror_keeps_first_batch_on_conflict() {
        let mut mirror = ContentMirror::new();
        let first = content(&["q1"]);

        mirror.apply(&topic(), &first);
        assert_eq!(
            mirror.apply(&topic(), &content(&["other"])),
            MirrorOutcome::Conflicting
        );
        assert_eq!(mirror.content().unwrap().1, first);
    }
}
