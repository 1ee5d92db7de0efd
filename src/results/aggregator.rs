use tracing::{debug, info};

use super::models::{SessionResult, SummaryState};
use crate::event::RoomMessage;
use crate::room::Role;
use crate::round::EndReason;

/// Produces the session result once and keeps both sides' summaries identical
///
/// The host fills in the summary from its own generator and keeps offering it
/// through `sync_message`. The guest never generates: it takes the first
/// SUMMARY_SYNC text it sees and ignores every later one.
#[derive(Debug, Clone)]
pub struct ResultsAggregator {
    role: Role,
    result: Option<SessionResult>,
    /// Guest only: summary that arrived before the local session ended
    early_summary: Option<String>,
}

impl ResultsAggregator {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            result: None,
            early_summary: None,
        }
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.result.is_some()
    }

    /// Computes the result; later calls return `None` and change nothing
    pub fn finalize(
        &mut self,
        total_rounds: usize,
        matches: u32,
        reason: EndReason,
    ) -> Option<&SessionResult> {
        if self.result.is_some() {
            debug!("Results already finalized");
            return None;
        }

        let mut result = SessionResult::from_tally(total_rounds, matches, reason);
        if let Some(text) = self.early_summary.take() {
            result.summary = SummaryState::Ready(text);
        }

        info!(
            role = %self.role,
            total_rounds,
            matches,
            percentage = result.percentage,
            points = result.points,
            reason = %reason,
            "Session results finalized"
        );
        self.result = Some(result);
        self.result.as_ref()
    }

    /// Host: stores the generated (or fallback) text; true the first time
    pub fn complete_summary(&mut self, text: String) -> bool {
        if self.role != Role::Host {
            return false;
        }
        match &mut self.result {
            Some(result) if !result.summary.is_ready() => {
                info!(chars = text.len(), "Summary ready");
                result.summary = SummaryState::Ready(text);
                true
            }
            _ => false,
        }
    }

    /// Guest: freezes on the first synced text; true when the text became visible
    pub fn receive_summary(&mut self, text: &str) -> bool {
        if self.role != Role::Guest {
            return false;
        }
        match &mut self.result {
            Some(result) if !result.summary.is_ready() => {
                info!(chars = text.len(), "Summary received from host");
                result.summary = SummaryState::Ready(text.to_string());
                true
            }
            Some(_) => {
                debug!("Summary already frozen, ignoring resend");
                false
            }
            None => {
                if self.early_summary.is_none() {
                    debug!("Summary arrived before local session end, holding it");
                    self.early_summary = Some(text.to_string());
                }
                false
            }
        }
    }

    pub fn summary_text(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.summary.text())
    }

    /// Host message to republish on every heartbeat once the summary exists
    pub fn sync_message(&self) -> Option<RoomMessage> {
        if self.role != Role::Host {
            return None;
        }
        self.summary_text().map(|text| RoomMessage::SummarySync {
            text: text.to_string(),
        })
    }
}
