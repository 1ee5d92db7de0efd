use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::models::match_percentage;
use crate::content::Topic;
use crate::shared::GenerationError;

/// Text shown when the summary generator fails or returns nothing
pub const FALLBACK_SUMMARY: &str =
    "You two just shared something real. Every answer, matched or not, says a little more about how you see each other.";

/// Input to the one summary generation the host performs per session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub topic: Topic,
    pub total_rounds: usize,
    pub matches: u32,
}

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, GenerationError>;

    fn name(&self) -> &'static str;
}

/// Maps a generator answer to the text that gets synced
pub fn resolve_summary(result: Result<String, GenerationError>) -> String {
    match result {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!(error = %GenerationError::EmptySummary, "Using fallback summary");
            FALLBACK_SUMMARY.to_string()
        }
        Err(e) => {
            warn!(error = %e, "Using fallback summary");
            FALLBACK_SUMMARY.to_string()
        }
    }
}

/// Deterministic prose picked by agreement level
#[derive(Debug, Default, Clone)]
pub struct TemplateSummaryGenerator;

impl TemplateSummaryGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SummaryGenerator for TemplateSummaryGenerator {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, GenerationError> {
        let percentage = match_percentage(request.matches, request.total_rounds);
        let topic = request.topic.name.to_lowercase();

        let verdict = match percentage {
            80..=100 => format!("You are remarkably in tune when it comes to {topic}."),
            50..=79 => format!("You share a lot of common ground on {topic}, with a few surprises."),
            20..=49 => format!("You see {topic} differently, which gives you plenty to talk about."),
            _ => format!("{} is where you are still discovering each other.", request.topic.name),
        };

        Ok(format!(
            "{} You agreed on {} of {} rounds ({}%).",
            verdict, request.matches, request.total_rounds, percentage
        ))
    }

    fn name(&self) -> &'static str {
        "TemplateSummaryGenerator"
    }
}
