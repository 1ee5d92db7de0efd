use async_trait::async_trait;

use super::models::{GeneratedPrompt, Topic};
use crate::shared::GenerationError;

/// External service that produces a session's prompts for a topic
///
/// Only the host ever calls this, exactly once per topic selection. Failures
/// are reported to the host and never retried silently.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        topic: &Topic,
        count: usize,
    ) -> Result<Vec<GeneratedPrompt>, GenerationError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

const PROMPT_BANK: &[(&str, [&str; 4])] = &[
    (
        "When you think of {topic}, what comes to mind first?",
        [
            "A specific place",
            "A feeling",
            "A conversation",
            "A song",
        ],
    ),
    (
        "Which of these would make an ordinary day about {topic} special?",
        [
            "An unexpected message",
            "A shared meal",
            "A long walk",
            "Doing nothing together",
        ],
    ),
    (
        "How would the other person describe your approach to {topic}?",
        ["Careful", "Spontaneous", "Generous", "Stubborn"],
    ),
    (
        "What matters most to you in {topic}?",
        ["Honesty", "Patience", "Humor", "Attention to detail"],
    ),
    (
        "If {topic} were a season, which would it be?",
        ["Spring", "Summer", "Autumn", "Winter"],
    ),
];

/// Deterministic generator drawing from a fixed bank of prompts
///
/// Used by the demo binary and by tests; production deployments plug in a
/// model-backed implementation of [`ContentGenerator`].
#[derive(Debug, Default, Clone)]
pub struct CatalogContentGenerator;

impl CatalogContentGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentGenerator for CatalogContentGenerator {
    async fn generate(
        &self,
        topic: &Topic,
        count: usize,
    ) -> Result<Vec<GeneratedPrompt>, GenerationError> {
        let prompts = (0..count)
            .map(|index| {
                let (template, options) = PROMPT_BANK[index % PROMPT_BANK.len()];
                GeneratedPrompt {
                    text: format!(
                        "{} ({}/{})",
                        template.replace("{topic}", &topic.name.to_lowercase()),
                        index + 1,
                        count
                    ),
                    options: options.iter().map(|o| o.to_string()).collect(),
                    correct_index: Some((index % options.len()) as u8),
                }
            })
            .collect();

        Ok(prompts)
    }

    fn name(&self) -> &'static str {
        "CatalogContentGenerator"
    }
}
