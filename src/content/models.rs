use serde::{Deserialize, Serialize};

use crate::room::RoomCode;
use crate::round::Choice;
use crate::shared::GenerationError;

/// Every prompt offers exactly this many options
pub const OPTIONS_PER_PROMPT: usize = 4;

/// A theme the host picks before content is generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Topic {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// Built-in topics offered for online rooms
    pub fn catalogue() -> Vec<Topic> {
        vec![
            Topic::new(
                "101",
                "Memory Lane",
                "Moments you lived together and the details that stayed with you",
            ),
            Topic::new(
                "102",
                "Future Plans",
                "Where you see yourselves going and how you would get there",
            ),
            Topic::new(
                "103",
                "Small Affections",
                "The everyday gestures that say more than words",
            ),
            Topic::new(
                "104",
                "Trust & Boundaries",
                "How you handle doubt, space and difficult conversations",
            ),
        ]
    }
}

/// Raw prompt as an external generator returns it, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPrompt {
    pub text: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_index: Option<u8>,
}

/// One round's question with its four options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub text: String,
    pub options: [String; OPTIONS_PER_PROMPT],
    /// Only meaningful to single-player variants; agreement scoring ignores it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<u8>,
}

impl Prompt {
    pub fn option(&self, choice: Choice) -> &str {
        &self.options[choice.option_index()]
    }

    fn validate(&self, index: usize) -> Result<(), GenerationError> {
        if self.id.trim().is_empty() {
            return Err(GenerationError::malformed(index, "missing id"));
        }
        if self.text.trim().is_empty() {
            return Err(GenerationError::malformed(index, "empty text"));
        }
        if let Some(position) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(GenerationError::malformed(
                index,
                format!("option {} is empty", position + 1),
            ));
        }
        if let Some(correct) = self.correct_index {
            if correct as usize >= OPTIONS_PER_PROMPT {
                return Err(GenerationError::malformed(
                    index,
                    format!("correct index {} out of range", correct),
                ));
            }
        }
        Ok(())
    }
}

/// The ordered, immutable batch of prompts for a whole session
///
/// Deserialization re-validates, so a malformed CONTENT_SYNC never reaches
/// the round machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Prompt>", into = "Vec<Prompt>")]
pub struct RoundContent {
    prompts: Vec<Prompt>,
}

impl RoundContent {
    pub fn new(prompts: Vec<Prompt>) -> Result<Self, GenerationError> {
        if prompts.is_empty() {
            return Err(GenerationError::EmptyBatch);
        }
        for (index, prompt) in prompts.iter().enumerate() {
            prompt.validate(index)?;
        }
        Ok(Self { prompts })
    }

    /// Assigns ids to a generator batch and checks its shape
    pub fn from_generated(
        room: &RoomCode,
        generated: Vec<GeneratedPrompt>,
        stamp_millis: i64,
    ) -> Result<Self, GenerationError> {
        let prompts = generated
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let options: [String; OPTIONS_PER_PROMPT] =
                    raw.options.try_into().map_err(|options: Vec<String>| {
                        GenerationError::malformed(
                            index,
                            format!(
                                "expected {} options, got {}",
                                OPTIONS_PER_PROMPT,
                                options.len()
                            ),
                        )
                    })?;

                Ok(Prompt {
                    id: format!("online-{}-{}-{}", room, index, stamp_millis),
                    text: raw.text,
                    options,
                    correct_index: raw.correct_index,
                })
            })
            .collect::<Result<Vec<_>, GenerationError>>()?;

        Self::new(prompts)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Prompt> {
        self.prompts.get(index)
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }
}

impl TryFrom<Vec<Prompt>> for RoundContent {
    type Error = GenerationError;

    fn try_from(prompts: Vec<Prompt>) -> Result<Self, Self::Error> {
        Self::new(prompts)
    }
}

impl From<RoundContent> for Vec<Prompt> {
    fn from(content: RoundContent) -> Self {
        content.prompts
    }
}
