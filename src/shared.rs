use thiserror::Error;

/// Crate-level errors surfaced to the embedding application
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Invalid room code: {0}")]
    InvalidRoomCode(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Failures of the external content and summary generators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    #[error("Generator returned no prompts")]
    EmptyBatch,

    #[error("Prompt {index} is malformed: {reason}")]
    MalformedPrompt { index: usize, reason: String },

    #[error("Generator returned an empty summary")]
    EmptySummary,
}

impl GenerationError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        GenerationError::Unavailable(msg.into())
    }

    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        GenerationError::MalformedPrompt {
            index,
            reason: reason.into(),
        }
    }
}
