// Public API - what other modules can use
pub use distributor::{ContentDistributor, ContentMirror, MirrorOutcome};
pub use generator::{CatalogContentGenerator, ContentGenerator};
pub use models::{GeneratedPrompt, Prompt, RoundContent, Topic, OPTIONS_PER_PROMPT};

// Internal modules
mod distributor;
mod generator;
mod models;
