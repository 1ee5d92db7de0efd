// Public API - what other modules can use
pub use aggregator::ResultsAggregator;
pub use models::{match_percentage, SessionResult, SummaryState, POINTS_PER_MATCH};
pub use summary::{
    resolve_summary, SummaryGenerator, SummaryRequest, TemplateSummaryGenerator, FALLBACK_SUMMARY,
};

// Internal modules
mod aggregator;
mod models;
mod summary;
