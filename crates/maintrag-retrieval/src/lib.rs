//! maintrag Retrieval - Filtering, analytics and answer assembly
//!
//! This crate applies extracted filters to the dataset, computes the
//! deterministic aggregates, renders them as text and orchestrates one
//! question-answering turn.

pub mod analytics;
pub mod formatter;
pub mod models;
pub mod pipeline;
pub mod retriever;

pub use analytics::{run, AnalyticsOptions};
pub use formatter::{describe_filters, format_answer, FormattedAnswer};
pub use models::{
    Answer, GenerationPhaseExplanation, ParsePhaseExplanation, QueryExplanation, QueryPlan,
    RetrievalPhaseExplanation,
};
pub use pipeline::QueryPipeline;
pub use retriever::{retrieve, retrieve_with_stats, RetrievalStats};
