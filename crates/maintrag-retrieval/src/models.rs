use maintrag_core::models::{AnalyticsResult, FilterSpec, Intent};
use maintrag_llm::Fallback;
use serde::Serialize;

use crate::retriever::RetrievalStats;

/// Resolved form of one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    /// The question as asked
    pub question: String,

    /// Intent the analytics will compute
    pub intent: Intent,

    /// Filters after context inheritance
    pub filters: FilterSpec,

    /// Whether the question continued the previous turn
    pub follow_up: bool,
}

/// Answer to one question
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Final answer text (rephrased or deterministic)
    pub text: String,

    /// Template answer computed from the data
    pub deterministic_text: String,

    /// Whether `text` comes from the language model
    pub rephrased: bool,

    pub plan: QueryPlan,

    /// Structured result behind the text
    pub result: AnalyticsResult,

    /// Remarks about unresolved or inherited filter parts
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    /// Optional detailed explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<QueryExplanation>,
}

/// Detailed query explanation
#[derive(Debug, Clone, Serialize)]
pub struct QueryExplanation {
    pub parse_phase: ParsePhaseExplanation,
    pub retrieval_phase: RetrievalPhaseExplanation,
    pub generation_phase: GenerationPhaseExplanation,
}

/// How the question was understood
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsePhaseExplanation {
    /// Classifier rule that fired
    pub rule: &'static str,

    /// No rule matched and the generic intent was used
    pub fallback: bool,

    /// Filters stated in this question, before inheritance
    pub stated_filters: FilterSpec,
}

/// How many rows the filters selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalPhaseExplanation {
    #[serde(flatten)]
    pub stats: RetrievalStats,

    /// Detail lookups read the whole dataset instead of the filtered rows
    pub full_dataset: bool,
}

/// What happened to the deterministic text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationPhaseExplanation {
    /// Rephrasing model, when one is configured
    pub model: Option<String>,

    pub rephrased: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
}
