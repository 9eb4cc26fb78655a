//! LLM port definitions

use maintrag_core::error::Result;

/// Port for rephrasing a deterministic answer into natural language
///
/// Implementations have no reasoning authority: they receive the finished
/// answer and may only reword it.
pub trait Rephraser: Send + Sync {
    /// Rephrase an answer to a question
    ///
    /// # Arguments
    /// * `question` - The user's question
    /// * `answer` - The deterministic answer, treated as the source of truth
    ///
    /// # Returns
    /// Reworded answer text
    fn rephrase(&self, question: &str, answer: &str) -> Result<String>;

    /// Get the name/identifier of the model
    fn model_name(&self) -> &str;
}
