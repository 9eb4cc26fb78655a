use std::sync::Arc;

use maintrag_core::models::ConversationContext;
use maintrag_retrieval::{Answer, QueryPipeline};

use crate::error::ApiError;

/// Service for answering questions
pub struct QueryService;

impl QueryService {
    /// Answer one question against a conversation context
    ///
    /// The pipeline is synchronous and may block on the rephraser, so it runs
    /// on the blocking pool.
    pub async fn answer(
        pipeline: Arc<QueryPipeline>,
        question: &str,
        context: ConversationContext,
    ) -> Result<(Answer, ConversationContext), ApiError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ApiError::bad_request("Question must not be empty"));
        }

        let question = question.to_string();
        let (answer, next) =
            tokio::task::spawn_blocking(move || pipeline.ask(&question, &context)).await?;

        tracing::info!(
            intent = %answer.plan.intent,
            follow_up = answer.plan.follow_up,
            rephrased = answer.rephrased,
            "Answered question"
        );

        Ok((answer, next))
    }
}
