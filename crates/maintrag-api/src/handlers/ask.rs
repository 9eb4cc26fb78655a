use axum::{extract::State, Json};
use maintrag_core::models::ConversationContext;

use crate::dto::{AskRequest, AskResponse};
use crate::error::ApiError;
use crate::services::QueryService;
use crate::state::AppState;

/// Answer a question with no conversation history
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    tracing::info!(question = %request.question, "Processing stateless question");

    let (answer, _) = QueryService::answer(
        state.pipeline.clone(),
        &request.question,
        ConversationContext::new(),
    )
    .await?;

    Ok(Json(AskResponse {
        session_id: None,
        turn: None,
        answer,
    }))
}
