use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::dto::{AskRequest, AskResponse, DeleteResponse, SessionResponse};
use crate::error::ApiError;
use crate::services::QueryService;
use crate::state::AppState;

pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let (session_id, created_at) = state.sessions.create().await;
    tracing::info!(%session_id, "Created session");

    (StatusCode::CREATED, Json(SessionResponse { session_id, created_at }))
}

pub async fn ask_in_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let handle = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    // Held for the whole turn so concurrent questions in one session serialize
    let mut session = handle.lock().await;
    tracing::info!(%session_id, turn = session.context.turns + 1, question = %request.question, "Processing question");

    let (answer, next) =
        QueryService::answer(state.pipeline.clone(), &request.question, session.context.clone())
            .await?;

    session.context = next;

    Ok(Json(AskResponse {
        session_id: Some(session_id),
        turn: Some(session.context.turns),
        answer,
    }))
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let handle = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    let mut session = handle.lock().await;
    session.context.reset();
    tracing::info!(%session_id, "Reset session context");

    Ok(Json(SessionResponse {
        session_id,
        created_at: session.created_at,
    }))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.sessions.remove(session_id).await {
        return Err(session_not_found(session_id));
    }
    tracing::info!(%session_id, "Deleted session");

    Ok(Json(DeleteResponse {
        deleted: true,
        id: session_id.to_string(),
    }))
}

fn session_not_found(session_id: Uuid) -> ApiError {
    ApiError::not_found("Session not found").with_details(format!("No session with id {}", session_id))
}
