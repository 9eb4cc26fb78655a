use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health_check))

        // Stateless questions
        .route("/ask", post(handlers::handle_ask))

        // Conversations
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{session_id}", delete(handlers::delete_session))
        .route("/sessions/{session_id}/ask", post(handlers::ask_in_session))
        .route("/sessions/{session_id}/reset", post(handlers::reset_session))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
