use axum::{extract::State, Json};

use crate::dto::{HealthResponse, LlmHealth};
use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let dataset = state.pipeline.dataset();
    let model = state.pipeline.rephraser_model().map(str::to_string);

    Json(HealthResponse {
        status: "ok",
        service: "maintrag-api",
        dataset_rows: dataset.len(),
        work_orders: dataset.distinct_work_orders(),
        sessions: state.sessions.len().await,
        llm: LlmHealth {
            enabled: model.is_some(),
            model,
        },
    })
}
