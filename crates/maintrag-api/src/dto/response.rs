use chrono::{DateTime, Utc};
use maintrag_retrieval::Answer;
use serde::Serialize;
use uuid::Uuid;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub dataset_rows: usize,
    pub work_orders: usize,
    pub sessions: usize,
    pub llm: LlmHealth,
}

#[derive(Debug, Serialize)]
pub struct LlmHealth {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Created session response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Answer response; session fields are absent for stateless questions
#[derive(Debug, Serialize)]
pub struct AskResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<usize>,
    #[serde(flatten)]
    pub answer: Answer,
}

/// Delete operation response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: String,
}
