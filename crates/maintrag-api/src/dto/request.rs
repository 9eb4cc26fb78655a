use serde::Deserialize;

/// Question request body
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}
