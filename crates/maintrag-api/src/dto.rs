mod request;
mod response;

pub use request::AskRequest;
pub use response::{AskResponse, DeleteResponse, HealthResponse, LlmHealth, SessionResponse};
