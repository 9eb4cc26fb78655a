//! maintrag LLM - Optional answer rephrasing
//!
//! This crate defines the rephrasing port, the Ollama adapter, and the guard
//! that falls back to the deterministic answer whenever the model is
//! unavailable or changes the facts.

pub mod guard;
pub mod ollama;
pub mod ports;

// Re-export main types
pub use guard::{rephrase_or_fallback, Fallback, Rephrased};
pub use ollama::OllamaRephraser;
pub use ports::Rephraser;
