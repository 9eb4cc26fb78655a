use maintrag_core::error::{MaintragError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::Rephraser;

const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 180;
const AVAILABILITY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Ollama rephraser implementation
pub struct OllamaRephraser {
    /// Base URL for Ollama API (e.g., "http://localhost:11434")
    base_url: String,

    /// Model name to use for generation
    model: String,

    /// Upper bound for one generation request
    timeout: Duration,
}

impl OllamaRephraser {
    /// Create a new Ollama rephraser
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
        }
    }

    /// Create with default localhost URL
    pub fn localhost(model: impl Into<String>) -> Self {
        Self::new("http://127.0.0.1:11434", model, Duration::from_secs(30))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check whether the Ollama server answers at all
    pub fn is_available(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Runtime::new() else {
            return false;
        };

        runtime.block_on(async {
            let Ok(client) = reqwest::Client::builder().timeout(AVAILABILITY_TIMEOUT).build() else {
                return false;
            };
            match client.get(format!("{}/api/tags", self.base_url)).send().await {
                Ok(response) => response.status().is_success(),
                Err(e) => {
                    tracing::debug!(error = %e, url = %self.base_url, "Ollama not reachable");
                    false
                }
            }
        })
    }

    fn unavailable(&self, reason: String) -> MaintragError {
        MaintragError::GeneratorUnavailable {
            reason,
            remediation: format!(
                "Ensure Ollama is running at {} and the model '{}' is available. \
                 Run 'ollama pull {}' to download the model.",
                self.base_url, self.model, self.model
            ),
        }
    }
}

impl Rephraser for OllamaRephraser {
    fn rephrase(&self, question: &str, answer: &str) -> Result<String> {
        // Use tokio runtime to execute async request
        let runtime = tokio::runtime::Runtime::new().map_err(|e| {
            MaintragError::GeneratorUnavailable {
                reason: format!("Failed to create async runtime: {}", e),
                remediation: "Ensure tokio is properly configured".to_string(),
            }
        })?;

        runtime.block_on(async {
            let client = reqwest::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| self.unavailable(format!("Failed to build HTTP client: {}", e)))?;

            let request = OllamaGenerateRequest {
                model: self.model.clone(),
                prompt: grounding_prompt(question, answer),
                stream: false,
                options: OllamaOptions {
                    temperature: TEMPERATURE,
                    num_predict: MAX_OUTPUT_TOKENS,
                },
            };

            let response = client
                .post(format!("{}/api/generate", self.base_url))
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        self.unavailable(format!(
                            "Ollama did not answer within {}s",
                            self.timeout.as_secs()
                        ))
                    } else {
                        self.unavailable(format!("Failed to connect to Ollama: {}", e))
                    }
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(MaintragError::GeneratorUnavailable {
                    reason: format!("Ollama API error ({}): {}", status, error_text),
                    remediation: format!(
                        "Check that the model '{}' is available. Run 'ollama list' to see installed models.",
                        self.model
                    ),
                });
            }

            let generated: OllamaGenerateResponse = response.json().await.map_err(|e| {
                MaintragError::GeneratorUnavailable {
                    reason: format!("Failed to parse Ollama response: {}", e),
                    remediation: "Check Ollama API compatibility".to_string(),
                }
            })?;

            Ok(generated.response.trim().to_string())
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Prompt that pins the model to the deterministic answer
pub fn grounding_prompt(question: &str, answer: &str) -> String {
    format!(
        "You are a maintenance analytics assistant.\n\
         You MUST answer using ONLY the TOOL OUTPUT.\n\
         Do NOT invent details.\n\
         Do NOT change numbers.\n\n\
         QUESTION:\n{question}\n\n\
         TOOL OUTPUT (source of truth):\n{answer}\n\n\
         Write a concise answer in 1 sentence. \
         If TOOL OUTPUT is a number, restate it clearly.\n"
    )
}

/// Request body for Ollama generate API
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response from Ollama generate API
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_rephraser_creation() {
        let rephraser = OllamaRephraser::localhost("phi3:mini");
        assert_eq!(rephraser.model_name(), "phi3:mini");
        assert_eq!(rephraser.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_custom_url_is_normalized() {
        let rephraser =
            OllamaRephraser::new("http://custom:11434/", "llama3", Duration::from_secs(5));
        assert_eq!(rephraser.base_url(), "http://custom:11434");
    }

    #[test]
    fn test_prompt_carries_question_and_answer() {
        let prompt = grounding_prompt("How many leaks?", "There were 4 incidents.");
        assert!(prompt.contains("QUESTION:\nHow many leaks?"));
        assert!(prompt.contains("There were 4 incidents."));
        assert!(prompt.contains("Do NOT change numbers."));
    }

    #[test]
    fn test_unreachable_server_is_an_error() {
        // Port 9 (discard) is not an Ollama server
        let rephraser =
            OllamaRephraser::new("http://127.0.0.1:9", "phi3:mini", Duration::from_millis(300));
        let err = rephraser.rephrase("q", "There were 3 incidents.").unwrap_err();
        assert!(matches!(err, MaintragError::GeneratorUnavailable { .. }));
        assert!(!rephraser.is_available());
    }

    #[test]
    fn test_request_serialization() {
        let request = OllamaGenerateRequest {
            model: "phi3:mini".into(),
            prompt: "p".into(),
            stream: false,
            options: OllamaOptions {
                temperature: TEMPERATURE,
                num_predict: MAX_OUTPUT_TOKENS,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 180);
    }
}
