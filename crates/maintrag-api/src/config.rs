use std::env;
use std::path::PathBuf;

use maintrag_core::config::LayeredConfig;

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origin: String,

    /// Dataset and rephrasing settings shared with the CLI
    pub settings: LayeredConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables
    ///
    /// `MAINTRAG_CONFIG` names an optional TOML file applied before the
    /// `MAINTRAG_*` and `OLLAMA_*` variables.
    pub fn from_env() -> maintrag_core::Result<Self> {
        let port = env::var("MAINTRAG_API_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3001);

        let cors_origin = env::var("MAINTRAG_CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mut settings = LayeredConfig::with_defaults();
        if let Ok(path) = env::var("MAINTRAG_CONFIG") {
            settings = settings.load_from_file(PathBuf::from(path))?;
        }

        Ok(Self {
            port,
            cors_origin,
            settings: settings.load_from_env(),
        })
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
