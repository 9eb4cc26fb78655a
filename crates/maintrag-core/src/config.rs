use crate::error::{MaintragError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_PATH: &str = "data/maintenance_records.csv";
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_LIST_LIMIT: usize = 10;
pub const DEFAULT_LLM_MODEL: &str = "phi3:mini";
pub const DEFAULT_LLM_HOST: &str = "http://127.0.0.1:11434";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for maintrag
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub data_path: ConfigValue<PathBuf>,
    pub top_n: ConfigValue<usize>,
    pub list_limit: ConfigValue<usize>,
    pub llm_enabled: ConfigValue<bool>,
    pub llm_model: ConfigValue<String>,
    pub llm_host: ConfigValue<String>,
    pub llm_timeout_secs: ConfigValue<u64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            data_path: ConfigValue::new(PathBuf::from(DEFAULT_DATA_PATH), ConfigSource::Default),
            top_n: ConfigValue::new(DEFAULT_TOP_N, ConfigSource::Default),
            list_limit: ConfigValue::new(DEFAULT_LIST_LIMIT, ConfigSource::Default),
            llm_enabled: ConfigValue::new(false, ConfigSource::Default),
            llm_model: ConfigValue::new(DEFAULT_LLM_MODEL.to_string(), ConfigSource::Default),
            llm_host: ConfigValue::new(DEFAULT_LLM_HOST.to_string(), ConfigSource::Default),
            llm_timeout_secs: ConfigValue::new(DEFAULT_LLM_TIMEOUT_SECS, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| MaintragError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| MaintragError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(data_path) = file_config.data_path {
            self.data_path.update(data_path, ConfigSource::File);
        }

        if let Some(top_n) = file_config.top_n {
            self.top_n.update(require_positive("top_n", top_n)?, ConfigSource::File);
        }

        if let Some(list_limit) = file_config.list_limit {
            self.list_limit
                .update(require_positive("list_limit", list_limit)?, ConfigSource::File);
        }

        if let Some(llm) = file_config.llm {
            if let Some(enabled) = llm.enabled {
                self.llm_enabled.update(enabled, ConfigSource::File);
            }
            if let Some(model) = llm.model {
                self.llm_model.update(model, ConfigSource::File);
            }
            if let Some(host) = llm.host {
                self.llm_host.update(host, ConfigSource::File);
            }
            if let Some(timeout) = llm.timeout_secs {
                let timeout = require_positive("llm.timeout_secs", timeout as usize)? as u64;
                self.llm_timeout_secs.update(timeout, ConfigSource::File);
            }
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // MAINTRAG_DATA
        if let Ok(path) = env::var("MAINTRAG_DATA") {
            if path.trim().is_empty() {
                tracing::warn!("Ignoring empty MAINTRAG_DATA");
            } else {
                self.data_path.update(PathBuf::from(path), ConfigSource::Environment);
            }
        }

        // MAINTRAG_TOP_N
        if let Ok(value) = env::var("MAINTRAG_TOP_N") {
            match parse_positive_integer("top_n", &value) {
                Ok(n) => self.top_n.update(n, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid MAINTRAG_TOP_N value '{}': expected a positive integer",
                    value
                ),
            }
        }

        // MAINTRAG_LIST_LIMIT
        if let Ok(value) = env::var("MAINTRAG_LIST_LIMIT") {
            match parse_positive_integer("list_limit", &value) {
                Ok(n) => self.list_limit.update(n, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid MAINTRAG_LIST_LIMIT value '{}': expected a positive integer",
                    value
                ),
            }
        }

        // MAINTRAG_USE_LLM
        if let Ok(value) = env::var("MAINTRAG_USE_LLM") {
            match parse_bool_flag(&value) {
                Ok(enabled) => self.llm_enabled.update(enabled, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid MAINTRAG_USE_LLM value '{}': expected true/false, 1/0, yes/no or on/off",
                    value
                ),
            }
        }

        // OLLAMA_MODEL
        if let Ok(model) = env::var("OLLAMA_MODEL") {
            if !model.trim().is_empty() {
                self.llm_model.update(model, ConfigSource::Environment);
            }
        }

        // OLLAMA_HOST
        if let Ok(host) = env::var("OLLAMA_HOST") {
            if !host.trim().is_empty() {
                self.llm_host.update(normalize_host(&host), ConfigSource::Environment);
            }
        }

        // MAINTRAG_LLM_TIMEOUT
        if let Ok(value) = env::var("MAINTRAG_LLM_TIMEOUT") {
            match parse_positive_integer("llm.timeout_secs", &value) {
                Ok(secs) => self.llm_timeout_secs.update(secs as u64, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid MAINTRAG_LLM_TIMEOUT value '{}': expected seconds as a positive integer",
                    value
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(data_path) = overrides.data_path {
            self.data_path.update(data_path, ConfigSource::Cli);
        }

        if let Some(top_n) = overrides.top_n {
            self.top_n.update(top_n, ConfigSource::Cli);
        }

        if let Some(list_limit) = overrides.list_limit {
            self.list_limit.update(list_limit, ConfigSource::Cli);
        }

        if let Some(enabled) = overrides.llm_enabled {
            self.llm_enabled.update(enabled, ConfigSource::Cli);
        }

        if let Some(model) = overrides.llm_model {
            self.llm_model.update(model, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "data_path".to_string(),
            (self.data_path.value.display().to_string(), self.data_path.source),
        );
        map.insert("top_n".to_string(), (self.top_n.value.to_string(), self.top_n.source));
        map.insert(
            "list_limit".to_string(),
            (self.list_limit.value.to_string(), self.list_limit.source),
        );
        map.insert(
            "llm.enabled".to_string(),
            (self.llm_enabled.value.to_string(), self.llm_enabled.source),
        );
        map.insert("llm.model".to_string(), (self.llm_model.value.clone(), self.llm_model.source));
        map.insert("llm.host".to_string(), (self.llm_host.value.clone(), self.llm_host.source));
        map.insert(
            "llm.timeout_secs".to_string(),
            (format!("{}s", self.llm_timeout_secs.value), self.llm_timeout_secs.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    data_path: Option<PathBuf>,
    top_n: Option<usize>,
    list_limit: Option<usize>,
    llm: Option<FileLlmConfig>,
}

/// `[llm]` table of the config file
#[derive(Debug, Deserialize, Serialize)]
struct FileLlmConfig {
    enabled: Option<bool>,
    model: Option<String>,
    host: Option<String>,
    timeout_secs: Option<u64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub data_path: Option<PathBuf>,
    pub top_n: Option<usize>,
    pub list_limit: Option<usize>,
    pub llm_enabled: Option<bool>,
    pub llm_model: Option<String>,
}

/// Parse a boolean switch such as `MAINTRAG_USE_LLM`
pub fn parse_bool_flag(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MaintragError::ConfigInvalid {
            key: "llm.enabled".to_string(),
            reason: format!("Invalid flag: {}. Use true/false, 1/0, yes/no or on/off", s),
        }),
    }
}

/// Parse a strictly positive integer
pub fn parse_positive_integer(key: &str, s: &str) -> Result<usize> {
    let value = s.trim().parse::<usize>().map_err(|_| MaintragError::ConfigInvalid {
        key: key.to_string(),
        reason: format!("'{}' is not a non-negative integer", s),
    })?;
    require_positive(key, value)
}

fn require_positive(key: &str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(MaintragError::ConfigInvalid {
            key: key.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Accept `host:port` as well as a full URL
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
