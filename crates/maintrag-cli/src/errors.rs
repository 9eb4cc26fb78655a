use console::style;
use maintrag_core::MaintragError;
use std::fmt;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }

    /// Machine-readable form for `--json` output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "error",
            "message": self.message,
            "context": self.context,
            "suggestions": self.suggestions,
        })
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for missing dataset
pub fn dataset_not_found(path: &str) -> CliError {
    CliError::new("Dataset file not found")
        .with_context(format!("The maintenance log does not exist.\n\nPath: {}", path))
        .with_suggestion("Pass the CSV explicitly: maintrag --data path/to/maintenance_records.csv ask \"...\"")
        .with_suggestion("Or set MAINTRAG_DATA, or data_path in maintrag.toml")
        .with_help("Run: maintrag --help")
}

/// Create error for a CSV that fails schema validation
pub fn dataset_invalid(path: &str, reason: &str) -> CliError {
    CliError::new("Dataset could not be loaded")
        .with_context(format!("The maintenance log is not valid.\n\nPath: {}\nReason: {}", path, reason))
        .with_suggestion(
            "Required columns: work_order_id, equipment_id, product_line, start_date, start_time, \
             end_date, end_time, description, technician, comment, symptom_code",
        )
        .with_suggestion("Dates use YYYY-MM-DD and times HH:MM:SS")
        .with_help("Run: maintrag inspect --help")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check maintrag.toml for syntax errors")
        .with_suggestion("Check MAINTRAG_* and OLLAMA_* environment variables")
        .with_help("Run: maintrag inspect")
}

/// Create error for a batch file that cannot be read
pub fn batch_file_invalid(path: &str, reason: &str) -> CliError {
    CliError::new("Batch file could not be read")
        .with_context(format!("Path: {}\nReason: {}", path, reason))
        .with_suggestion(
            "Expected JSON: {\"single_turn\": [{\"id\", \"question\", \"expected_answer\"}], \
             \"multi_turn\": [{\"id\", \"name\", \"turns\": [...]}]}",
        )
        .with_help("Run: maintrag batch --help")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<CliError>() {
        Ok(cli_error) => return cli_error,
        Err(error) => error,
    };

    if let Some(core) = error.chain().find_map(|e| e.downcast_ref::<MaintragError>()) {
        return match core {
            MaintragError::ConfigInvalid { key, reason } => invalid_config(key, reason),
            MaintragError::ConfigMissing { key } => invalid_config(key, "value is missing"),
            MaintragError::DatasetNotFound { path } => {
                dataset_not_found(&path.display().to_string())
            }
            MaintragError::GeneratorUnavailable { reason, remediation } => {
                CliError::new("Language model unavailable")
                    .with_context(reason.clone())
                    .with_suggestion(remediation.clone())
                    .with_suggestion("Or run without --llm")
            }
            other => CliError::new(format!("{:#}", error)).with_context(other.to_string()),
        };
    }

    let message = format!("{:#}", error);
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again")
    } else if message.contains("permission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check file permissions")
    } else {
        CliError::new(message)
    }
}
