//! Configuration and pipeline setup shared by the CLI commands

use anyhow::{Context, Result};
use maintrag_core::config::{CliConfigOverrides, LayeredConfig};
use maintrag_core::{Dataset, MaintragError};
use maintrag_llm::OllamaRephraser;
use maintrag_retrieval::{AnalyticsOptions, QueryPipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Cli;
use crate::errors;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "maintrag.toml";

/// Load layered configuration: defaults, file, environment, then CLI flags
pub fn load_config(cli: &Cli) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    match &cli.config {
        Some(path) => {
            config = config
                .load_from_file(path)
                .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                config = config
                    .load_from_file(&default_path)
                    .context("Failed to load configuration file")?;
            }
        }
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides(cli));
    Ok(config)
}

fn overrides(cli: &Cli) -> CliConfigOverrides {
    CliConfigOverrides {
        data_path: cli.data.clone(),
        top_n: cli.top_n,
        list_limit: cli.list_limit,
        llm_enabled: cli.llm.then_some(true),
        llm_model: cli.model.clone(),
    }
}

/// Load the dataset, mapping loader failures to actionable CLI errors
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    Dataset::load(path).map_err(|e| match e {
        MaintragError::DatasetNotFound { path } => {
            errors::dataset_not_found(&path.display().to_string()).into()
        }
        MaintragError::MissingColumns { .. }
        | MaintragError::InvalidRecord { .. }
        | MaintragError::Csv(_) => errors::dataset_invalid(&path.display().to_string(), &e.to_string()).into(),
        other => anyhow::Error::new(other).context("Failed to load dataset"),
    })
}

/// Build the question pipeline described by the configuration
pub fn build_pipeline(config: &LayeredConfig, explain: bool) -> Result<QueryPipeline> {
    let dataset = load_dataset(&config.data_path.value)?;

    let mut pipeline = QueryPipeline::new(Arc::new(dataset))
        .with_options(AnalyticsOptions {
            top_n: config.top_n.value,
            list_limit: config.list_limit.value,
        })
        .with_explain(explain);

    if let Some(rephraser) = rephraser(config) {
        pipeline = pipeline.with_rephraser(Arc::new(rephraser));
    }

    Ok(pipeline)
}

/// Ollama rephraser if enabled and reachable
pub fn rephraser(config: &LayeredConfig) -> Option<OllamaRephraser> {
    if !config.llm_enabled.value {
        return None;
    }

    let rephraser = OllamaRephraser::new(
        config.llm_host.value.clone(),
        config.llm_model.value.clone(),
        Duration::from_secs(config.llm_timeout_secs.value),
    );

    if rephraser.is_available() {
        tracing::info!(model = %config.llm_model.value, host = %config.llm_host.value, "Rephrasing enabled");
        Some(rephraser)
    } else {
        tracing::warn!(
            host = %config.llm_host.value,
            "Ollama is not reachable; answers will not be rephrased"
        );
        None
    }
}
