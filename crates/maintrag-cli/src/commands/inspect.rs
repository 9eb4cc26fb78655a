//! Inspect command implementation

use crate::cli::InspectArgs;
use crate::config_loader;
use crate::output::OutputWriter;
use crate::output_types::{CatalogValues, ConfigEntry, DatasetSummary, InspectOutput, LlmStatus};
use anyhow::Result;
use maintrag_core::config::LayeredConfig;
use maintrag_core::models::Dimension;
use maintrag_core::Dataset;
use maintrag_llm::OllamaRephraser;
use std::time::Duration;
use tabled::Tabled;

pub fn execute(args: InspectArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let dataset = config_loader::load_dataset(&config.data_path.value)?;
    let summary = summarize(&dataset, config, args.verbose);
    let entries = config_entries(config);
    let llm = llm_status(config);

    if output.is_json() {
        return output.result(InspectOutput {
            dataset: summary,
            config: entries,
            llm,
        });
    }

    output.section("Dataset");
    output.kv("Path", &summary.path);
    output.kv("Rows", summary.rows);
    output.kv("Work Orders", summary.work_orders);
    match (summary.first_start, summary.last_start) {
        (Some(first), Some(last)) => output.kv(
            "Time Span",
            format!("{} to {}", first.format("%Y-%m-%d %H:%M"), last.format("%Y-%m-%d %H:%M")),
        ),
        _ => output.kv("Time Span", "(empty)"),
    }
    if let Some(year) = summary.default_year {
        output.kv("Default Year", year);
    }

    #[derive(Tabled)]
    struct CatalogRow {
        #[tabled(rename = "Column")]
        column: String,
        #[tabled(rename = "Distinct Values")]
        count: usize,
    }

    output.section("Known Values");
    output.table(vec![
        CatalogRow { column: "equipment_id".into(), count: summary.equipment },
        CatalogRow { column: "product_line".into(), count: summary.product_lines },
        CatalogRow { column: "symptom_code".into(), count: summary.symptoms },
        CatalogRow { column: "technician".into(), count: summary.technicians },
    ]);

    if let Some(values) = &summary.values {
        output.kv("Equipment", values.equipment.join(", "));
        output.kv("Product Lines", values.product_lines.join(", "));
        output.kv("Symptoms", values.symptoms.join(", "));
        output.kv("Technicians", values.technicians.join(", "));
    }

    #[derive(Tabled)]
    struct ConfigRow {
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    output.section("Configuration Values");
    output.table(
        entries
            .into_iter()
            .map(|e| ConfigRow { key: e.key, value: e.value, source: e.source })
            .collect(),
    );
    output.info("CLI arguments > Environment variables > Config file > Defaults");

    output.section("Language Model");
    if !llm.enabled {
        output.kv("Rephrasing", "disabled (enable with --llm or MAINTRAG_USE_LLM=true)");
    } else if llm.reachable == Some(true) {
        output.kv("Rephrasing", format!("{} at {}", llm.model, llm.host));
    } else {
        output.warning(format!("Ollama is not reachable at {}; answers will not be rephrased", llm.host));
    }

    Ok(())
}

fn summarize(dataset: &Dataset, config: &LayeredConfig, verbose: bool) -> DatasetSummary {
    let catalog = dataset.catalog();
    let span = dataset.time_span();

    let values = verbose.then(|| CatalogValues {
        equipment: catalog.values(Dimension::Equipment).to_vec(),
        product_lines: catalog.values(Dimension::ProductLine).to_vec(),
        symptoms: catalog.values(Dimension::Symptom).to_vec(),
        technicians: catalog.values(Dimension::Technician).to_vec(),
    });

    DatasetSummary {
        path: config.data_path.value.display().to_string(),
        rows: dataset.len(),
        work_orders: dataset.distinct_work_orders(),
        first_start: span.map(|(first, _)| first),
        last_start: span.map(|(_, last)| last),
        default_year: catalog.default_year,
        equipment: catalog.equipment.len(),
        product_lines: catalog.product_lines.len(),
        symptoms: catalog.symptoms.len(),
        technicians: catalog.technicians.len(),
        values,
    }
}

fn config_entries(config: &LayeredConfig) -> Vec<ConfigEntry> {
    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry {
            key,
            value,
            source: format!("{:?}", source),
        })
        .collect();

    entries.sort_by(|a, b| a.key.cmp(&b.key));
    entries
}

fn llm_status(config: &LayeredConfig) -> LlmStatus {
    let reachable = config.llm_enabled.value.then(|| {
        OllamaRephraser::new(
            config.llm_host.value.clone(),
            config.llm_model.value.clone(),
            Duration::from_secs(config.llm_timeout_secs.value),
        )
        .is_available()
    });

    LlmStatus {
        enabled: config.llm_enabled.value,
        model: config.llm_model.value.clone(),
        host: config.llm_host.value.clone(),
        reachable,
    }
}
