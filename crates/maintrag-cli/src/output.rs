use console::style;
use maintrag_retrieval::Answer;
use serde::Serialize;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            },
        }
    }

    pub fn success(&self, message: impl Display) {
        self.status_line("success", style("✓").green().bold(), message, false);
    }

    pub fn info(&self, message: impl Display) {
        self.status_line("info", style("ℹ").blue().bold(), message, false);
    }

    /// Warnings go to stderr in both formats
    pub fn warning(&self, message: impl Display) {
        self.status_line("warning", style("⚠").yellow().bold(), message, true);
    }

    fn status_line(&self, status: &str, marker: impl Display, message: impl Display, stderr: bool) {
        let line = match self.format {
            OutputFormat::Human => format!("{} {}", marker, message),
            OutputFormat::Json => pretty(&serde_json::json!({
                "status": status,
                "message": message.to_string(),
            })),
        };
        if stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    pub fn table<T: Tabled>(&self, rows: Vec<T>) {
        if rows.is_empty() {
            println!("{}", style("(none)").dim());
            return;
        }
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    /// Print a JSON success envelope around `data`
    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let envelope = serde_json::json!({ "status": "success", "data": data });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        Ok(())
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        if self.is_json() {
            println!("{}", pretty(&serde_json::json!({ key.to_string(): value.to_string() })));
        } else {
            println!("{}: {}", style(key).bold(), value);
        }
    }

    /// Section heading; JSON output has no headings
    pub fn section(&self, title: impl Display) {
        if !self.is_json() {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    /// Print one answer, with its explanation when present
    pub fn answer(&self, answer: &Answer) -> anyhow::Result<()> {
        if self.is_json() {
            return self.result(answer);
        }

        println!("{}", answer.text);
        for note in &answer.notes {
            println!("{} {}", style("note:").dim(), style(note).dim());
        }

        if let Some(explanation) = &answer.explanation {
            self.section("Explanation");
            let parse = &explanation.parse_phase;
            self.kv("Intent", answer.plan.intent);
            self.kv("Rule", parse.rule);
            self.kv("Follow-up", answer.plan.follow_up);
            self.kv("Filters", serde_json::to_string(&answer.plan.filters)?);
            self.kv("Stated Filters", serde_json::to_string(&parse.stated_filters)?);

            let retrieval = &explanation.retrieval_phase;
            self.kv(
                "Retrieval",
                format!(
                    "{} rows scanned, {} matched ({} work orders){}",
                    retrieval.stats.rows_scanned,
                    retrieval.stats.rows_matched,
                    retrieval.stats.work_orders_matched,
                    if retrieval.full_dataset {
                        ", detail read from full dataset"
                    } else {
                        ""
                    }
                ),
            );

            let generation = &explanation.generation_phase;
            let generation_text = match (&generation.model, generation.fallback) {
                (None, _) => "disabled".to_string(),
                (Some(model), None) => format!("rephrased by {}", model),
                (Some(model), Some(reason)) => {
                    format!("{} kept deterministic text ({:?})", model, reason)
                }
            };
            self.kv("Generation", generation_text);
            if answer.rephrased {
                self.kv("Deterministic Answer", &answer.deterministic_text);
            }
        }
        Ok(())
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
