use chrono::NaiveDateTime;
use serde::Serialize;

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub dataset: DatasetSummary,
    pub config: Vec<ConfigEntry>,
    pub llm: LlmStatus,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub path: String,
    pub rows: usize,
    pub work_orders: usize,
    pub first_start: Option<NaiveDateTime>,
    pub last_start: Option<NaiveDateTime>,
    pub default_year: Option<i32>,
    pub equipment: usize,
    pub product_lines: usize,
    pub symptoms: usize,
    pub technicians: usize,

    /// Every known categorical value, only with `--verbose`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<CatalogValues>,
}

#[derive(Debug, Serialize)]
pub struct CatalogValues {
    pub equipment: Vec<String>,
    pub product_lines: Vec<String>,
    pub symptoms: Vec<String>,
    pub technicians: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct LlmStatus {
    pub enabled: bool,
    pub model: String,
    pub host: String,

    /// Only probed when rephrasing is enabled
    pub reachable: Option<bool>,
}

/// Output for batch command
#[derive(Debug, Serialize)]
pub struct BatchOutput {
    pub questions: usize,
    pub answered: usize,
    pub with_expectation: usize,
    pub matched: usize,
    pub json_path: String,
    pub text_path: String,
}
