use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// maintrag - Question answering over maintenance work-order logs
#[derive(Parser, Debug)]
#[command(name = "maintrag")]
#[command(about = "Ask natural-language questions about maintenance logs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Maintenance log CSV (overrides config and MAINTRAG_DATA)
    #[arg(long, global = true, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Configuration file (defaults to ./maintrag.toml when present)
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show how each question was understood and answered
    #[arg(long, global = true)]
    pub explain: bool,

    /// Rephrase answers with the local language model
    #[arg(long, global = true)]
    pub llm: bool,

    /// Language model to use for rephrasing
    #[arg(long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Number of entries in rankings when the question names none
    #[arg(long, global = true, value_name = "N")]
    pub top_n: Option<usize>,

    /// Number of work orders shown in list answers
    #[arg(long, global = true, value_name = "N")]
    pub list_limit: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question
    Ask(AskArgs),

    /// Start an interactive conversation
    Chat,

    /// Run a file of test questions and save the results
    Batch(BatchArgs),

    /// Show dataset and configuration summary
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
pub struct AskArgs {
    /// The question text
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,
}

impl AskArgs {
    /// Words of the question joined back together
    pub fn text(&self) -> String {
        self.question.join(" ")
    }
}

#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// JSON file with single_turn and multi_turn questions
    pub file: PathBuf,

    /// Directory the result files are written to
    #[arg(long, default_value = "results")]
    pub out: PathBuf,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Also list every known categorical value
    #[arg(long)]
    pub verbose: bool,
}
