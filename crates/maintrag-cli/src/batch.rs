//! Batch runner for question files
//!
//! Single-turn questions each start from a fresh conversation; the turns of a
//! multi-turn conversation share one context.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use maintrag_core::models::ConversationContext;
use maintrag_retrieval::QueryPipeline;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const RESULTS_JSON: &str = "test_results.json";
pub const RESULTS_TXT: &str = "test_results.txt";

/// Identifier of a test case, numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseId {
    Number(i64),
    Text(String),
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseId::Number(n) => write!(f, "{}", n),
            CaseId::Text(s) => f.write_str(s),
        }
    }
}

/// Question file layout
#[derive(Debug, Clone, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub single_turn: Vec<SingleTurnCase>,

    #[serde(default)]
    pub multi_turn: Vec<ConversationCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SingleTurnCase {
    pub id: CaseId,
    pub question: String,
    #[serde(default)]
    pub expected_answer: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationCase {
    pub id: CaseId,
    #[serde(default)]
    pub name: String,
    pub turns: Vec<TurnCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnCase {
    pub question: String,
    #[serde(default)]
    pub expected_answer: Option<serde_json::Value>,
}

impl BatchFile {
    /// Read and parse a question file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse batch file {}", path.display()))
    }

    pub fn question_count(&self) -> usize {
        self.single_turn.len() + self.multi_turn.iter().map(|c| c.turns.len()).sum::<usize>()
    }
}

/// Outcome of one question
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CaseId>,
    pub question: String,
    pub expected: String,
    pub output: String,
    pub intent: String,

    /// Whether the output meets the expectation; absent without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationResult {
    pub id: CaseId,
    pub name: String,
    pub turns: Vec<TurnResult>,
}

/// Counts over every question in a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub questions: usize,
    pub answered: usize,
    pub with_expectation: usize,
    pub matched: usize,
}

impl BatchSummary {
    fn record(&mut self, turn: &TurnResult) {
        self.questions += 1;
        if !turn.output.trim().is_empty() {
            self.answered += 1;
        }
        if let Some(matched) = turn.matched {
            self.with_expectation += 1;
            if matched {
                self.matched += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResults {
    pub timestamp: String,
    pub single_turn: Vec<TurnResult>,
    pub multi_turn: Vec<ConversationResult>,
    pub summary: BatchSummary,
}

/// Answer every question of a batch file
pub fn run_batch(pipeline: &QueryPipeline, file: &BatchFile, progress: &ProgressBar) -> BatchResults {
    let mut summary = BatchSummary::default();

    let single_turn: Vec<TurnResult> = file
        .single_turn
        .iter()
        .map(|case| {
            let (turn, _) = answer_turn(
                pipeline,
                Some(case.id.clone()),
                &case.question,
                &case.expected_answer,
                &ConversationContext::new(),
            );
            summary.record(&turn);
            progress.inc(1);
            turn
        })
        .collect();

    let mut multi_turn = Vec::with_capacity(file.multi_turn.len());
    for conversation in &file.multi_turn {
        tracing::debug!(id = %conversation.id, name = %conversation.name, "Running conversation");
        let mut context = ConversationContext::new();
        let mut turns = Vec::with_capacity(conversation.turns.len());
        for case in &conversation.turns {
            let (turn, next) =
                answer_turn(pipeline, None, &case.question, &case.expected_answer, &context);
            context = next;
            summary.record(&turn);
            progress.inc(1);
            turns.push(turn);
        }
        multi_turn.push(ConversationResult {
            id: conversation.id.clone(),
            name: conversation.name.clone(),
            turns,
        });
    }

    BatchResults {
        timestamp: chrono::Local::now().to_rfc3339(),
        single_turn,
        multi_turn,
        summary,
    }
}

fn answer_turn(
    pipeline: &QueryPipeline,
    id: Option<CaseId>,
    question: &str,
    expected: &Option<serde_json::Value>,
    context: &ConversationContext,
) -> (TurnResult, ConversationContext) {
    let expected = expected_text(expected);
    let question = question.trim();

    // Blank questions are recorded unanswered and leave the context alone
    if question.is_empty() {
        let turn = TurnResult {
            id,
            question: String::new(),
            matched: (!expected.is_empty()).then_some(false),
            expected,
            output: String::new(),
            intent: String::new(),
        };
        return (turn, context.clone());
    }

    let (answer, next) = pipeline.ask(question, context);
    let turn = TurnResult {
        id,
        question: question.to_string(),
        matched: (!expected.is_empty()).then(|| expectation_met(&expected, &answer.text)),
        expected,
        output: answer.text,
        intent: answer.plan.intent.name().to_string(),
    };
    (turn, next)
}

fn expected_text(expected: &Option<serde_json::Value>) -> String {
    match expected {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// Whether an answer carries the expected content
///
/// Matches when the expected text appears verbatim (ignoring case), or when
/// every word and number of the expectation appears in the output.
pub fn expectation_met(expected: &str, output: &str) -> bool {
    let expected_lower = expected.to_lowercase();
    let output_lower = output.to_lowercase();
    if output_lower.contains(&expected_lower) {
        return true;
    }

    let output_tokens: Vec<&str> = tokens(&output_lower).collect();
    let mut expected_tokens = tokens(&expected_lower).peekable();
    expected_tokens.peek().is_some() && expected_tokens.all(|t| output_tokens.contains(&t))
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .filter(|t| !t.is_empty())
}

/// Plain-text report in the same order as the JSON
pub fn render_text(results: &BatchResults) -> String {
    let rule = "-".repeat(50);
    let mut out = format!("Run: {}\n\n", results.timestamp);

    let push_turn = |out: &mut String, turn: &TurnResult| {
        out.push_str(&format!("Q: {}\n", turn.question));
        out.push_str(&format!("Expected: {}\n", turn.expected));
        out.push_str(&format!("Output: {}\n", turn.output));
        if let Some(matched) = turn.matched {
            out.push_str(&format!("Matched: {}\n", if matched { "yes" } else { "no" }));
        }
        out.push_str(&rule);
        out.push('\n');
    };

    for turn in &results.single_turn {
        push_turn(&mut out, turn);
    }

    out.push_str("\nMULTI TURN\n\n");
    for conversation in &results.multi_turn {
        out.push_str(&format!("Conversation: {} ({})\n\n", conversation.id, conversation.name));
        for turn in &conversation.turns {
            push_turn(&mut out, turn);
        }
    }

    let s = &results.summary;
    out.push_str(&format!(
        "\nSUMMARY\nQuestions: {}\nAnswered: {}\nMatched expectations: {}/{}\n",
        s.questions, s.answered, s.matched, s.with_expectation
    ));
    out
}

/// Write the JSON and text reports into `dir`
pub fn write_results(results: &BatchResults, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create results directory {}", dir.display()))?;

    let json_path = dir.join(RESULTS_JSON);
    let txt_path = dir.join(RESULTS_TXT);

    fs::write(&json_path, serde_json::to_string_pretty(results)?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    fs::write(&txt_path, render_text(results))
        .with_context(|| format!("Failed to write {}", txt_path.display()))?;

    Ok((json_path, txt_path))
}
