//! Fallback policy around the optional rephraser
//!
//! The deterministic answer is always the source of truth. A rephrasing is
//! only used when it carries exactly the same numbers.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::ports::Rephraser;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("Invalid regex"));

/// Why the deterministic text was kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    NotConfigured,
    BareNumber,
    Failed,
    EmptyOutput,
    NumbersChanged,
}

/// Final answer text plus how it was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rephrased {
    pub text: String,
    pub rephrased: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
}

impl Rephrased {
    fn kept(answer: &str, reason: Fallback) -> Self {
        Self {
            text: answer.to_string(),
            rephrased: false,
            fallback: Some(reason),
        }
    }
}

/// Rephrase `answer` if a rephraser is configured, otherwise return it as is.
///
/// Errors never escape: a failing or timed-out call yields the deterministic
/// text unchanged.
pub fn rephrase_or_fallback(
    rephraser: Option<&dyn Rephraser>,
    question: &str,
    answer: &str,
) -> Rephrased {
    let Some(rephraser) = rephraser else {
        return Rephrased::kept(answer, Fallback::NotConfigured);
    };

    if is_bare_number(answer) {
        return Rephrased::kept(answer, Fallback::BareNumber);
    }

    let candidate = match rephraser.rephrase(question, answer) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::warn!(model = rephraser.model_name(), error = %e, "Rephrasing failed, using deterministic answer");
            return Rephrased::kept(answer, Fallback::Failed);
        }
    };

    if candidate.is_empty() {
        tracing::warn!(model = rephraser.model_name(), "Rephraser returned empty output");
        return Rephrased::kept(answer, Fallback::EmptyOutput);
    }

    if numbers(&candidate) != numbers(answer) {
        tracing::warn!(
            model = rephraser.model_name(),
            rephrased = %candidate,
            "Rephrased answer changed the numbers, discarding it"
        );
        return Rephrased::kept(answer, Fallback::NumbersChanged);
    }

    Rephrased {
        text: candidate,
        rephrased: true,
        fallback: None,
    }
}

fn is_bare_number(answer: &str) -> bool {
    let trimmed = answer.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

/// Numbers as written, with leading zeros and thousands separators ignored
fn numbers(text: &str) -> BTreeSet<String> {
    let cleaned = text.replace(',', "");
    NUMBER
        .find_iter(&cleaned)
        .map(|m| match m.as_str().split_once('.') {
            Some((whole, frac)) => format!("{}.{}", normalize(whole), frac),
            None => normalize(m.as_str()),
        })
        .collect()
}

fn normalize(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
