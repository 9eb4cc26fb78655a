//! Time expression parsing
//!
//! Recognises calendar periods in a question and maps each one to a
//! half-open `[start, end)` range of timestamps. Patterns are tried from the
//! most specific to the least specific; every matched span is blanked out so
//! that, for example, the year inside "first half of 2024" is not read again
//! as a bare year.

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use crate::intent::WORK_ORDER_REF;

const MONTH: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
const YEAR: &str = r"(?:19|20)\d{2}";

// ============================================================================
// Regex Patterns
// ============================================================================

static HALF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(?:(first|1st|second|2nd)\s+half|h([12]))(?:\s+(?:of\s+)?({YEAR}))?\b"
    ))
    .expect("Invalid regex")
});

static QUARTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(?:q([1-4])|(first|1st|second|2nd|third|3rd|fourth|4th)\s+quarter)(?:\s+(?:of\s+)?({YEAR}))?\b"
    ))
    .expect("Invalid regex")
});

static MONTH_SPAN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(?:between|from)\s+({MONTH})(?:\s+({YEAR}))?(?:\s+(?:and|to|through|thru|until|till)\s+|\s*-\s*)({MONTH})(?:\s+(?:of\s+)?({YEAR}))?\b"
    ))
    .expect("Invalid regex")
});

static MONTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({MONTH})(?:\s+(?:of\s+)?({YEAR}))?\b")).expect("Invalid regex")
});

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b({YEAR})\b")).expect("Invalid regex"));

// ============================================================================
// Types
// ============================================================================

/// Half-open range of start timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound
    pub start: NaiveDateTime,
    /// Exclusive upper bound
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Outcome of scanning a question for time expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeParse {
    /// No time expression found
    NotMentioned,

    /// Exactly one period was recognised
    Resolved { range: TimeRange, phrase: String },

    /// A period was recognised but its year could not be determined
    Unresolved { phrase: String },

    /// Several different periods were mentioned
    Ambiguous { phrases: Vec<String> },
}

impl TimeParse {
    pub fn range(&self) -> Option<TimeRange> {
        match self {
            TimeParse::Resolved { range, .. } => Some(*range),
            _ => None,
        }
    }

    /// Explanation of why no range was produced
    pub fn note(&self) -> Option<String> {
        match self {
            TimeParse::NotMentioned | TimeParse::Resolved { .. } => None,
            TimeParse::Unresolved { phrase } => Some(format!(
                "time phrase '{}' has no year and the dataset has no default year; ignored",
                phrase
            )),
            TimeParse::Ambiguous { phrases } => Some(format!(
                "several periods mentioned ({}); no time constraint applied",
                phrases.join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Half(u32, Option<i32>),
    Quarter(u32, Option<i32>),
    Months {
        from: (u32, Option<i32>),
        to: (u32, Option<i32>),
    },
    Month(u32, Option<i32>),
    Year(i32),
}

impl Period {
    fn is_yearless(&self) -> bool {
        match *self {
            Period::Half(_, y) | Period::Quarter(_, y) | Period::Month(_, y) => y.is_none(),
            Period::Months { from, to } => from.1.is_none() && to.1.is_none(),
            Period::Year(_) => false,
        }
    }

    fn with_year(self, year: i32) -> Self {
        match self {
            Period::Half(h, None) => Period::Half(h, Some(year)),
            Period::Quarter(q, None) => Period::Quarter(q, Some(year)),
            Period::Month(m, None) => Period::Month(m, Some(year)),
            Period::Months { from, to } if from.1.is_none() && to.1.is_none() => Period::Months {
                from,
                to: (to.0, Some(year)),
            },
            other => other,
        }
    }

    fn resolve(&self, default_year: Option<i32>) -> Option<TimeRange> {
        match *self {
            Period::Half(h, y) => months(y.or(default_year)?, (h - 1) * 6 + 1, 6),
            Period::Quarter(q, y) => months(y.or(default_year)?, (q - 1) * 3 + 1, 3),
            Period::Month(m, y) => months(y.or(default_year)?, m, 1),
            Period::Year(y) => months(y, 1, 12),
            Period::Months { from, to } => {
                let (from_m, to_m) = (from.0, to.0);
                let wraps = to_m < from_m;
                let (from_y, to_y) = match (from.1, to.1) {
                    (Some(a), Some(b)) => (a, b),
                    (Some(a), None) => (a, if wraps { a + 1 } else { a }),
                    (None, Some(b)) => (if wraps { b - 1 } else { b }, b),
                    (None, None) => {
                        let d = default_year?;
                        (d, if wraps { d + 1 } else { d })
                    }
                };
                let start = month_start(from_y, from_m)?;
                let end = months(to_y, to_m, 1)?.end;
                (end > start).then_some(TimeRange { start, end })
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Mention {
    phrase: String,
    period: Period,
}

// ============================================================================
// Parsing
// ============================================================================

/// Find the calendar period a question refers to
///
/// A period without a year borrows a lone bare year mentioned elsewhere in
/// the question, then falls back to `default_year`.
pub fn parse_time_range(question: &str, default_year: Option<i32>) -> TimeParse {
    let mut text = question.to_lowercase();

    // "work order 2024" is an identifier, not a year
    let refs: Vec<Range<usize>> = WORK_ORDER_REF.find_iter(&text).map(|m| m.range()).collect();
    for span in refs {
        blank(&mut text, span);
    }

    let mut mentions = Vec::new();

    take(&mut text, &HALF_PATTERN, &mut mentions, |caps, _| {
        let half = match caps.get(1).map(|m| m.as_str()) {
            Some(word) => ordinal(word)?,
            None => caps.get(2)?.as_str().parse().ok()?,
        };
        Some(Period::Half(half, year_at(caps, 3)))
    });

    take(&mut text, &QUARTER_PATTERN, &mut mentions, |caps, _| {
        let quarter = match caps.get(1) {
            Some(digit) => digit.as_str().parse().ok()?,
            None => ordinal(caps.get(2)?.as_str())?,
        };
        Some(Period::Quarter(quarter, year_at(caps, 3)))
    });

    take(&mut text, &MONTH_SPAN_PATTERN, &mut mentions, |caps, _| {
        let from = (month_number(caps.get(1)?.as_str())?, year_at(caps, 2));
        let to = (month_number(caps.get(3)?.as_str())?, year_at(caps, 4));
        Some(Period::Months { from, to })
    });

    take(&mut text, &MONTH_PATTERN, &mut mentions, |caps, prefix| {
        let word = caps.get(1)?.as_str();
        let year = year_at(caps, 2);
        if word == "may" && year.is_none() && !preceded_by_month_cue(prefix) {
            return None;
        }
        Some(Period::Month(month_number(word)?, year))
    });

    take(&mut text, &YEAR_PATTERN, &mut mentions, |caps, _| {
        Some(Period::Year(year_at(caps, 1)?))
    });

    let mentions = borrow_lone_year(mentions);
    settle(mentions, default_year)
}

fn settle(mentions: Vec<Mention>, default_year: Option<i32>) -> TimeParse {
    if mentions.is_empty() {
        return TimeParse::NotMentioned;
    }

    let resolved: Vec<Option<TimeRange>> =
        mentions.iter().map(|m| m.period.resolve(default_year)).collect();
    let distinct: BTreeSet<TimeRange> = resolved.iter().flatten().copied().collect();
    let any_unresolved = resolved.iter().any(Option::is_none);

    match (distinct.first(), distinct.len(), any_unresolved) {
        (None, _, _) => TimeParse::Unresolved {
            phrase: mentions[0].phrase.clone(),
        },
        (Some(range), 1, false) => TimeParse::Resolved {
            range: *range,
            phrase: mentions[0].phrase.clone(),
        },
        _ => {
            let phrases: Vec<String> = mentions.into_iter().map(|m| m.phrase).collect();
            tracing::debug!(?phrases, "Ambiguous time expressions");
            TimeParse::Ambiguous { phrases }
        }
    }
}

/// Give a yearless period the year mentioned elsewhere in the question
fn borrow_lone_year(mentions: Vec<Mention>) -> Vec<Mention> {
    let years: Vec<i32> = mentions
        .iter()
        .filter_map(|m| match m.period {
            Period::Year(y) => Some(y),
            _ => None,
        })
        .collect();
    let has_yearless = mentions.iter().any(|m| m.period.is_yearless());

    if years.len() != 1 || !has_yearless {
        return mentions;
    }

    let year = years[0];
    mentions
        .into_iter()
        .filter(|m| !matches!(m.period, Period::Year(_)))
        .map(|m| Mention {
            phrase: format!("{} {}", m.phrase, year),
            period: m.period.with_year(year),
        })
        .collect()
}

fn take<F>(text: &mut String, pattern: &Regex, mentions: &mut Vec<Mention>, mut to_period: F)
where
    F: FnMut(&Captures<'_>, &str) -> Option<Period>,
{
    let mut spans = Vec::new();
    for caps in pattern.captures_iter(text.as_str()) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(period) = to_period(&caps, &text[..whole.start()]) {
            mentions.push(Mention {
                phrase: whole.as_str().trim().to_string(),
                period,
            });
            spans.push(whole.range());
        }
    }
    for span in spans {
        blank(text, span);
    }
}

/// Replace a span with spaces, keeping byte offsets stable
fn blank(text: &mut String, span: Range<usize>) {
    let width = span.len();
    text.replace_range(span, &" ".repeat(width));
}

fn preceded_by_month_cue(prefix: &str) -> bool {
    prefix
        .split_whitespace()
        .last()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .is_some_and(|w| matches!(w, "in" | "during" | "of"))
}

fn year_at(caps: &Captures<'_>, index: usize) -> Option<i32> {
    caps.get(index).and_then(|m| m.as_str().parse().ok())
}

fn ordinal(word: &str) -> Option<u32> {
    match word {
        "first" | "1st" => Some(1),
        "second" | "2nd" => Some(2),
        "third" | "3rd" => Some(3),
        "fourth" | "4th" => Some(4),
        _ => None,
    }
}

fn month_number(word: &str) -> Option<u32> {
    let month = match word.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn month_start(year: i32, month: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

/// `count` whole months starting at `first_month` of `year`
fn months(year: i32, first_month: u32, count: u32) -> Option<TimeRange> {
    let start = month_start(year, first_month)?;
    let offset = first_month - 1 + count;
    let end = month_start(year + (offset / 12) as i32, offset % 12 + 1)?;
    Some(TimeRange { start, end })
}
