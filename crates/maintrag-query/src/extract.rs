//! Filter extraction
//!
//! Pulls categorical values, a free-text keyword and a time range out of a
//! question. Extraction never fails: anything that cannot be resolved is
//! simply left unset.

use maintrag_core::models::{ConversationContext, Dimension, FilterSpec};
use maintrag_core::Catalog;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::time_range::{parse_time_range, TimeParse};

/// Follow-ups are short; longer questions must carry an explicit cue
const FOLLOW_UP_MAX_WORDS: usize = 7;

/// Longest keyword phrase taken after a trigger
const KEYWORD_MAX_WORDS: usize = 3;

// ============================================================================
// Regex Patterns
// ============================================================================

static QUOTED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[^\w])["'\x{201C}\x{2018}]([^"'\x{201C}\x{201D}\x{2018}\x{2019}]+)["'\x{201D}\x{2019}]"#)
        .expect("Invalid regex")
});

static KEYWORD_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(mention(?:s|ed|ing)?|contain(?:s|ed|ing)?|about|related\s+to|referring\s+to|regarding)\b",
    )
    .expect("Invalid regex")
});

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}_\-]*|\S").expect("Invalid regex"));

static FOLLOW_UP_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:what\s+about|how\s+about|and)\b").expect("Invalid regex"));

static PRONOUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:it|its|them|those|same)\b").expect("Invalid regex"));

static PRONOUN_AFTER_PREPOSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:on|for|of|in|with|to|about|from|at|by)\s+(?:that|this|there|these)\b")
        .expect("Invalid regex")
});

static CONTINUATION_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:also|too|instead|then)\b").expect("Invalid regex"));

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "any", "some", "word", "words", "term", "terms", "keyword", "phrase", "text",
];

const PHRASE_STOPS: &[&str] = &[
    "in", "on", "at", "for", "from", "during", "between", "since", "by", "of", "with", "to",
    "before", "after", "over", "under", "per", "within", "across", "into", "and", "or", "but",
    "than", "is", "are", "was", "were", "has", "have", "had", "do", "does", "did", "this", "that",
    "these", "those", "last", "past", "which", "who", "when", "where", "how", "what", "month",
    "months", "year", "years", "quarter", "week", "weeks", "today", "yesterday", "first", "second",
    "1st", "2nd", "half", "q1", "q2", "q3", "q4", "h1", "h2",
];

const MONTH_WORDS: &[&str] = &[
    "jan", "january", "feb", "february", "mar", "march", "apr", "april", "may", "jun", "june",
    "jul", "july", "aug", "august", "sep", "sept", "september", "oct", "october", "nov",
    "november", "dec", "december",
];

/// Words that refer to something other than free text
const NON_KEYWORD_HEADS: &[&str] =
    &["work", "wo", "ticket", "it", "them", "those", "there", "this", "that"];

// ============================================================================
// Extraction
// ============================================================================

/// Filters extracted from one question
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Filters to apply, after any inheritance from the context
    pub filters: FilterSpec,

    /// Whether the question was judged a follow-up of the previous turn
    pub follow_up: bool,

    /// Human-readable remarks about unresolved or inherited parts
    pub notes: Vec<String>,
}

/// Extract structured filters from a question
pub fn extract_filters(
    question: &str,
    catalog: &Catalog,
    context: &ConversationContext,
) -> Extraction {
    let lower = question.to_lowercase();
    let mut notes = Vec::new();

    let keyword = extract_keyword(&lower, catalog);
    let mut scope = lower.clone();
    if let Some(found) = &keyword {
        scope.replace_range(found.span.clone(), &" ".repeat(found.span.len()));
    }

    let mut fresh = FilterSpec {
        equipment_id: match_entity(&scope, catalog.values(Dimension::Equipment)),
        product_line: match_entity(&scope, catalog.values(Dimension::ProductLine)),
        symptom_code: match_entity(&scope, catalog.values(Dimension::Symptom)),
        technician: match_entity(&scope, catalog.values(Dimension::Technician)),
        keyword: keyword.map(|k| k.text),
        ..FilterSpec::default()
    };

    match parse_time_range(&scope, catalog.default_year) {
        TimeParse::Resolved { range, phrase } => {
            tracing::debug!(%phrase, start = %range.start, end = %range.end, "Resolved time range");
            fresh.start_ts_min = Some(range.start);
            fresh.start_ts_max = Some(range.end);
        }
        unresolved => {
            if let Some(note) = unresolved.note() {
                tracing::debug!(%note, "Time expression ignored");
                notes.push(note);
            }
        }
    }

    let follow_up = !context.is_fresh() && looks_like_follow_up(&lower, &fresh);
    let filters = if follow_up {
        let merged = fresh.clone().merged_over(&context.filters);
        notes.extend(inherited_notes(&fresh, &merged));
        merged
    } else {
        fresh
    };

    Extraction {
        filters,
        follow_up,
        notes,
    }
}

/// Whether a question continues the previous one
///
/// A question counts as a follow-up when it opens with "what about",
/// "how about" or "and", refers back with a pronoun, uses a continuation
/// cue, or is short and names no constraint of its own.
pub fn looks_like_follow_up(lower: &str, fresh: &FilterSpec) -> bool {
    if FOLLOW_UP_OPENER.is_match(lower)
        || PRONOUN.is_match(lower)
        || PRONOUN_AFTER_PREPOSITION.is_match(lower)
        || CONTINUATION_CUE.is_match(lower)
    {
        return true;
    }
    lower.split_whitespace().count() <= FOLLOW_UP_MAX_WORDS && fresh.is_empty()
}

fn inherited_notes(fresh: &FilterSpec, merged: &FilterSpec) -> Vec<String> {
    let fields = [
        ("equipment_id", &fresh.equipment_id, &merged.equipment_id),
        ("product_line", &fresh.product_line, &merged.product_line),
        ("symptom_code", &fresh.symptom_code, &merged.symptom_code),
        ("technician", &fresh.technician, &merged.technician),
        ("keyword", &fresh.keyword, &merged.keyword),
    ];

    let mut notes: Vec<String> = fields
        .iter()
        .filter_map(|(name, before, after)| match (before, after) {
            (None, Some(value)) => Some(format!("{}={} carried over from the previous question", name, value)),
            _ => None,
        })
        .collect();

    if !fresh.has_time_range() && merged.has_time_range() {
        notes.push("time range carried over from the previous question".to_string());
    }
    notes
}

// ============================================================================
// Keywords
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeywordSpan {
    /// Normalized keyword
    text: String,
    /// Byte range of the phrase in the lowercased question
    span: Range<usize>,
}

fn extract_keyword(lower: &str, catalog: &Catalog) -> Option<KeywordSpan> {
    if let Some(caps) = QUOTED_PHRASE.captures(lower) {
        if let Some(inner) = caps.get(1) {
            let text = inner.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                return Some(KeywordSpan {
                    text,
                    span: inner.range(),
                });
            }
        }
    }

    for caps in KEYWORD_TRIGGER.captures_iter(lower) {
        let Some(trigger) = caps.get(1) else { continue };
        let trigger_word = trigger.as_str();

        if trigger_word == "about" && is_continuation_about(&lower[..trigger.start()]) {
            continue;
        }

        let Some(found) = phrase_after(lower, trigger.end()) else { continue };

        let first_word = found.text.split(' ').next().unwrap_or_default();
        if NON_KEYWORD_HEADS.contains(&first_word) {
            continue;
        }

        // "related to PRESS-01" names an entity; "mentions hydraulic leak" asks for text
        let textual_trigger =
            trigger_word.starts_with("mention") || trigger_word.starts_with("contain");
        if !textual_trigger && names_catalog_value(&found.text, catalog) {
            continue;
        }

        return Some(found);
    }

    None
}

fn is_continuation_about(prefix: &str) -> bool {
    matches!(prefix.split_whitespace().last(), Some("what") | Some("how"))
}

/// Salient phrase following a keyword trigger
fn phrase_after(lower: &str, offset: usize) -> Option<KeywordSpan> {
    let mut words: Vec<Range<usize>> = Vec::new();

    for token in TOKEN.find_iter(&lower[offset..]) {
        let word = token.as_str();
        let is_word = word.chars().next().is_some_and(char::is_alphanumeric);
        if !is_word {
            break;
        }
        if words.is_empty() && DETERMINERS.contains(&word) {
            continue;
        }
        if is_phrase_stop(word) {
            break;
        }
        words.push(offset + token.start()..offset + token.end());
        if words.len() == KEYWORD_MAX_WORDS {
            break;
        }
    }

    let span = words.first()?.start..words.last()?.end;
    let mut parts: Vec<&str> = words.iter().map(|r| &lower[r.clone()]).collect();
    if let Some(last) = parts.last_mut() {
        *last = trim_plural(*last);
    }

    Some(KeywordSpan {
        text: parts.join(" "),
        span,
    })
}

fn is_phrase_stop(word: &str) -> bool {
    PHRASE_STOPS.contains(&word)
        || MONTH_WORDS.contains(&word)
        || (word.len() == 4 && word.chars().all(|c| c.is_ascii_digit()))
}

fn trim_plural(word: &str) -> &str {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        &word[..word.len() - 1]
    } else {
        word
    }
}

fn names_catalog_value(phrase: &str, catalog: &Catalog) -> bool {
    [
        Dimension::Equipment,
        Dimension::ProductLine,
        Dimension::Symptom,
        Dimension::Technician,
    ]
    .iter()
    .flat_map(|d| catalog.values(*d))
    .any(|value| aliases(value).iter().any(|alias| alias == phrase))
}

// ============================================================================
// Categorical entities
// ============================================================================

/// Known value mentioned in the text, preferring the longest match
fn match_entity(text: &str, values: &[String]) -> Option<String> {
    let haystack = text.split_whitespace().collect::<Vec<_>>().join(" ");

    values
        .iter()
        .filter_map(|value| {
            aliases(value)
                .into_iter()
                .filter(|alias| contains_word(&haystack, alias))
                .map(|alias| alias.len())
                .max()
                .map(|len| (len, value))
        })
        // Longest alias wins; on equal length the first value in catalog order
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))
        .map(|(_, value)| value.clone())
}

/// Lowercased spellings a question may use for a catalog value
///
/// `HYDRAULIC_LEAK` is matched as "hydraulic_leak", "hydraulic leak" and
/// "hydraulicleak"; `PRESS-01` as "press-01", "press 01" and "press01".
pub fn aliases(value: &str) -> Vec<String> {
    let lower = value.trim().to_lowercase();
    let spaced = lower
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let compact: String = lower
        .chars()
        .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
        .collect();

    let mut out = vec![lower, spaced, compact];
    out.retain(|alias| alias.chars().count() >= 2);
    out.sort();
    out.dedup();
    out
}

/// Substring match that respects word boundaries on both sides
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use maintrag_core::models::Intent;

    fn catalog() -> Catalog {
        Catalog {
            equipment: vec!["CNC-01".into(), "CNC-010".into(), "PRESS-01".into(), "PRESS-02".into()],
            product_lines: vec!["Machining".into(), "Stamping".into()],
            symptoms: vec![
                "BEARING_WEAR".into(),
                "HYDRAULIC_LEAK".into(),
                "SPINDLE_TIMEOUT".into(),
            ],
            technicians: vec!["Alice Martin".into(), "Bob Chen".into()],
            default_year: Some(2024),
        }
    }

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn fresh(q: &str) -> FilterSpec {
        extract_filters(q, &catalog(), &ConversationContext::new()).filters
    }

    #[test]
    fn test_aliases() {
        assert_eq!(aliases("HYDRAULIC_LEAK"), vec!["hydraulic leak", "hydraulic_leak", "hydraulicleak"]);
        assert_eq!(aliases("PRESS-01"), vec!["press 01", "press-01", "press01"]);
    }

    #[test]
    fn test_equipment_and_time() {
        let filters = fresh("How many incidents were there on PRESS-01 in July 2024?");
        assert_eq!(filters.equipment_id.as_deref(), Some("PRESS-01"));
        assert_eq!(filters.start_ts_min, Some(ts(2024, 7, 1)));
        assert_eq!(filters.start_ts_max, Some(ts(2024, 8, 1)));
        assert_eq!(filters.keyword, None);
    }

    #[test]
    fn test_entity_aliases_and_longest_match() {
        assert_eq!(fresh("incidents on press01").equipment_id.as_deref(), Some("PRESS-01"));
        assert_eq!(fresh("anything on cnc-010?").equipment_id.as_deref(), Some("CNC-010"));
        assert_eq!(fresh("how many hydraulic leak incidents").symptom_code.as_deref(), Some("HYDRAULIC_LEAK"));
        assert_eq!(fresh("what did bob chen fix").technician.as_deref(), Some("Bob Chen"));
        assert_eq!(fresh("stamping line incidents").product_line.as_deref(), Some("Stamping"));
    }

    #[test]
    fn test_word_boundaries() {
        assert_eq!(fresh("incidents on PRESS-012").equipment_id, None);
        assert_eq!(fresh("how many incidents in total").equipment_id, None);
    }

    #[test]
    fn test_keyword_after_trigger() {
        let filters = fresh("How many work orders mention leaks on PRESS-01?");
        assert_eq!(filters.keyword.as_deref(), Some("leak"));
        assert_eq!(filters.equipment_id.as_deref(), Some("PRESS-01"));

        assert_eq!(fresh("comments containing the word coolant").keyword.as_deref(), Some("coolant"));
        assert_eq!(
            fresh("Which work orders are about oil pressure drop in March?").keyword.as_deref(),
            Some("oil pressure drop")
        );
    }

    #[test]
    fn test_quoted_keyword_wins() {
        let filters = fresh("What's the count of rows mentioning 'Bearing noise' in 2024?");
        assert_eq!(filters.keyword.as_deref(), Some("bearing noise"));
        assert_eq!(filters.start_ts_min, Some(ts(2024, 1, 1)));
    }

    #[test]
    fn test_keyword_span_is_not_a_symptom() {
        let filters = fresh("How many rows mention hydraulic leak?");
        assert_eq!(filters.keyword.as_deref(), Some("hydraulic leak"));
        assert_eq!(filters.symptom_code, None);
    }

    #[test]
    fn test_related_to_entity_is_not_a_keyword() {
        let filters = fresh("Show incidents related to PRESS-02");
        assert_eq!(filters.keyword, None);
        assert_eq!(filters.equipment_id.as_deref(), Some("PRESS-02"));
    }

    #[test]
    fn test_what_about_is_not_a_keyword_trigger() {
        assert_eq!(fresh("What about CNC-01?").keyword, None);
    }

    #[test]
    fn test_follow_up_inherits_unmentioned_dimensions() {
        let context = ConversationContext::new().advance(
            FilterSpec::new()
                .with_equipment("PRESS-01")
                .with_time_range(ts(2024, 7, 1), ts(2024, 8, 1)),
            Intent::CountIncidents,
        );

        let extraction =
            extract_filters("How many different technicians worked on it?", &catalog(), &context);
        assert!(extraction.follow_up);
        assert_eq!(extraction.filters.equipment_id.as_deref(), Some("PRESS-01"));
        assert_eq!(extraction.filters.start_ts_min, Some(ts(2024, 7, 1)));
        assert!(!extraction.notes.is_empty());

        let extraction = extract_filters("What about CNC-01?", &catalog(), &context);
        assert!(extraction.follow_up);
        assert_eq!(extraction.filters.equipment_id.as_deref(), Some("CNC-01"));
        assert_eq!(extraction.filters.start_ts_max, Some(ts(2024, 8, 1)));
    }

    #[test]
    fn test_standalone_question_starts_fresh() {
        let context = ConversationContext::new()
            .advance(FilterSpec::new().with_equipment("PRESS-01"), Intent::CountIncidents);

        let extraction = extract_filters(
            "How many incidents were logged on CNC-01 during the second half of 2024?",
            &catalog(),
            &context,
        );

        assert!(!extraction.follow_up);
        assert_eq!(extraction.filters.equipment_id.as_deref(), Some("CNC-01"));
    }

    #[test]
    fn test_fresh_context_never_inherits() {
        let extraction = extract_filters("And then?", &catalog(), &ConversationContext::new());
        assert!(!extraction.follow_up);
        assert!(extraction.filters.is_empty());
    }

    #[test]
    fn test_ambiguous_time_adds_note() {
        let extraction = extract_filters(
            "incidents in March 2024 and Q4 2024",
            &catalog(),
            &ConversationContext::new(),
        );
        assert!(!extraction.filters.has_time_range());
        assert_eq!(extraction.notes.len(), 1);
    }
}
