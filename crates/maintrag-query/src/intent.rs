//! Rule-based intent classification
//!
//! Rules are evaluated in a fixed order and the first match wins. The
//! classifier looks at the question text only, never at conversation state.

use maintrag_core::models::{CountUnit, Dimension, Intent, WorkOrderId};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

// ============================================================================
// Regex Patterns
// ============================================================================

/// Reference to a single work order ("work order 1042", "WO #1042", "ticket 1042")
pub(crate) static WORK_ORDER_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:work[\s-]*orders?|wo|tickets?)\s*(?:#|no\.?|number|id)?\s*:?\s*#?|#)\s*(\d{1,18})\b")
        .expect("Invalid regex")
});

static COUNT_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:how\s+many|number\s+of|count(?:s|ed)?|total)\b").expect("Invalid regex")
});

static MENTION_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:mention(?:s|ed|ing)?|contain(?:s|ed|ing)?)\b").expect("Invalid regex")
});

static LISTING_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:list|show|find|display|give\s+me|which\s+(?:work[\s-]*orders?|incidents?|tickets?|records?|entries)|what\s+(?:work[\s-]*orders?|incidents?|tickets?))\b",
    )
    .expect("Invalid regex")
});

static WORK_ORDER_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:incidents?|work[\s-]*orders?|tickets?|jobs?)\b").expect("Invalid regex")
});

static DISTINCT_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:different|distinct|unique)\b").expect("Invalid regex"));

static RANKING_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:most|top|busiest|highest|leading|worst|rank(?:ed|ing|ings)?|breakdown\s+by|broken\s+down\s+by)\b",
    )
    .expect("Invalid regex")
});

static SUPERLATIVE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:most|busiest|highest|leading|worst)\b").expect("Invalid regex")
});

static TOP_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btop\s+(\d{1,3}|one|two|three|four|five|six|seven|eight|nine|ten)\b")
        .expect("Invalid regex")
});

static TREND_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:trends?|trending|over\s+time|per\s+month|by\s+month|each\s+month|month\s+by\s+month|monthly)\b",
    )
    .expect("Invalid regex")
});

static TECHNICIAN_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:technicians?|techs?|mechanics?|who)\b").expect("Invalid regex")
});

static EQUIPMENT_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:equipment|equipments|machines?|assets?|devices?)\b").expect("Invalid regex")
});

static SYMPTOM_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:symptoms?|failure\s+modes?|faults?|issues?|problems?)\b")
        .expect("Invalid regex")
});

static PRODUCT_LINE_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:product\s+lines?|production\s+lines?)\b").expect("Invalid regex")
});

/// Counting cue directly followed by a dimension noun ("how many technicians")
static COUNTED_DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:how\s+many|number\s+of)\s+(?:(?:different|distinct|unique)\s+)?(technicians?|techs?|mechanics?|equipment|equipments|machines?|assets?|devices?|symptoms?|symptom\s+codes?|failure\s+modes?|product\s+lines?|production\s+lines?)\b",
    )
    .expect("Invalid regex")
});

/// Bare dimension question ("what about technicians?")
static WHAT_ABOUT_DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:and\s+)?(?:what|how)\s+about\s+(?:the\s+)?(?:(?:different|distinct|unique)\s+)?(technicians?|techs?|mechanics?|equipment|equipments|machines?|assets?|devices?|symptoms?|symptom\s+codes?|failure\s+modes?|product\s+lines?|production\s+lines?)\s*\??\s*$",
    )
    .expect("Invalid regex")
});

// ============================================================================
// Classification
// ============================================================================

/// Result of classifying one question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub intent: Intent,

    /// Name of the rule that fired
    pub rule: &'static str,

    /// True when no rule matched and the generic intent was chosen
    pub fallback: bool,
}

impl Classification {
    fn matched(intent: Intent, rule: &'static str) -> Self {
        Self {
            intent,
            rule,
            fallback: false,
        }
    }
}

/// Classify a question into exactly one intent
pub fn classify(question: &str) -> Classification {
    let q = question.trim();
    let counting = COUNT_CUE.is_match(q);

    // 1. Single work order lookup
    if !counting {
        if let Some(id) = work_order_reference(q) {
            return Classification::matched(
                Intent::DetailLookup { work_order_id: id },
                "detail_lookup",
            );
        }
    }

    // 2. Keyword mention count
    if MENTION_TRIGGER.is_match(q) && !LISTING_CUE.is_match(q) {
        let unit = if WORK_ORDER_UNIT.is_match(q) {
            CountUnit::WorkOrders
        } else {
            CountUnit::Rows
        };
        return Classification::matched(Intent::KeywordMentionCount { unit }, "keyword_mention_count");
    }

    // 3. Distinct count
    if let Some(dimension) = counted_dimension(q) {
        return Classification::matched(Intent::DistinctCount { dimension }, "distinct_count");
    }
    if counting && DISTINCT_CUE.is_match(q) {
        if let Some(dimension) = earliest_dimension(q, true) {
            return Classification::matched(Intent::DistinctCount { dimension }, "distinct_count");
        }
    }

    // 4. Ranking
    if RANKING_CUE.is_match(q) {
        if let Some(dimension) = earliest_dimension(q, false) {
            let limit = ranking_limit(q);
            let intent = match dimension {
                Dimension::Technician => Intent::RankTechnician { limit },
                Dimension::Symptom => Intent::AggregateSymptom { limit },
                _ => Intent::RankEquipment { limit },
            };
            return Classification::matched(intent, "ranking");
        }
    }

    // 5. Trend
    if TREND_CUE.is_match(q) {
        return Classification::matched(Intent::IncidentTrend, "incident_trend");
    }

    // 6. Incident count
    if counting {
        return Classification::matched(Intent::CountIncidents, "count_incidents");
    }

    // 7. Explicit listing
    if LISTING_CUE.is_match(q) {
        return Classification::matched(Intent::ListMatches, "list_matches");
    }

    tracing::debug!(question = q, "No intent rule matched; using list fallback");
    Classification {
        intent: Intent::ListMatches,
        rule: "fallback",
        fallback: true,
    }
}

/// Work order identifier referenced by the question, if any
pub fn work_order_reference(question: &str) -> Option<WorkOrderId> {
    WORK_ORDER_REF
        .captures(question)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .map(WorkOrderId)
}

/// Dimension noun mentioned first in the question
///
/// Product lines only count for distinct counts; rankings cover technicians,
/// equipment and symptoms.
fn earliest_dimension(question: &str, allow_product_line: bool) -> Option<Dimension> {
    let mut candidates = vec![
        (&TECHNICIAN_NOUN, Dimension::Technician),
        (&EQUIPMENT_NOUN, Dimension::Equipment),
        (&SYMPTOM_NOUN, Dimension::Symptom),
    ];
    if allow_product_line {
        candidates.push((&PRODUCT_LINE_NOUN, Dimension::ProductLine));
    }

    candidates
        .into_iter()
        .filter_map(|(pattern, dimension)| pattern.find(question).map(|m| (m.start(), dimension)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, dimension)| dimension)
}

/// Dimension a question counts directly, or asks about on its own
fn counted_dimension(question: &str) -> Option<Dimension> {
    let caps = COUNTED_DIMENSION
        .captures(question)
        .or_else(|| WHAT_ABOUT_DIMENSION.captures(question))?;
    let noun = caps.get(1)?.as_str().to_lowercase();
    earliest_dimension(&noun, true)
}

fn ranking_limit(question: &str) -> Option<usize> {
    if let Some(caps) = TOP_N.captures(question) {
        let raw = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
        let n = match raw.as_str() {
            "one" => Some(1),
            "two" => Some(2),
            "three" => Some(3),
            "four" => Some(4),
            "five" => Some(5),
            "six" => Some(6),
            "seven" => Some(7),
            "eight" => Some(8),
            "nine" => Some(9),
            "ten" => Some(10),
            digits => digits.parse().ok(),
        };
        return n.filter(|n| *n > 0);
    }
    SUPERLATIVE_CUE.is_match(question).then_some(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_of(q: &str) -> Intent {
        classify(q).intent
    }

    #[test]
    fn test_detail_lookup() {
        assert_eq!(
            intent_of("Tell me about work order 1042"),
            Intent::DetailLookup {
                work_order_id: WorkOrderId(1042)
            }
        );
        assert_eq!(
            intent_of("What happened on WO #17?"),
            Intent::DetailLookup {
                work_order_id: WorkOrderId(17)
            }
        );
        assert_eq!(
            intent_of("ticket 88 details"),
            Intent::DetailLookup {
                work_order_id: WorkOrderId(88)
            }
        );
    }

    #[test]
    fn test_counting_cue_blocks_detail_lookup() {
        assert_eq!(intent_of("How many work orders 1042 rows are there?"), Intent::CountIncidents);
    }

    #[test]
    fn test_keyword_mention_units() {
        assert_eq!(
            intent_of("How many work orders mention leak?"),
            Intent::KeywordMentionCount {
                unit: CountUnit::WorkOrders
            }
        );
        assert_eq!(
            intent_of("How many records mention 'bearing'?"),
            Intent::KeywordMentionCount {
                unit: CountUnit::Rows
            }
        );
    }

    #[test]
    fn test_listing_cue_turns_mentions_into_list() {
        let c = classify("Which work orders mention leak?");
        assert_eq!(c.intent, Intent::ListMatches);
        assert_eq!(c.rule, "list_matches");
        assert!(!c.fallback);
    }

    #[test]
    fn test_distinct_counts() {
        assert_eq!(
            intent_of("How many different technicians worked on it?"),
            Intent::DistinctCount {
                dimension: Dimension::Technician
            }
        );
        assert_eq!(
            intent_of("Number of distinct machines in Q3 2024"),
            Intent::DistinctCount {
                dimension: Dimension::Equipment
            }
        );
        assert_eq!(
            intent_of("How many unique product lines are there?"),
            Intent::DistinctCount {
                dimension: Dimension::ProductLine
            }
        );
    }

    #[test]
    fn test_rankings() {
        assert_eq!(
            intent_of("Which technician handled the most work orders?"),
            Intent::RankTechnician { limit: Some(1) }
        );
        assert_eq!(
            intent_of("Which equipment has the most incidents?"),
            Intent::RankEquipment { limit: Some(1) }
        );
        assert_eq!(
            intent_of("What is the most common symptom?"),
            Intent::AggregateSymptom { limit: Some(1) }
        );
        assert_eq!(
            intent_of("top 3 machines in 2024"),
            Intent::RankEquipment { limit: Some(3) }
        );
        assert_eq!(
            intent_of("Show the top five technicians"),
            Intent::RankTechnician { limit: Some(5) }
        );
        assert_eq!(
            intent_of("breakdown by symptom for PRESS-01"),
            Intent::AggregateSymptom { limit: None }
        );
    }

    #[test]
    fn test_ranked_dimension_is_earliest_noun() {
        assert_eq!(
            intent_of("Which technician fixed the most machines?"),
            Intent::RankTechnician { limit: Some(1) }
        );
        assert_eq!(
            intent_of("Which machine had the most technicians?"),
            Intent::RankEquipment { limit: Some(1) }
        );
    }

    #[test]
    fn test_trend_and_counts() {
        assert_eq!(intent_of("Show the monthly incident trend for CNC-01"), Intent::IncidentTrend);
        assert_eq!(intent_of("How many incidents per month in 2024?"), Intent::IncidentTrend);
        assert_eq!(intent_of("How many incidents were there on PRESS-01?"), Intent::CountIncidents);
        assert_eq!(intent_of("Count the HYDRAULIC_LEAK work orders"), Intent::CountIncidents);
    }

    #[test]
    fn test_counted_dimension_without_distinct_cue() {
        assert_eq!(
            intent_of("How many technicians worked on PRESS-01?"),
            Intent::DistinctCount {
                dimension: Dimension::Technician
            }
        );
        assert_eq!(
            intent_of("How many machines had incidents in July 2024?"),
            Intent::DistinctCount {
                dimension: Dimension::Equipment
            }
        );
        assert_eq!(
            intent_of("number of symptom codes seen on CNC-01"),
            Intent::DistinctCount {
                dimension: Dimension::Symptom
            }
        );
        // Incident nouns still count work orders
        assert_eq!(intent_of("How many incidents did the technicians log?"), Intent::CountIncidents);
        assert_eq!(intent_of("How many problems on PRESS-01?"), Intent::CountIncidents);
    }

    #[test]
    fn test_what_about_dimension() {
        let c = classify("What about technicians?");
        assert_eq!(
            c.intent,
            Intent::DistinctCount {
                dimension: Dimension::Technician
            }
        );
        assert_eq!(c.rule, "distinct_count");
        assert_eq!(
            intent_of("and how about the product lines"),
            Intent::DistinctCount {
                dimension: Dimension::ProductLine
            }
        );
    }

    #[test]
    fn test_fallback() {
        let c = classify("What about CNC-01?");
        assert_eq!(c.intent, Intent::ListMatches);
        assert!(c.fallback);
        assert_eq!(c.rule, "fallback");
    }

    #[test]
    fn test_follow_up_without_cue_is_fallback() {
        // Classification never looks at earlier turns
        let c = classify("And in July 2024?");
        assert_eq!(c.intent, Intent::ListMatches);
        assert!(c.fallback);
    }

    #[test]
    fn test_top_zero_is_ignored() {
        assert_eq!(ranking_limit("top 0 machines"), None);
        assert_eq!(ranking_limit("rank the machines"), None);
    }
}
