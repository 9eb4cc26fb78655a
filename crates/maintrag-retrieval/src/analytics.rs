//! Deterministic aggregates over retrieved rows
//!
//! Every function here is pure: the same rows always produce the same
//! result, and empty input yields zero counts or empty rankings.

use chrono::{Datelike, Months, NaiveDate};
use maintrag_core::config::{DEFAULT_LIST_LIMIT, DEFAULT_TOP_N};
use maintrag_core::models::{
    AnalyticsResult, CountSubject, CountUnit, DetailEntry, Dimension, FilterSpec, Intent,
    MatchedWorkOrder, RankedEntry, TrendBucket, WorkOrderDetail, WorkOrderId, WorkOrderRow,
};
use maintrag_core::Dataset;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Longest snippet shown per work order in list answers
pub const SNIPPET_CHARS: usize = 160;

/// Points for each distinct keyword token found in a row
const TOKEN_POINTS: u32 = 2;

/// Extra points when the whole keyword phrase appears
const PHRASE_BONUS: u32 = 5;

/// Limits applied when an intent does not carry its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsOptions {
    /// Ranking length when the question names none
    pub top_n: usize,

    /// Work orders shown in list answers
    pub list_limit: usize,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Compute the result an intent asks for
///
/// `rows` is the filtered subset. Detail lookups ignore it and search the
/// whole dataset, since a work order is addressed by id alone.
pub fn run(
    intent: &Intent,
    rows: &[&WorkOrderRow],
    dataset: &Dataset,
    filters: &FilterSpec,
    options: &AnalyticsOptions,
) -> AnalyticsResult {
    match *intent {
        Intent::CountIncidents => AnalyticsResult::Count {
            value: count_incidents(rows),
            subject: CountSubject::Incidents,
        },
        Intent::RankEquipment { limit }
        | Intent::RankTechnician { limit }
        | Intent::AggregateSymptom { limit } => {
            let dimension = match intent {
                Intent::RankEquipment { .. } => Dimension::Equipment,
                Intent::RankTechnician { .. } => Dimension::Technician,
                _ => Dimension::Symptom,
            };
            rank_by(rows, dimension, limit.unwrap_or(options.top_n))
        }
        Intent::KeywordMentionCount { unit } => AnalyticsResult::Count {
            value: keyword_mention_count(rows, filters.keyword.as_deref(), unit),
            subject: CountSubject::Mentions {
                keyword: filters.keyword.clone(),
                unit,
            },
        },
        Intent::DistinctCount { dimension } => AnalyticsResult::Count {
            value: distinct_count(rows, dimension),
            subject: CountSubject::Distinct { dimension },
        },
        Intent::DetailLookup { work_order_id } => detail_lookup(dataset, work_order_id),
        Intent::IncidentTrend => AnalyticsResult::Trend {
            buckets: incident_trend(rows),
        },
        Intent::ListMatches => {
            let (items, total) = match filters.keyword.as_deref() {
                Some(keyword) => search_matches(rows, keyword, options.list_limit),
                None => list_matches(rows, options.list_limit),
            };
            AnalyticsResult::Matches { items, total }
        }
    }
}

/// Number of distinct work orders
pub fn count_incidents(rows: &[&WorkOrderRow]) -> usize {
    rows.iter().map(|r| r.work_order_id).collect::<BTreeSet<_>>().len()
}

/// Rank the values of a dimension by distinct work orders
///
/// Entries are sorted by count descending, then name ascending. The first
/// `limit` entries are kept, plus every entry tied with the last one kept.
/// Empty values are skipped.
pub fn rank_by(rows: &[&WorkOrderRow], dimension: Dimension, limit: usize) -> AnalyticsResult {
    let limit = limit.max(1);

    let mut groups: HashMap<&str, BTreeSet<WorkOrderId>> = HashMap::new();
    for row in rows {
        let value = row.value(dimension).trim();
        if value.is_empty() {
            continue;
        }
        groups.entry(value).or_default().insert(row.work_order_id);
    }

    let mut entries: Vec<RankedEntry> = groups
        .into_iter()
        .map(|(entity, ids)| RankedEntry {
            entity: entity.to_string(),
            count: ids.len(),
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.entity.cmp(&b.entity)));

    let groups = entries.len();
    if let Some(cutoff) = entries.get(limit.saturating_sub(1)).map(|e| e.count) {
        let keep = entries
            .iter()
            .enumerate()
            .take_while(|(i, e)| *i < limit || e.count == cutoff)
            .count();
        entries.truncate(keep);
    }

    AnalyticsResult::Ranking {
        dimension,
        entries,
        limit,
        groups,
    }
}

pub fn rank_equipment(rows: &[&WorkOrderRow], limit: usize) -> AnalyticsResult {
    rank_by(rows, Dimension::Equipment, limit)
}

pub fn rank_technician(rows: &[&WorkOrderRow], limit: usize) -> AnalyticsResult {
    rank_by(rows, Dimension::Technician, limit)
}

pub fn aggregate_symptom(rows: &[&WorkOrderRow], limit: usize) -> AnalyticsResult {
    rank_by(rows, Dimension::Symptom, limit)
}

/// Rows, or distinct work orders, whose text contains the keyword
pub fn keyword_mention_count(rows: &[&WorkOrderRow], keyword: Option<&str>, unit: CountUnit) -> usize {
    let Some(keyword) = keyword.map(str::to_lowercase).filter(|k| !k.is_empty()) else {
        return 0;
    };

    let mentioning = rows.iter().filter(|r| r.mentions(&keyword));
    match unit {
        CountUnit::Rows => mentioning.count(),
        CountUnit::WorkOrders => mentioning.map(|r| r.work_order_id).collect::<BTreeSet<_>>().len(),
    }
}

/// Distinct non-empty values of a dimension
pub fn distinct_count(rows: &[&WorkOrderRow], dimension: Dimension) -> usize {
    rows.iter()
        .map(|r| r.value(dimension).trim())
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Every log row of one work order, grouped into a single record
pub fn detail_lookup(dataset: &Dataset, work_order_id: WorkOrderId) -> AnalyticsResult {
    let mut rows = dataset.rows_for(work_order_id);
    if rows.is_empty() {
        return AnalyticsResult::NotFound { work_order_id };
    }
    // Stable sort keeps file order between rows with equal timestamps
    rows.sort_by_key(|r| r.start_timestamp);

    let first = rows[0];
    let mut technicians: Vec<String> = Vec::new();
    let mut entries: Vec<DetailEntry> = Vec::new();
    for row in &rows {
        let technician = row.technician.trim();
        if !technician.is_empty() && !technicians.iter().any(|t| t == technician) {
            technicians.push(technician.to_string());
        }

        let comment = row.comment.trim();
        if comment.is_empty() || entries.last().is_some_and(|e| e.comment == comment) {
            continue;
        }
        entries.push(DetailEntry {
            timestamp: row.start_timestamp,
            technician: technician.to_string(),
            comment: comment.to_string(),
        });
    }

    AnalyticsResult::Detail(WorkOrderDetail {
        work_order_id,
        equipment_id: first.equipment_id.clone(),
        product_line: first.product_line.clone(),
        symptom_code: first.symptom_code.clone(),
        description: first.description.clone(),
        opened: first.start_timestamp,
        closed: rows.iter().map(|r| r.end_timestamp).max().unwrap_or(first.end_timestamp),
        technicians,
        entries,
        row_count: rows.len(),
    })
}

/// Distinct work orders per calendar month, gaps included
///
/// A work order belongs to the month of its earliest start.
pub fn incident_trend(rows: &[&WorkOrderRow]) -> Vec<TrendBucket> {
    let mut opened: HashMap<WorkOrderId, NaiveDate> = HashMap::new();
    for row in rows {
        let day = row.start_timestamp.date();
        opened.entry(row.work_order_id).and_modify(|d| *d = (*d).min(day)).or_insert(day);
    }

    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for day in opened.values() {
        *counts.entry(month_of(*day)).or_default() += 1;
    }

    let (Some(first), Some(last)) = (counts.keys().next().copied(), counts.keys().last().copied())
    else {
        return Vec::new();
    };

    let mut buckets = Vec::new();
    let mut month = first;
    while month <= last {
        buckets.push(TrendBucket {
            month,
            count: counts.get(&month).copied().unwrap_or(0),
        });
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }
    buckets
}

/// Distinct work orders, most recent first, truncated to `limit`
///
/// Returns the shown items and the total before truncation. Each work order
/// is represented by its first row in dataset order.
pub fn list_matches(rows: &[&WorkOrderRow], limit: usize) -> (Vec<MatchedWorkOrder>, usize) {
    let mut seen = BTreeSet::new();
    let mut firsts: Vec<&WorkOrderRow> =
        rows.iter().copied().filter(|r| seen.insert(r.work_order_id)).collect();
    let total = firsts.len();

    firsts.sort_by(|a, b| {
        b.start_timestamp
            .cmp(&a.start_timestamp)
            .then_with(|| a.work_order_id.cmp(&b.work_order_id))
    });

    let items = firsts
        .into_iter()
        .take(limit)
        .map(|row| MatchedWorkOrder {
            work_order_id: row.work_order_id,
            equipment_id: row.equipment_id.clone(),
            symptom_code: row.symptom_code.clone(),
            start_timestamp: row.start_timestamp,
            snippet: snippet(row),
            score: None,
        })
        .collect();

    (items, total)
}

/// Work orders ranked by how well their text matches a keyword
///
/// A row scores 2 points per distinct keyword token found in its searchable
/// text (equipment, product line, symptom, description, comment) and 5 more
/// when the whole phrase appears. Rows under the minimum score are dropped:
/// 4 for keywords of two or more tokens, 2 otherwise. A work order keeps the
/// score of its best row. Highest score comes first, then most recent.
pub fn search_matches(
    rows: &[&WorkOrderRow],
    keyword: &str,
    limit: usize,
) -> (Vec<MatchedWorkOrder>, usize) {
    let query = KeywordQuery::new(keyword);
    if query.tokens.is_empty() {
        return (Vec::new(), 0);
    }

    let mut best: HashMap<WorkOrderId, (u32, &WorkOrderRow)> = HashMap::new();
    for &row in rows {
        let score = query.score(row);
        if score < query.min_score {
            continue;
        }
        best.entry(row.work_order_id)
            .and_modify(|entry| {
                if score > entry.0 {
                    *entry = (score, row);
                }
            })
            .or_insert((score, row));
    }

    let mut hits: Vec<(u32, &WorkOrderRow)> = best.into_values().collect();
    let total = hits.len();
    hits.sort_by(|(a_score, a), (b_score, b)| {
        b_score
            .cmp(a_score)
            .then_with(|| b.start_timestamp.cmp(&a.start_timestamp))
            .then_with(|| a.work_order_id.cmp(&b.work_order_id))
    });

    tracing::debug!(keyword, tokens = query.tokens.len(), hits = total, "Scored keyword search");

    let items = hits
        .into_iter()
        .take(limit)
        .map(|(score, row)| MatchedWorkOrder {
            work_order_id: row.work_order_id,
            equipment_id: row.equipment_id.clone(),
            symptom_code: row.symptom_code.clone(),
            start_timestamp: row.start_timestamp,
            snippet: query.snippet(row),
            score: Some(score),
        })
        .collect();

    (items, total)
}

/// Keyword split into its scoring parts
struct KeywordQuery {
    phrase: String,
    tokens: Vec<String>,
    min_score: u32,
}

impl KeywordQuery {
    fn new(keyword: &str) -> Self {
        let phrase = normalize_text(keyword);
        let mut tokens: Vec<String> = Vec::new();
        for token in phrase.split(|c: char| !c.is_ascii_alphanumeric()).filter(|t| !t.is_empty()) {
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        let min_score = if tokens.len() >= 2 {
            2 * TOKEN_POINTS
        } else {
            TOKEN_POINTS
        };

        Self {
            phrase,
            tokens,
            min_score,
        }
    }

    fn score(&self, row: &WorkOrderRow) -> u32 {
        let text = normalize_text(&format!(
            "{} {} {} {} {}",
            row.equipment_id, row.product_line, row.symptom_code, row.description, row.comment
        ));
        let found = self.tokens.iter().filter(|t| text.contains(t.as_str())).count() as u32;
        let bonus = if text.contains(&self.phrase) { PHRASE_BONUS } else { 0 };
        found * TOKEN_POINTS + bonus
    }

    /// Excerpt around the first token hit in the comment, else the description
    fn snippet(&self, row: &WorkOrderRow) -> String {
        [row.comment.trim(), row.description.trim()]
            .into_iter()
            .find_map(|text| self.first_hit(text).map(|at| excerpt_around(text, at, SNIPPET_CHARS)))
            .unwrap_or_else(|| snippet(row))
    }

    /// Byte offset of the earliest token occurrence
    fn first_hit(&self, text: &str) -> Option<usize> {
        // Tokens are ASCII, so ASCII lowercasing keeps byte offsets valid
        let lower = text.to_ascii_lowercase();
        self.tokens.iter().filter_map(|t| lower.find(t.as_str())).min()
    }
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Window of `max` characters around byte offset `at`, with "..." at cut ends
fn excerpt_around(text: &str, at: usize, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let hit = text[..at].chars().count();
    let start = hit.saturating_sub(max / 2).min(total - max);
    let body: String = text.chars().skip(start).take(max).collect();

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(body.trim());
    if start + max < total {
        out.push_str("...");
    }
    out
}

fn month_of(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

fn snippet(row: &WorkOrderRow) -> String {
    let source = if row.comment.trim().is_empty() {
        row.description.trim()
    } else {
        row.comment.trim()
    };
    truncate_chars(source, SNIPPET_CHARS)
}

/// Cut text to at most `max` characters, marking the cut with "..."
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn row(id: i64, equipment: &str, symptom: &str, technician: &str, start: NaiveDateTime) -> WorkOrderRow {
        WorkOrderRow {
            work_order_id: WorkOrderId(id),
            equipment_id: equipment.to_string(),
            product_line: "Stamping".to_string(),
            start_timestamp: start,
            end_timestamp: start + chrono::Duration::hours(2),
            description: "Repair/Stamping/Press/Hydraulics/Seal".to_string(),
            technician: technician.to_string(),
            comment: format!("Work on {} by {}", equipment, technician),
            symptom_code: symptom.to_string(),
        }
    }

    fn sample() -> Vec<WorkOrderRow> {
        vec![
            row(1, "PRESS-01", "HYDRAULIC_LEAK", "Alice", ts(1, 5, 8)),
            row(1, "PRESS-01", "HYDRAULIC_LEAK", "Bob", ts(1, 5, 12)),
            row(2, "PRESS-01", "BEARING_WEAR", "Alice", ts(3, 2, 9)),
            row(3, "CNC-01", "SPINDLE_TIMEOUT", "", ts(3, 9, 9)),
            row(4, "CNC-01", "BEARING_WEAR", "Carol", ts(4, 1, 9)),
            row(5, "LATHE-02", "SPINDLE_TIMEOUT", "Carol", ts(4, 20, 9)),
        ]
    }

    fn refs(rows: &[WorkOrderRow]) -> Vec<&WorkOrderRow> {
        rows.iter().collect()
    }

    #[test]
    fn test_count_incidents_dedupes() {
        let rows = sample();
        assert_eq!(count_incidents(&refs(&rows)), 5);
        assert_eq!(count_incidents(&[]), 0);
    }

    #[test]
    fn test_ranking_keeps_ties_at_cut() {
        let rows = sample();
        let AnalyticsResult::Ranking { entries, groups, .. } = aggregate_symptom(&refs(&rows), 1)
        else {
            panic!("expected ranking");
        };
        assert_eq!(groups, 3);
        let names: Vec<_> = entries.iter().map(|e| e.entity.as_str()).collect();
        assert_eq!(names, vec!["BEARING_WEAR", "SPINDLE_TIMEOUT"]);
        assert!(entries.iter().all(|e| e.count == 2));
    }

    #[test]
    fn test_technician_ranking_skips_empty() {
        let rows = sample();
        let AnalyticsResult::Ranking { entries, .. } = rank_technician(&refs(&rows), 5) else {
            panic!("expected ranking");
        };
        assert_eq!(
            entries,
            vec![
                RankedEntry { entity: "Alice".into(), count: 2 },
                RankedEntry { entity: "Carol".into(), count: 2 },
                RankedEntry { entity: "Bob".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_keyword_mentions_by_unit() {
        let rows = sample();
        let rows = refs(&rows);
        assert_eq!(keyword_mention_count(&rows, Some("press-01"), CountUnit::Rows), 3);
        assert_eq!(keyword_mention_count(&rows, Some("press-01"), CountUnit::WorkOrders), 2);
        assert_eq!(keyword_mention_count(&rows, None, CountUnit::Rows), 0);
    }

    #[test]
    fn test_distinct_count_skips_empty() {
        let rows = sample();
        assert_eq!(distinct_count(&refs(&rows), Dimension::Technician), 3);
        assert_eq!(distinct_count(&refs(&rows), Dimension::Equipment), 3);
    }

    #[test]
    fn test_detail_lookup_groups_rows() {
        let mut rows = sample();
        // Out-of-order row and a repeated comment
        rows.insert(0, WorkOrderRow {
            comment: "Pressure check".into(),
            ..row(1, "PRESS-01", "HYDRAULIC_LEAK", "Bob", ts(1, 6, 7))
        });
        rows.push(WorkOrderRow {
            comment: "Pressure check".into(),
            ..row(1, "PRESS-01", "HYDRAULIC_LEAK", "Bob", ts(1, 6, 9))
        });
        let dataset = Dataset::from_rows(rows);

        let AnalyticsResult::Detail(detail) = detail_lookup(&dataset, WorkOrderId(1)) else {
            panic!("expected detail");
        };
        assert_eq!(detail.row_count, 4);
        assert_eq!(detail.technicians, vec!["Alice", "Bob"]);
        assert_eq!(detail.opened, ts(1, 5, 8));
        assert_eq!(detail.closed, ts(1, 6, 11));
        assert_eq!(detail.entries.len(), 3);
        assert!(detail.entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_detail_lookup_missing() {
        let dataset = Dataset::from_rows(sample());
        assert_eq!(
            detail_lookup(&dataset, WorkOrderId(999_999)),
            AnalyticsResult::NotFound { work_order_id: WorkOrderId(999_999) }
        );
    }

    #[test]
    fn test_trend_fills_gaps() {
        let rows = vec![
            row(1, "PRESS-01", "X", "A", ts(1, 5, 8)),
            row(2, "PRESS-01", "X", "A", ts(4, 5, 8)),
            row(3, "PRESS-01", "X", "A", ts(4, 9, 8)),
        ];
        let buckets = incident_trend(&refs(&rows));
        let counts: Vec<_> = buckets.iter().map(|b| (b.label(), b.count)).collect();
        assert_eq!(
            counts,
            vec![
                ("2024-01".to_string(), 1),
                ("2024-02".to_string(), 0),
                ("2024-03".to_string(), 0),
                ("2024-04".to_string(), 2),
            ]
        );
        assert!(incident_trend(&[]).is_empty());
    }

    #[test]
    fn test_list_matches_most_recent_first() {
        let rows = sample();
        let (items, total) = list_matches(&refs(&rows), 2);
        assert_eq!(total, 5);
        let ids: Vec<_> = items.iter().map(|i| i.work_order_id.0).collect();
        assert_eq!(ids, vec![5, 4]);
    }

    #[test]
    fn test_search_ranks_by_score_then_recency() {
        let mut rows = sample();
        rows[5].comment = "Bearing wear on spindle, bearing wear confirmed".to_string();
        let (items, total) = search_matches(&refs(&rows), "bearing wear", 10);

        assert_eq!(total, 3);
        let ids: Vec<_> = items.iter().map(|i| i.work_order_id.0).collect();
        // Work order 5 holds the whole phrase; 4 and 2 only hold both tokens
        assert_eq!(ids, vec![5, 4, 2]);
        assert_eq!(items[0].score, Some(9));
        assert_eq!(items[1].score, Some(4));
    }

    #[test]
    fn test_search_needs_more_than_one_token_for_long_keywords() {
        let rows = sample();
        // "timeout" alone reaches 2 points, below the two-token minimum
        let (_, total) = search_matches(&refs(&rows), "timeout lathe", 10);
        assert_eq!(total, 1);
        let (_, total) = search_matches(&refs(&rows), "timeout", 10);
        assert_eq!(total, 2);
        assert_eq!(search_matches(&refs(&rows), "  ", 10).1, 0);
    }

    #[test]
    fn test_search_snippet_is_centred_on_hit() {
        let mut rows = sample();
        rows[3].comment = format!("{} coolant leak found {}", "a".repeat(200), "b".repeat(200));
        let (items, _) = search_matches(&refs(&rows[3..4]), "coolant", 10);

        let snippet = &items[0].snippet;
        assert!(snippet.contains("coolant leak"));
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_run_searches_when_keyword_set() {
        let rows = sample();
        let dataset = Dataset::from_rows(rows.clone());
        let result = run(
            &Intent::ListMatches,
            &refs(&rows),
            &dataset,
            &FilterSpec::new().with_keyword("spindle"),
            &AnalyticsOptions::default(),
        );
        let AnalyticsResult::Matches { items, total } = result else {
            panic!("expected matches");
        };
        assert_eq!(total, 2);
        assert!(items.iter().all(|i| i.score.is_some()));
    }

    #[test]
    fn test_truncate_chars() {
        let long = "x".repeat(200);
        let cut = truncate_chars(&long, SNIPPET_CHARS);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_chars("short", SNIPPET_CHARS), "short");
    }

    #[test]
    fn test_run_uses_default_top_n() {
        let rows = sample();
        let dataset = Dataset::from_rows(rows.clone());
        let result = run(
            &Intent::RankEquipment { limit: None },
            &refs(&rows),
            &dataset,
            &FilterSpec::new(),
            &AnalyticsOptions { top_n: 1, list_limit: 10 },
        );
        let AnalyticsResult::Ranking { entries, limit, .. } = result else {
            panic!("expected ranking");
        };
        assert_eq!(limit, 1);
        // PRESS-01 and CNC-01 both have 2 work orders
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entity, "CNC-01");
    }
}
