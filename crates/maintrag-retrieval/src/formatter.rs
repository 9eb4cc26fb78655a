//! Template rendering of analytics results
//!
//! Numbers are copied from the result as they are; nothing is recomputed
//! here.

use chrono::{Datelike, NaiveDateTime, Timelike};
use maintrag_core::models::{
    AnalyticsResult, CountSubject, CountUnit, Dimension, FilterSpec, Intent, MatchedWorkOrder,
    RankedEntry, WorkOrderDetail,
};
use serde::Serialize;

pub const NO_MATCHING_RECORDS: &str = "No matching records";

/// Rendered answer together with what produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedAnswer {
    pub text: String,
    pub intent: Intent,
    pub filters: FilterSpec,
    pub result: AnalyticsResult,
}

/// Render a result as a short sentence
pub fn format_answer(intent: &Intent, filters: &FilterSpec, result: &AnalyticsResult) -> FormattedAnswer {
    let text = match result {
        AnalyticsResult::Count { value, subject } => format_count(*value, subject, filters),
        AnalyticsResult::Ranking {
            dimension,
            entries,
            limit,
            ..
        } => format_ranking(*dimension, entries, *limit, filters),
        AnalyticsResult::Trend { buckets } => {
            if buckets.is_empty() {
                no_records(filters)
            } else {
                let months: Vec<String> =
                    buckets.iter().map(|b| format!("{}: {}", b.label(), b.count)).collect();
                format!(
                    "Work orders per month{}: {}.",
                    leading(&describe_filters(filters)),
                    months.join(", ")
                )
            }
        }
        AnalyticsResult::Matches { items, total } => format_matches(items, *total, filters),
        AnalyticsResult::Detail(detail) => format_detail(detail),
        AnalyticsResult::NotFound { work_order_id } => format!(
            "{}: work order {} does not exist in the dataset.",
            NO_MATCHING_RECORDS, work_order_id
        ),
    };

    FormattedAnswer {
        text,
        intent: *intent,
        filters: filters.clone(),
        result: result.clone(),
    }
}

/// Describe the scope of a filter, e.g. "on PRESS-01 in July 2024"
///
/// Returns an empty string when the filter is empty.
pub fn describe_filters(filters: &FilterSpec) -> String {
    let mut parts = scope_parts(filters);
    if let Some(keyword) = &filters.keyword {
        parts.push(format!("mentioning \"{}\"", keyword));
    }
    parts.join(" ")
}

fn scope_parts(filters: &FilterSpec) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(equipment) = &filters.equipment_id {
        parts.push(format!("on {}", equipment));
    }
    if let Some(line) = &filters.product_line {
        parts.push(format!("in the {} line", line));
    }
    if let Some(symptom) = &filters.symptom_code {
        parts.push(format!("with symptom {}", symptom));
    }
    if let Some(technician) = &filters.technician {
        parts.push(format!("handled by {}", technician));
    }
    if let Some(period) = describe_period(filters.start_ts_min, filters.start_ts_max) {
        parts.push(period);
    }
    parts
}

/// Name a half-open time range the way a person would say it
pub fn describe_period(min: Option<NaiveDateTime>, max: Option<NaiveDateTime>) -> Option<String> {
    match (min, max) {
        (None, None) => None,
        (Some(min), None) => Some(format!("since {}", min.format("%Y-%m-%d"))),
        (None, Some(max)) => Some(format!("before {}", max.format("%Y-%m-%d"))),
        (Some(min), Some(max)) => Some(named_period(min, max).unwrap_or_else(|| {
            format!("between {} and {}", min.format("%Y-%m-%d"), max.format("%Y-%m-%d"))
        })),
    }
}

fn named_period(min: NaiveDateTime, max: NaiveDateTime) -> Option<String> {
    if !is_month_start(min) || !is_month_start(max) {
        return None;
    }
    let months = (max.year() - min.year()) * 12 + max.month() as i32 - min.month() as i32;
    let year = min.year();
    let month = min.month();

    let label = match months {
        1 => format!("in {}", min.format("%B %Y")),
        3 if month % 3 == 1 => format!("in Q{} {}", (month - 1) / 3 + 1, year),
        6 if month == 1 || month == 7 => format!("in H{} {}", if month == 1 { 1 } else { 2 }, year),
        12 if month == 1 => format!("in {}", year),
        n if n > 1 => {
            let last = max.date().checked_sub_months(chrono::Months::new(1))?;
            format!("from {} to {}", min.format("%B %Y"), last.format("%B %Y"))
        }
        _ => return None,
    };
    Some(label)
}

fn is_month_start(ts: NaiveDateTime) -> bool {
    ts.day() == 1 && ts.num_seconds_from_midnight() == 0
}

fn leading(scope: &str) -> String {
    if scope.is_empty() {
        String::new()
    } else {
        format!(" {}", scope)
    }
}

fn no_records(filters: &FilterSpec) -> String {
    format!("{}{}.", NO_MATCHING_RECORDS, leading(&describe_filters(filters)))
}

fn format_count(value: usize, subject: &CountSubject, filters: &FilterSpec) -> String {
    match subject {
        CountSubject::Incidents => {
            let scope = leading(&describe_filters(filters));
            match value {
                0 => format!("{}: there were 0 incidents{}.", NO_MATCHING_RECORDS, scope),
                1 => format!("There was 1 incident{}.", scope),
                n => format!("There were {} incidents{}.", n, scope),
            }
        }
        CountSubject::Mentions { keyword, unit } => {
            let Some(keyword) = keyword else {
                return "No keyword could be identified in the question, so 0 mentions were counted."
                    .to_string();
            };
            let scope = leading(&scope_parts(filters).join(" "));
            let (one, many) = match unit {
                CountUnit::Rows => ("log entry", "log entries"),
                CountUnit::WorkOrders => ("work order", "work orders"),
            };
            match value {
                0 => format!("{}: 0 {} mention \"{}\"{}.", NO_MATCHING_RECORDS, many, keyword, scope),
                1 => format!("1 {} mentions \"{}\"{}.", one, keyword, scope),
                n => format!("{} {} mention \"{}\"{}.", n, many, keyword, scope),
            }
        }
        CountSubject::Distinct { dimension } => {
            let scope = leading(&describe_filters(filters));
            let (one, many) = counted_nouns(*dimension);
            match value {
                0 => format!("{}: there were 0 {}{}.", NO_MATCHING_RECORDS, many, scope),
                1 => format!("There was 1 {}{}.", one, scope),
                n => format!("There were {} different {}{}.", n, many, scope),
            }
        }
    }
}

fn counted_nouns(dimension: Dimension) -> (&'static str, &'static str) {
    match dimension {
        Dimension::Equipment => ("equipment ID", "equipment IDs"),
        Dimension::ProductLine => ("product line", "product lines"),
        Dimension::Symptom => ("symptom code", "symptom codes"),
        Dimension::Technician => ("technician", "technicians"),
    }
}

fn work_orders(count: usize) -> String {
    if count == 1 {
        "1 work order".to_string()
    } else {
        format!("{} work orders", count)
    }
}

/// "A", "A and B", "A, B and C"
fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn format_ranking(
    dimension: Dimension,
    entries: &[RankedEntry],
    limit: usize,
    filters: &FilterSpec,
) -> String {
    let Some(top) = entries.first() else {
        return no_records(filters);
    };
    let scope = leading(&describe_filters(filters));

    if limit == 1 {
        let leaders: Vec<&str> = entries
            .iter()
            .filter(|e| e.count == top.count)
            .map(|e| e.entity.as_str())
            .collect();

        return match (dimension, leaders.as_slice()) {
            (Dimension::Symptom, [only]) => format!(
                "The most common symptom{} is {} with {}.",
                scope,
                only,
                work_orders(top.count)
            ),
            (_, [only]) => format!(
                "The {} with the most work orders{} is {} with {}.",
                dimension.label(),
                scope,
                only,
                work_orders(top.count)
            ),
            (Dimension::Symptom, tied) => format!(
                "The most common symptoms{} are {}, each with {}.",
                scope,
                join_names(tied),
                work_orders(top.count)
            ),
            (_, tied) => format!(
                "The {} with the most work orders{} are {}, each with {}.",
                dimension.plural(),
                scope,
                join_names(tied),
                work_orders(top.count)
            ),
        };
    }

    // Group consecutive entries sharing a count so ties read naturally
    let mut groups: Vec<(usize, Vec<&str>)> = Vec::new();
    for entry in entries {
        match groups.last_mut() {
            Some((count, names)) if *count == entry.count => names.push(entry.entity.as_str()),
            _ => groups.push((entry.count, vec![entry.entity.as_str()])),
        }
    }
    let listed: Vec<String> = groups
        .iter()
        .map(|(count, names)| match names.as_slice() {
            [one] => format!("{} ({})", one, count),
            tied => format!("{} ({} each)", join_names(tied), count),
        })
        .collect();

    let title = match dimension {
        Dimension::Symptom => "symptoms".to_string(),
        other => other.plural().to_string(),
    };
    let ties = if entries.len() > limit {
        " (ties at the cut included)"
    } else {
        ""
    };
    format!(
        "Top {} {} by work orders{}: {}{}.",
        limit.min(entries.len()),
        title,
        scope,
        listed.join(", "),
        ties
    )
}

fn format_matches(items: &[MatchedWorkOrder], total: usize, filters: &FilterSpec) -> String {
    if total == 0 {
        return no_records(filters);
    }
    let scope = leading(&describe_filters(filters));
    let ranked_by = if items.iter().any(|i| i.score.is_some()) {
        "best matching"
    } else {
        "most recent"
    };
    let shown = if items.len() < total {
        format!(" (showing the {} {})", items.len(), ranked_by)
    } else {
        String::new()
    };

    let mut text = format!("Found {}{}{}:", work_orders(total), scope, shown);
    for item in items {
        text.push_str(&format!(
            "\n- WO {} | {} | {} | {} | {}",
            item.work_order_id,
            item.equipment_id,
            item.symptom_code,
            item.start_timestamp.format("%Y-%m-%d"),
            item.snippet
        ));
    }
    text
}

fn format_detail(detail: &WorkOrderDetail) -> String {
    let technicians = if detail.technicians.is_empty() {
        "none recorded".to_string()
    } else {
        let names: Vec<&str> = detail.technicians.iter().map(String::as_str).collect();
        join_names(&names)
    };

    let mut text = format!(
        "Work order {} on {} ({}, {}) was opened {} and closed {}. Technicians: {}.",
        detail.work_order_id,
        detail.equipment_id,
        detail.product_line,
        detail.symptom_code,
        detail.opened.format("%Y-%m-%d %H:%M"),
        detail.closed.format("%Y-%m-%d %H:%M"),
        technicians
    );
    for entry in &detail.entries {
        let who = if entry.technician.is_empty() {
            String::new()
        } else {
            format!(" {}", entry.technician)
        };
        text.push_str(&format!(
            "\n- {}{}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            who,
            entry.comment
        ));
    }
    text
}
