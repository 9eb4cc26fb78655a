use maintrag_core::models::{FilterSpec, WorkOrderRow};
use maintrag_core::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Counts reported by one retrieval pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalStats {
    /// Rows examined
    pub rows_scanned: usize,

    /// Rows that passed every filter
    pub rows_matched: usize,

    /// Distinct work orders among the matched rows
    pub work_orders_matched: usize,
}

/// Apply a filter to the dataset, keeping dataset order
pub fn retrieve<'a>(dataset: &'a Dataset, filters: &FilterSpec) -> Vec<&'a WorkOrderRow> {
    let predicate = RowPredicate::new(filters);
    dataset.rows().iter().filter(|row| predicate.matches(row)).collect()
}

/// Same as [`retrieve`], with counts for the explain view
pub fn retrieve_with_stats<'a>(
    dataset: &'a Dataset,
    filters: &FilterSpec,
) -> (Vec<&'a WorkOrderRow>, RetrievalStats) {
    let rows = retrieve(dataset, filters);
    let stats = RetrievalStats {
        rows_scanned: dataset.len(),
        rows_matched: rows.len(),
        work_orders_matched: rows.iter().map(|r| r.work_order_id).collect::<BTreeSet<_>>().len(),
    };

    tracing::debug!(
        scanned = stats.rows_scanned,
        matched = stats.rows_matched,
        work_orders = stats.work_orders_matched,
        "Applied filters"
    );

    (rows, stats)
}

/// Filter with its string constraints lowercased once
struct RowPredicate<'f> {
    filters: &'f FilterSpec,
    keyword: Option<String>,
}

impl<'f> RowPredicate<'f> {
    fn new(filters: &'f FilterSpec) -> Self {
        Self {
            filters,
            keyword: filters.keyword.as_ref().map(|k| k.to_lowercase()),
        }
    }

    fn matches(&self, row: &WorkOrderRow) -> bool {
        let f = self.filters;

        same(&f.equipment_id, &row.equipment_id)
            && same(&f.product_line, &row.product_line)
            && same(&f.symptom_code, &row.symptom_code)
            && same(&f.technician, &row.technician)
            && self.keyword.as_deref().is_none_or(|k| row.mentions(k))
            && f.start_ts_min.is_none_or(|min| row.start_timestamp >= min)
            && f.start_ts_max.is_none_or(|max| row.start_timestamp < max)
    }
}

fn same(wanted: &Option<String>, actual: &str) -> bool {
    wanted.as_deref().is_none_or(|w| w.eq_ignore_ascii_case(actual))
}
