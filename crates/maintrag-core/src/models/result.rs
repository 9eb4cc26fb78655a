use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{CountUnit, Dimension, WorkOrderId};

/// What a count result counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "of", rename_all = "snake_case")]
pub enum CountSubject {
    /// Distinct work orders
    Incidents,

    /// Rows or work orders mentioning a keyword
    Mentions {
        keyword: Option<String>,
        unit: CountUnit,
    },

    /// Distinct values of a dimension
    Distinct { dimension: Dimension },
}

/// One entity in a ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub entity: String,
    pub count: usize,
}

/// Work orders opened in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendBucket {
    /// First day of the month
    pub month: NaiveDate,
    pub count: usize,
}

impl TrendBucket {
    /// Month label such as "2024-07"
    pub fn label(&self) -> String {
        self.month.format("%Y-%m").to_string()
    }
}

/// Summary of one work order in a list answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedWorkOrder {
    pub work_order_id: WorkOrderId,
    pub equipment_id: String,
    pub symptom_code: String,
    pub start_timestamp: NaiveDateTime,
    /// Compact description/comment excerpt
    pub snippet: String,
    /// Relevance to the searched keyword, when the list came from a search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// One log entry of a work order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEntry {
    pub timestamp: NaiveDateTime,
    pub technician: String,
    pub comment: String,
}

/// All log rows of one work order, grouped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderDetail {
    pub work_order_id: WorkOrderId,
    pub equipment_id: String,
    pub product_line: String,
    pub symptom_code: String,
    pub description: String,

    /// Earliest start across the rows
    pub opened: NaiveDateTime,

    /// Latest end across the rows
    pub closed: NaiveDateTime,

    /// Technicians in order of first appearance, without duplicates
    pub technicians: Vec<String>,

    /// Comments in chronological order
    pub entries: Vec<DetailEntry>,

    /// Number of log rows for this work order
    pub row_count: usize,
}

/// Output of the analytics engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsResult {
    Count {
        value: usize,
        subject: CountSubject,
    },

    Ranking {
        dimension: Dimension,
        /// Sorted by count desc, then entity asc; ties at the cut are kept
        entries: Vec<RankedEntry>,
        /// Requested number of entries before ties
        limit: usize,
        /// Number of non-empty groups before truncation
        groups: usize,
    },

    Trend {
        buckets: Vec<TrendBucket>,
    },

    Matches {
        items: Vec<MatchedWorkOrder>,
        /// Distinct work orders matched before truncation
        total: usize,
    },

    Detail(WorkOrderDetail),

    NotFound {
        work_order_id: WorkOrderId,
    },
}

impl AnalyticsResult {
    /// Check whether the result carries no data
    pub fn is_empty(&self) -> bool {
        match self {
            AnalyticsResult::Count { value, .. } => *value == 0,
            AnalyticsResult::Ranking { entries, .. } => entries.is_empty(),
            AnalyticsResult::Trend { buckets } => buckets.is_empty(),
            AnalyticsResult::Matches { total, .. } => *total == 0,
            AnalyticsResult::Detail(_) => false,
            AnalyticsResult::NotFound { .. } => true,
        }
    }
}
