use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Dimension;

/// Identifier of a work order (one maintenance incident)
///
/// Several log rows may share the same identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderId(pub i64);

impl fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the maintenance log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderRow {
    /// Work order this log entry belongs to
    pub work_order_id: WorkOrderId,

    /// Equipment identifier (e.g. "PRESS-01")
    pub equipment_id: String,

    /// Product line the equipment serves
    pub product_line: String,

    /// When this log entry started
    pub start_timestamp: NaiveDateTime,

    /// When this log entry ended
    pub end_timestamp: NaiveDateTime,

    /// Hierarchical description: type/product_line/system/category/detail
    pub description: String,

    /// Technician who wrote the entry (may be empty)
    pub technician: String,

    /// Free-text comment
    pub comment: String,

    /// Symptom code (e.g. "HYDRAULIC_LEAK")
    pub symptom_code: String,
}

impl WorkOrderRow {
    /// Split the description hierarchy into its non-empty segments
    pub fn description_segments(&self) -> Vec<&str> {
        self.description
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Value of a categorical column
    pub fn value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Equipment => &self.equipment_id,
            Dimension::ProductLine => &self.product_line,
            Dimension::Symptom => &self.symptom_code,
            Dimension::Technician => &self.technician,
        }
    }

    /// Check whether the description or the comment contains a keyword
    ///
    /// The keyword must already be lowercased.
    pub fn mentions(&self, keyword_lower: &str) -> bool {
        if keyword_lower.is_empty() {
            return false;
        }
        self.description.to_lowercase().contains(keyword_lower)
            || self.comment.to_lowercase().contains(keyword_lower)
    }
}
