use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Structured constraints extracted from a question
///
/// Every field is optional. An unset field imposes no filtering; set fields
/// are combined with AND. The time range is half-open: `[start_ts_min, start_ts_max)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Exact equipment identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,

    /// Exact product line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_line: Option<String>,

    /// Exact symptom code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom_code: Option<String>,

    /// Exact technician name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,

    /// Substring searched in description and comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,

    /// Inclusive lower bound on the start timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ts_min: Option<NaiveDateTime>,

    /// Exclusive upper bound on the start timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ts_max: Option<NaiveDateTime>,
}

impl FilterSpec {
    /// Create a filter with no constraints
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equipment(mut self, equipment_id: impl Into<String>) -> Self {
        self.equipment_id = Some(equipment_id.into());
        self
    }

    pub fn with_product_line(mut self, product_line: impl Into<String>) -> Self {
        self.product_line = Some(product_line.into());
        self
    }

    pub fn with_symptom(mut self, symptom_code: impl Into<String>) -> Self {
        self.symptom_code = Some(symptom_code.into());
        self
    }

    pub fn with_technician(mut self, technician: impl Into<String>) -> Self {
        self.technician = Some(technician.into());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Set the half-open start-time range `[min, max)`
    pub fn with_time_range(mut self, min: NaiveDateTime, max: NaiveDateTime) -> Self {
        self.start_ts_min = Some(min);
        self.start_ts_max = Some(max);
        self
    }

    /// Check if the filter is empty (no constraints)
    pub fn is_empty(&self) -> bool {
        self.equipment_id.is_none()
            && self.product_line.is_none()
            && self.symptom_code.is_none()
            && self.technician.is_none()
            && self.keyword.is_none()
            && !self.has_time_range()
    }

    /// Same constraints with the keyword dropped
    pub fn without_keyword(&self) -> FilterSpec {
        FilterSpec {
            keyword: None,
            ..self.clone()
        }
    }

    /// Check if either time bound is set
    pub fn has_time_range(&self) -> bool {
        self.start_ts_min.is_some() || self.start_ts_max.is_some()
    }

    /// Fill every dimension this filter leaves unset from `inherited`
    ///
    /// Values stated in `self` always win for their own dimension. Both time
    /// bounds form a single dimension and are inherited together.
    pub fn merged_over(self, inherited: &FilterSpec) -> FilterSpec {
        let (start_ts_min, start_ts_max) = if self.has_time_range() {
            (self.start_ts_min, self.start_ts_max)
        } else {
            (inherited.start_ts_min, inherited.start_ts_max)
        };

        FilterSpec {
            equipment_id: self.equipment_id.or_else(|| inherited.equipment_id.clone()),
            product_line: self.product_line.or_else(|| inherited.product_line.clone()),
            symptom_code: self.symptom_code.or_else(|| inherited.symptom_code.clone()),
            technician: self.technician.or_else(|| inherited.technician.clone()),
            keyword: self.keyword.or_else(|| inherited.keyword.clone()),
            start_ts_min,
            start_ts_max,
        }
    }
}
