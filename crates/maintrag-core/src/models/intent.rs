use serde::{Deserialize, Serialize};
use std::fmt;

use super::WorkOrderId;

/// Categorical column of the maintenance log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Equipment,
    ProductLine,
    Symptom,
    Technician,
}

impl Dimension {
    /// Singular label used in answers
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Equipment => "equipment",
            Dimension::ProductLine => "product line",
            Dimension::Symptom => "symptom",
            Dimension::Technician => "technician",
        }
    }

    /// Plural label used in answers
    pub fn plural(&self) -> &'static str {
        match self {
            Dimension::Equipment => "equipment",
            Dimension::ProductLine => "product lines",
            Dimension::Symptom => "symptoms",
            Dimension::Technician => "technicians",
        }
    }
}

/// Granularity of a count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountUnit {
    /// Every log row counts
    Rows,
    /// Rows are deduplicated by work order
    WorkOrders,
}

/// Analytic operation requested by a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// Distinct work orders in scope
    CountIncidents,

    /// Equipment ranked by distinct work orders
    RankEquipment { limit: Option<usize> },

    /// Technicians ranked by distinct work orders
    RankTechnician { limit: Option<usize> },

    /// Symptom codes ranked by distinct work orders
    AggregateSymptom { limit: Option<usize> },

    /// Rows or work orders whose text mentions the keyword
    KeywordMentionCount { unit: CountUnit },

    /// Distinct values of one dimension
    DistinctCount { dimension: Dimension },

    /// All log entries of one work order
    DetailLookup { work_order_id: WorkOrderId },

    /// Work orders per calendar month
    IncidentTrend,

    /// Generic list/describe answer
    ListMatches,
}

impl Intent {
    /// Stable snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            Intent::CountIncidents => "count_incidents",
            Intent::RankEquipment { .. } => "rank_equipment",
            Intent::RankTechnician { .. } => "rank_technician",
            Intent::AggregateSymptom { .. } => "aggregate_symptom",
            Intent::KeywordMentionCount { .. } => "keyword_mention_count",
            Intent::DistinctCount { .. } => "distinct_count",
            Intent::DetailLookup { .. } => "detail_lookup",
            Intent::IncidentTrend => "incident_trend",
            Intent::ListMatches => "list_matches",
        }
    }

    /// Dimension and requested limit for ranking intents
    pub fn ranking(&self) -> Option<(Dimension, Option<usize>)> {
        match *self {
            Intent::RankEquipment { limit } => Some((Dimension::Equipment, limit)),
            Intent::RankTechnician { limit } => Some((Dimension::Technician, limit)),
            Intent::AggregateSymptom { limit } => Some((Dimension::Symptom, limit)),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
