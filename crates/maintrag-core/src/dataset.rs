//! Maintenance log loading and schema validation

use crate::error::{MaintragError, Result};
use crate::models::{Dimension, WorkOrderId, WorkOrderRow};
use chrono::{Datelike, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Columns every maintenance log must carry
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "work_order_id",
    "equipment_id",
    "product_line",
    "start_date",
    "start_time",
    "end_date",
    "end_time",
    "description",
    "technician",
    "comment",
    "symptom_code",
];

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// How start/end timestamps are laid out in the file
enum TimestampLayout {
    /// Separate `*_date` and `*_time` columns
    Split {
        start_date: usize,
        start_time: usize,
        end_date: usize,
        end_time: usize,
    },
    /// Combined `start_timestamp` and `end_timestamp` columns
    Combined { start: usize, end: usize },
}

/// Resolved column positions for one file
struct ColumnMap {
    work_order_id: usize,
    equipment_id: usize,
    product_line: usize,
    description: usize,
    technician: usize,
    comment: usize,
    symptom_code: usize,
    timestamps: TimestampLayout,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();

        let combined = index.contains_key("start_timestamp") && index.contains_key("end_timestamp");
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| {
                let is_time_column = c.ends_with("_date") || c.ends_with("_time");
                !(index.contains_key(**c) || (combined && is_time_column))
            })
            .map(|c| c.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(MaintragError::MissingColumns { columns: missing });
        }

        let col = |name: &str| index[name];
        let timestamps = if combined {
            TimestampLayout::Combined {
                start: col("start_timestamp"),
                end: col("end_timestamp"),
            }
        } else {
            TimestampLayout::Split {
                start_date: col("start_date"),
                start_time: col("start_time"),
                end_date: col("end_date"),
                end_time: col("end_time"),
            }
        };

        Ok(Self {
            work_order_id: col("work_order_id"),
            equipment_id: col("equipment_id"),
            product_line: col("product_line"),
            description: col("description"),
            technician: col("technician"),
            comment: col("comment"),
            symptom_code: col("symptom_code"),
            timestamps,
        })
    }

    fn parse_row(&self, record: &StringRecord, line: u64) -> Result<WorkOrderRow> {
        let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();

        let work_order_id = parse_work_order_id(record.get(self.work_order_id).unwrap_or(""))
            .ok_or_else(|| MaintragError::InvalidRecord {
                line,
                reason: format!(
                    "work_order_id '{}' is not an integer",
                    record.get(self.work_order_id).unwrap_or("")
                ),
            })?;

        let (start_raw, end_raw) = match self.timestamps {
            TimestampLayout::Split {
                start_date,
                start_time,
                end_date,
                end_time,
            } => (
                format!("{} {}", field(start_date), field(start_time)),
                format!("{} {}", field(end_date), field(end_time)),
            ),
            TimestampLayout::Combined { start, end } => (field(start), field(end)),
        };

        let start_timestamp = parse_timestamp(&start_raw).ok_or_else(|| {
            MaintragError::InvalidRecord {
                line,
                reason: format!("cannot parse start timestamp '{}'", start_raw),
            }
        })?;
        let end_timestamp = parse_timestamp(&end_raw).ok_or_else(|| MaintragError::InvalidRecord {
            line,
            reason: format!("cannot parse end timestamp '{}'", end_raw),
        })?;

        Ok(WorkOrderRow {
            work_order_id,
            equipment_id: field(self.equipment_id),
            product_line: field(self.product_line),
            start_timestamp,
            end_timestamp,
            description: field(self.description),
            technician: field(self.technician),
            comment: field(self.comment),
            symptom_code: field(self.symptom_code),
        })
    }
}

/// Accepts plain integers and integral floats such as "1042.0"
fn parse_work_order_id(raw: &str) -> Option<WorkOrderId> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Some(WorkOrderId(id));
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(WorkOrderId(value as i64))
    } else {
        None
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
}

/// Immutable in-memory maintenance log
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<WorkOrderRow>,
    source: Option<PathBuf>,
}

impl Dataset {
    /// Load and validate a CSV maintenance log
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MaintragError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path)?;
        let mut dataset = Self::from_reader(file)?;
        dataset.source = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            rows = dataset.len(),
            work_orders = dataset.distinct_work_orders(),
            "Loaded maintenance log"
        );

        Ok(dataset)
    }

    /// Parse a CSV maintenance log from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let headers = csv.headers()?.clone();
        let columns = ColumnMap::resolve(&headers)?;

        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            rows.push(columns.parse_row(&record, line)?);
        }

        Ok(Self::from_rows(rows))
    }

    /// Build a dataset from already-parsed rows
    pub fn from_rows(rows: Vec<WorkOrderRow>) -> Self {
        Self { rows, source: None }
    }

    pub fn rows(&self) -> &[WorkOrderRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// File the dataset was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// All rows logged against one work order, in file order
    pub fn rows_for(&self, id: WorkOrderId) -> Vec<&WorkOrderRow> {
        self.rows.iter().filter(|r| r.work_order_id == id).collect()
    }

    /// Number of distinct work orders
    pub fn distinct_work_orders(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.work_order_id)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Earliest and latest start timestamps
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let min = self.rows.iter().map(|r| r.start_timestamp).min()?;
        let max = self.rows.iter().map(|r| r.start_timestamp).max()?;
        Some((min, max))
    }

    /// Known categorical values used for entity matching
    pub fn catalog(&self) -> Catalog {
        Catalog::from_rows(&self.rows)
    }
}

/// Known values of every categorical column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub equipment: Vec<String>,
    pub product_lines: Vec<String>,
    pub symptoms: Vec<String>,
    pub technicians: Vec<String>,

    /// Most frequent start year, used when a question names a month without a year
    pub default_year: Option<i32>,
}

impl Catalog {
    pub fn from_rows(rows: &[WorkOrderRow]) -> Self {
        let distinct = |dimension: Dimension| -> Vec<String> {
            rows.iter()
                .map(|r| r.value(dimension))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        let mut years: BTreeMap<i32, usize> = BTreeMap::new();
        for row in rows {
            *years.entry(row.start_timestamp.year()).or_default() += 1;
        }
        // max_by_key keeps the last maximum; reversed so ties go to the earliest year
        let default_year = years
            .iter()
            .rev()
            .max_by_key(|(_, count)| **count)
            .map(|(year, _)| *year);

        Self {
            equipment: distinct(Dimension::Equipment),
            product_lines: distinct(Dimension::ProductLine),
            symptoms: distinct(Dimension::Symptom),
            technicians: distinct(Dimension::Technician),
            default_year,
        }
    }

    /// Known values of one dimension, sorted
    pub fn values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Equipment => &self.equipment,
            Dimension::ProductLine => &self.product_lines,
            Dimension::Symptom => &self.symptoms,
            Dimension::Technician => &self.technicians,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "work_order_id,equipment_id,product_line,start_date,start_time,end_date,end_time,description,technician,comment,symptom_code";

    fn csv(lines: &[&str]) -> String {
        let mut out = HEADER.to_string();
        for line in lines {
            out.push('\n');
            out.push_str(line);
        }
        out
    }

    #[test]
    fn test_parses_split_timestamps() {
        let data = csv(&[
            "1001,PRESS-01,Stamping,2024-03-04,08:15:00,2024-03-04,09:00:00,Repair/Stamping/Hydraulics/Leak/Seal,Alice,Oil leak at ram,HYDRAULIC_LEAK",
            "1001,PRESS-01,Stamping,2024-03-04,10:00:00,2024-03-04,11:30:00,Repair/Stamping/Hydraulics/Leak/Seal,Bob,Seal replaced,HYDRAULIC_LEAK",
        ]);

        let dataset = Dataset::from_reader(data.as_bytes()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.distinct_work_orders(), 1);
        let first = &dataset.rows()[0];
        assert_eq!(first.work_order_id, WorkOrderId(1001));
        assert_eq!(first.start_timestamp.to_string(), "2024-03-04 08:15:00");
        assert_eq!(first.technician, "Alice");
    }

    #[test]
    fn test_parses_combined_timestamps_and_float_ids() {
        let data = "work_order_id,equipment_id,product_line,start_timestamp,end_timestamp,description,technician,comment,symptom_code\n\
                    1042.0,CNC-01,Machining,2024-07-01T00:00:00,2024-07-01 02:00:00,Repair/Machining/Spindle,Chen,,SPINDLE_TIMEOUT";

        let dataset = Dataset::from_reader(data.as_bytes()).unwrap();

        assert_eq!(dataset.rows()[0].work_order_id, WorkOrderId(1042));
        assert_eq!(dataset.rows()[0].comment, "");
    }

    #[test]
    fn test_missing_columns_are_named() {
        let data = "work_order_id,equipment_id,start_date\n1,PRESS-01,2024-01-01";

        let err = Dataset::from_reader(data.as_bytes()).unwrap_err();

        match err {
            MaintragError::MissingColumns { columns } => {
                assert!(columns.contains(&"symptom_code".to_string()));
                assert!(columns.contains(&"end_time".to_string()));
                assert!(!columns.contains(&"equipment_id".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_timestamp_reports_line() {
        let data = csv(&[
            "1,PRESS-01,Stamping,2024-01-01,08:00:00,2024-01-01,09:00:00,d,Alice,c,S",
            "2,PRESS-01,Stamping,01/02/2024,08:00:00,2024-01-02,09:00:00,d,Alice,c,S",
        ]);

        let err = Dataset::from_reader(data.as_bytes()).unwrap_err();

        assert!(matches!(err, MaintragError::InvalidRecord { line: 3, .. }), "{err}");
    }

    #[test]
    fn test_bad_work_order_id() {
        let data = csv(&["WO-1,PRESS-01,Stamping,2024-01-01,08:00:00,2024-01-01,09:00:00,d,Alice,c,S"]);

        let err = Dataset::from_reader(data.as_bytes()).unwrap_err();

        assert!(err.to_string().contains("work_order_id"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Dataset::load("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, MaintragError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_load_from_file_records_source() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            csv(&["7,CNC-01,Machining,2023-05-01,08:00:00,2023-05-01,09:00:00,d,Chen,c,S"])
        )
        .unwrap();

        let dataset = Dataset::load(file.path()).unwrap();

        assert_eq!(dataset.source(), Some(file.path()));
        assert_eq!(dataset.rows_for(WorkOrderId(7)).len(), 1);
    }

    #[test]
    fn test_catalog_values_and_default_year() {
        let data = csv(&[
            "1,PRESS-01,Stamping,2023-12-30,08:00:00,2023-12-30,09:00:00,d,Alice,c,HYDRAULIC_LEAK",
            "2,CNC-01,Machining,2024-01-02,08:00:00,2024-01-02,09:00:00,d,,c,SPINDLE_TIMEOUT",
            "3,CNC-01,Machining,2024-02-02,08:00:00,2024-02-02,09:00:00,d,Bob,c,SPINDLE_TIMEOUT",
        ]);

        let catalog = Dataset::from_reader(data.as_bytes()).unwrap().catalog();

        assert_eq!(catalog.equipment, vec!["CNC-01", "PRESS-01"]);
        assert_eq!(catalog.technicians, vec!["Alice", "Bob"]);
        assert_eq!(catalog.values(Dimension::Symptom).len(), 2);
        assert_eq!(catalog.default_year, Some(2024));
    }

    #[test]
    fn test_default_year_tie_prefers_earliest() {
        let data = csv(&[
            "1,PRESS-01,Stamping,2023-06-01,08:00:00,2023-06-01,09:00:00,d,Alice,c,S",
            "2,PRESS-01,Stamping,2024-06-01,08:00:00,2024-06-01,09:00:00,d,Alice,c,S",
        ]);

        let catalog = Dataset::from_reader(data.as_bytes()).unwrap().catalog();

        assert_eq!(catalog.default_year, Some(2023));
    }
}
