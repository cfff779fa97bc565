//! Trial Lookup Service
//!
//! Loads the clinical-trials CSV once and answers condition queries against it.
//! The dataset must contain at least a `Conditions` and a `Status` column; every
//! other column is carried through opaquely.

pub mod chart;

pub use chart::{chart_path, ChartRenderer, PlottersChartRenderer};

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::types::{AppError, AppResult};

pub const CONDITIONS_COLUMN: &str = "Conditions";
pub const STATUS_COLUMN: &str = "Status";

/// Number of matching records copied into a search result
pub const MAX_EXAMPLES: usize = 3;

/// One dataset row. Column order is preserved; empty and NaN cells are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialRecord {
    fields: Map<String, Value>,
}

impl TrialRecord {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }
}

/// Answer to `find_trials`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSearchResult {
    /// The condition exactly as requested
    pub condition: String,
    /// Every match, not just the ones in `examples`
    pub total_trials: usize,
    pub examples: Vec<TrialRecord>,
}

pub struct TrialCatalog {
    columns: Vec<String>,
    records: Vec<TrialRecord>,
    // Lowercased `Conditions` cell per record, same index as `records`
    conditions: Vec<String>,
    statuses: Vec<Option<String>>,
}

impl TrialCatalog {
    /// Load the dataset from disk. A missing file is an error, never an empty catalog.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.is_file() {
            return Err(AppError::Dataset(format!(
                "Trial dataset not found at {}",
                path.display()
            )));
        }

        let file = std::fs::File::open(path).map_err(|e| {
            AppError::Dataset(format!("Failed to open dataset {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_reader(file)?;

        info!(
            path = %path.display(),
            records = catalog.len(),
            columns = catalog.columns.len(),
            "Trial dataset loaded"
        );
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let conditions_idx = column_index(&columns, CONDITIONS_COLUMN)?;
        let status_idx = column_index(&columns, STATUS_COLUMN)?;

        let mut records = Vec::new();
        let mut conditions = Vec::new();
        let mut statuses = Vec::new();

        for row in rdr.records() {
            let row = row?;

            let mut fields = Map::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                fields.insert(column.clone(), parse_cell(row.get(idx).unwrap_or("")));
            }

            conditions.push(row.get(conditions_idx).unwrap_or("").to_lowercase());
            statuses.push(
                row.get(status_idx)
                    .map(str::trim)
                    .filter(|s| !is_missing(s))
                    .map(str::to_string),
            );
            records.push(TrialRecord { fields });
        }

        Ok(Self {
            columns,
            records,
            conditions,
            statuses,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Case-insensitive substring search over the `Conditions` column.
    ///
    /// A blank condition matches nothing.
    pub fn find_trials(&self, condition: &str) -> TrialSearchResult {
        let needle = condition.trim().to_lowercase();

        let matches: Vec<usize> = if needle.is_empty() {
            Vec::new()
        } else {
            self.conditions
                .iter()
                .enumerate()
                .filter(|(_, c)| c.contains(&needle))
                .map(|(idx, _)| idx)
                .collect()
        };

        debug!(condition = %condition, matches = matches.len(), "Trial lookup");

        TrialSearchResult {
            condition: condition.to_string(),
            total_trials: matches.len(),
            examples: matches
                .iter()
                .take(MAX_EXAMPLES)
                .map(|idx| self.records[*idx].clone())
                .collect(),
        }
    }

    /// Record counts per status, most frequent first. Records without a status are skipped.
    pub fn status_counts(&self) -> Vec<(String, usize)> {
        let mut by_status: HashMap<&str, usize> = HashMap::new();
        for status in self.statuses.iter().flatten() {
            *by_status.entry(status.as_str()).or_insert(0) += 1;
        }

        let mut counts: Vec<(String, usize)> = by_status
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}

fn column_index(columns: &[String], name: &str) -> AppResult<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| AppError::Dataset(format!("Dataset is missing required column '{}'", name)))
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("nan")
}

fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(num) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(num);
    }
    Value::String(raw.to_string())
}
