//! Core data structures for the momentum scoreboard
//!
//! All of these are transient: built fresh for one run and dropped after
//! the export.

use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One timestamped price reading for an event
///
/// `fields` carries every other column measured at the same read (the price
/// column included). They travel through the pipeline unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub event_id: String,
    pub utc_read_time: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl Observation {
    pub fn new(event_id: impl Into<String>, utc_read_time: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.into(),
            utc_read_time,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Read the designated price column
    ///
    /// Missing, null and non-numeric values are shape errors.
    pub fn price(&self, price_field: &str) -> Result<f64, PipelineError> {
        match self.fields.get(price_field) {
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                PipelineError::DataShape(format!(
                    "event {}: {} is not representable as f64",
                    self.event_id, price_field
                ))
            }),
            Some(other) => Err(PipelineError::DataShape(format!(
                "event {} at {}: {} is not numeric ({})",
                self.event_id, self.utc_read_time, price_field, other
            ))),
            None => Err(PipelineError::DataShape(format!(
                "event {} at {}: missing price field {}",
                self.event_id, self.utc_read_time, price_field
            ))),
        }
    }
}

/// Observation plus its derived momentum fields
#[derive(Debug, Clone)]
pub struct MomentumRecord {
    pub observation: Observation,
    /// NaN for the first observation of an event
    pub pct_change: f64,
    /// NaN for the first observation of an event
    pub log_return: f64,
    pub log_return_cumsum: f64,
    pub pct_change_cumsum: f64,
}

impl MomentumRecord {
    pub fn event_id(&self) -> &str {
        &self.observation.event_id
    }

    pub fn utc_read_time(&self) -> DateTime<Utc> {
        self.observation.utc_read_time
    }
}

/// One row per event: the latest cumulative percent change
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreboardRow {
    pub event_id: String,
    pub score: f64,
}

/// Nested event record from the ticket catalog, keyed by string id
#[derive(Debug, Clone, PartialEq)]
pub struct EventMetadata {
    pub id: String,
    /// Full record as returned, including `venue` and `stats` sub-records
    pub fields: Map<String, Value>,
}

impl EventMetadata {
    /// Build from a raw catalog record, normalizing the id to string form
    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        let fields = match value {
            Value::Object(map) => map,
            other => {
                return Err(PipelineError::DataShape(format!(
                    "event record is not an object: {}",
                    other
                )))
            }
        };

        let id = match fields.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(other) => {
                return Err(PipelineError::DataShape(format!(
                    "event record has unusable id: {}",
                    other
                )))
            }
            None => {
                return Err(PipelineError::DataShape(
                    "event record has no id".to_string(),
                ))
            }
        };

        Ok(Self { id, fields })
    }
}

/// A single cell of the export table; never null
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl ExportValue {
    /// The fill value for anything missing
    pub const MISSING: ExportValue = ExportValue::Number(0.0);

    /// Numeric cell; NaN and infinities become the fill value
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            ExportValue::Number(value)
        } else {
            Self::MISSING
        }
    }

    /// Convert a raw JSON value. Nested arrays/objects are kept as JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::MISSING,
            Value::Bool(b) => ExportValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(Self::number).unwrap_or(Self::MISSING),
            Value::String(s) => ExportValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => ExportValue::Text(value.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ExportValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::from(0)),
            ExportValue::Text(s) => Value::String(s.clone()),
            ExportValue::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Wide, flat export table: every row has a value for every column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ExportValue>>,
}

impl ExportTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&ExportValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Rows as JSON objects with keys in column order
    pub fn row_objects(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(ExportValue::to_json))
                    .collect()
            })
            .collect()
    }
}
