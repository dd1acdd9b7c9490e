//! FILENAME: pivot-engine/src/input.rs
//! Record ingestion and derived attributes.
//!
//! Parsing raw text is the caller's job. This module accepts already-parsed
//! JSON rows (objects, or arrays with a header row) and turns them into flat
//! records, skipping anything that is not a flat attribute/value mapping.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::error::PivotError;
use crate::value::{Record, Value};

// ============================================================================
// JSON INGESTION
// ============================================================================

/// Records accepted from an ingestion run, plus the rows that were rejected.
#[derive(Debug, Default)]
pub struct Ingested {
    pub records: Vec<Record>,
    pub skipped: Vec<PivotError>,
}

/// Converts a scalar JSON value. Nested arrays and objects are not scalars.
fn scalar(value: &Json) -> Option<Value> {
    match value {
        Json::Null => Some(Value::Null),
        Json::Bool(b) => Some(Value::Text(b.to_string())),
        Json::Number(n) => n.as_f64().map(Value::number),
        Json::String(s) => Some(Value::Text(s.clone())),
        Json::Array(_) | Json::Object(_) => None,
    }
}

fn shape_error(index: usize, reason: impl Into<String>) -> PivotError {
    PivotError::DataShape {
        index,
        reason: reason.into(),
    }
}

/// Ingests an array of JSON objects, or an array of arrays whose first row
/// holds the attribute names. Offending rows are skipped and reported.
pub fn records_from_json(rows: &[Json]) -> Ingested {
    let mut ingested = Ingested::default();

    let tabular = matches!(rows.first(), Some(Json::Array(_)));
    if tabular {
        ingest_tabular(rows, &mut ingested);
    } else {
        for (index, row) in rows.iter().enumerate() {
            match object_record(index, row) {
                Ok(record) => ingested.records.push(record),
                Err(e) => ingested.skipped.push(e),
            }
        }
    }

    for e in &ingested.skipped {
        crate::log_warn!("INPUT", "skipped record: {}", e);
    }
    crate::log_debug!(
        "INPUT",
        "ingested {} records, skipped {}",
        ingested.records.len(),
        ingested.skipped.len()
    );

    ingested
}

fn object_record(index: usize, row: &Json) -> Result<Record, PivotError> {
    let object = row
        .as_object()
        .ok_or_else(|| shape_error(index, "row is not an object"))?;

    let mut record = Record::new();
    for (attr, value) in object {
        let value = scalar(value)
            .ok_or_else(|| shape_error(index, format!("attribute '{}' is not a scalar", attr)))?;
        record.insert(attr.clone(), value);
    }
    Ok(record)
}

fn ingest_tabular(rows: &[Json], ingested: &mut Ingested) {
    let header: Vec<String> = match rows[0].as_array() {
        Some(cells) => {
            let names: Option<Vec<String>> = cells
                .iter()
                .map(|c| c.as_str().map(str::to_string))
                .collect();
            match names {
                Some(names) => names,
                None => {
                    // Without a usable header no row can be interpreted
                    for index in 0..rows.len() {
                        ingested
                            .skipped
                            .push(shape_error(index, "header row must contain only strings"));
                    }
                    return;
                }
            }
        }
        None => return,
    };

    for (index, row) in rows.iter().enumerate().skip(1) {
        let Some(cells) = row.as_array() else {
            ingested.skipped.push(shape_error(index, "row is not an array"));
            continue;
        };

        let mut record = Record::new();
        let mut flat = true;
        for (attr, cell) in header.iter().zip(cells.iter()) {
            match scalar(cell) {
                Some(value) => record.insert(attr.clone(), value),
                None => {
                    flat = false;
                    break;
                }
            }
        }

        if flat {
            ingested.records.push(record);
        } else {
            ingested.skipped.push(shape_error(index, "row contains a nested value"));
        }
    }
}

// ============================================================================
// DERIVED ATTRIBUTES
// ============================================================================

/// A function computing one derived attribute from a record.
pub type Deriver = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// Ordered set of named derived attributes, applied before indexing.
/// Later derivers see the output of earlier ones.
#[derive(Clone, Default)]
pub struct Derivation {
    derivers: Vec<(String, Deriver)>,
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.derivers.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Derivation").field("derivers", &names).finish()
    }
}

impl Derivation {
    pub fn new() -> Self {
        Derivation::default()
    }

    pub fn with(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Record) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.derivers.push((name.into(), Arc::new(f)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.derivers.is_empty()
    }

    /// Returns a copy of the record with every derived attribute merged in.
    pub fn apply(&self, record: &Record) -> Record {
        let mut derived = record.clone();
        for (name, f) in &self.derivers {
            let value = f(&derived);
            derived.insert(name.clone(), value);
        }
        derived
    }
}

/// Built-in derivers.
pub mod derivers {
    use super::*;

    /// Rounds a numeric attribute down to a multiple of `width`.
    /// Non-numeric values (and a non-positive width) derive `Null`.
    pub fn bin(attr: impl Into<String>, width: f64) -> impl Fn(&Record) -> Value + Send + Sync {
        let attr = attr.into();
        move |record: &Record| match record.get(&attr).as_number() {
            Some(n) if width > 0.0 => Value::number(n - n.rem_euclid(width)),
            _ => Value::Null,
        }
    }
}
