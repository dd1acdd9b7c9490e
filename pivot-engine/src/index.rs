//! FILENAME: pivot-engine/src/index.rs
//! Attribute Value Index - per-attribute distinct values and their counts.
//!
//! Built in the same linear pass that materializes the input (derived
//! attributes merged in). For every attribute the per-value counts sum to
//! the number of records processed: an attribute first seen after N records
//! is back-filled with a `Null` count of N.

use rustc_hash::FxHashMap;

use crate::input::Derivation;
use crate::sort::SortResolver;
use crate::value::{Record, Value};

/// Mapping attribute → (value → occurrence count). Values are stored in
/// their canonical form, matching the components of row and column keys.
#[derive(Debug, Clone, Default)]
pub struct AttributeIndex {
    /// Attribute names in first-seen order.
    names: Vec<String>,

    counts: FxHashMap<String, FxHashMap<Value, usize>>,

    record_count: usize,
}

impl AttributeIndex {
    pub fn new() -> Self {
        AttributeIndex::default()
    }

    /// Credits one record to the index.
    pub fn add_record(&mut self, record: &Record) {
        for attr in record.attributes() {
            if !self.counts.contains_key(attr) {
                let mut values = FxHashMap::default();
                if self.record_count > 0 {
                    values.insert(Value::Null, self.record_count);
                }
                self.counts.insert(attr.to_string(), values);
                self.names.push(attr.to_string());
            }
        }

        for attr in &self.names {
            if let Some(values) = self.counts.get_mut(attr) {
                *values.entry(record.get(attr).canonical()).or_insert(0) += 1;
            }
        }

        self.record_count += 1;
    }

    /// Attribute names in first-seen order.
    pub fn attribute_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.counts.contains_key(attr)
    }

    pub fn value_counts(&self, attr: &str) -> Option<&FxHashMap<Value, usize>> {
        self.counts.get(attr)
    }

    pub fn count(&self, attr: &str, value: &Value) -> usize {
        self.counts
            .get(attr)
            .and_then(|values| values.get(&value.canonical()))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of the per-value counts for an attribute.
    pub fn total(&self, attr: &str) -> usize {
        self.counts
            .get(attr)
            .map(|values| values.values().sum())
            .unwrap_or(0)
    }

    /// Number of distinct values (including `Null`) for an attribute.
    pub fn unique_count(&self, attr: &str) -> usize {
        self.counts.get(attr).map_or(0, |values| values.len())
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Distinct values of an attribute ordered by its resolved comparator.
    pub fn sorted_values(&self, attr: &str, resolver: &SortResolver) -> Vec<&Value> {
        let mut values: Vec<&Value> = self
            .counts
            .get(attr)
            .map(|values| values.keys().collect())
            .unwrap_or_default();
        let sorter = resolver.resolve(attr);
        values.sort_by(|a, b| sorter.compare(a, b));
        values
    }
}

// ============================================================================
// MATERIALIZED INPUT
// ============================================================================

/// Derivation-applied records together with their attribute index.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    pub records: Vec<Record>,
    pub index: AttributeIndex,
}

/// Applies the derivation to every record and indexes the result in one pass.
/// Input records are never mutated.
pub fn materialize<'a, I>(records: I, derivation: &Derivation) -> Materialized
where
    I: IntoIterator<Item = &'a Record>,
{
    crate::log_enter!("INDEX", "materialize");

    let mut materialized = Materialized::default();
    for record in records {
        let record = if derivation.is_empty() {
            record.clone()
        } else {
            derivation.apply(record)
        };
        materialized.index.add_record(&record);
        materialized.records.push(record);
    }

    crate::log_exit!(
        "INDEX",
        "materialize",
        "records={} attributes={}",
        materialized.records.len(),
        materialized.index.attribute_names().len()
    );

    materialized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_counts_distinct_values() {
        let records = vec![
            rec(&[("Gender", "M"), ("Meal", "Lunch")]),
            rec(&[("Gender", "F"), ("Meal", "Dinner")]),
            rec(&[("Gender", "M"), ("Meal", "Dinner")]),
        ];
        let m = materialize(&records, &Derivation::new());

        assert_eq!(m.index.record_count(), 3);
        assert_eq!(m.index.count("Gender", &Value::text("M")), 2);
        assert_eq!(m.index.count("Meal", &Value::text("Dinner")), 2);
        assert_eq!(m.index.unique_count("Meal"), 2);
        assert_eq!(m.index.attribute_names(), &["Gender".to_string(), "Meal".to_string()]);
    }

    #[test]
    fn test_late_attribute_backfills_null() {
        let records = vec![
            rec(&[("a", "1")]),
            rec(&[("a", "2")]),
            rec(&[("a", "3"), ("b", "x")]),
            rec(&[("a", "4")]),
        ];
        let m = materialize(&records, &Derivation::new());

        // Two records before "b" appeared, one after without it
        assert_eq!(m.index.count("b", &Value::Null), 3);
        assert_eq!(m.index.count("b", &Value::text("x")), 1);
        for attr in m.index.attribute_names() {
            assert_eq!(m.index.total(attr), 4);
        }
    }

    #[test]
    fn test_derived_attributes_are_indexed() {
        let records = vec![rec(&[("Tip", "3")]), rec(&[("Tip", "7")])];
        let derivation = Derivation::new().with("Big", |r: &Record| {
            Value::text(if r.get("Tip").as_number().unwrap_or(0.0) > 5.0 { "yes" } else { "no" })
        });
        let m = materialize(&records, &derivation);

        assert_eq!(m.index.count("Big", &Value::text("yes")), 1);
        assert_eq!(m.records[1].get("Big"), &Value::text("yes"));
        assert!(!records[1].contains("Big"));
    }

    #[test]
    fn test_sorted_values_use_resolver() {
        let records = vec![rec(&[("n", "10")]), rec(&[("n", "9")]), rec(&[("n", "x")])];
        let m = materialize(&records, &Derivation::new());
        let sorted: Vec<String> = m
            .index
            .sorted_values("n", &SortResolver::new())
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(sorted, vec!["9", "10", "x"]);
    }

    #[test]
    fn test_number_and_numeric_text_count_as_one_value() {
        let records: Vec<Record> = vec![
            [("Size", Value::from(2))].into_iter().collect(),
            [("Size", Value::from("2"))].into_iter().collect(),
        ];
        let m = materialize(&records, &Derivation::new());
        assert_eq!(m.index.unique_count("Size"), 1);
        assert_eq!(m.index.count("Size", &Value::text("2")), 2);
        assert_eq!(m.index.count("Size", &Value::number(2.0)), 2);
    }

    #[test]
    fn test_empty_input() {
        let m = materialize(&[], &Derivation::new());
        assert_eq!(m.index.record_count(), 0);
        assert!(m.index.attribute_names().is_empty());
        assert_eq!(m.index.total("anything"), 0);
    }
}
