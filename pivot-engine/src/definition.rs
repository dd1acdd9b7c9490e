//! FILENAME: pivot-engine/src/definition.rs
//! Pivot Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a pivot.
//! These structures are designed to be:
//! - Serializable (camelCase JSON, as the widget layer sends them)
//! - Replaced wholesale on every change (no incremental deltas)
//! - Validated once per build; queries never re-check them

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PivotError;

/// Attribute → set of value display strings removed from aggregation.
pub type ValueFilter = BTreeMap<String, BTreeSet<String>>;

/// Attribute → set of allowed value display strings (drill-down criteria).
pub type Criteria = BTreeMap<String, BTreeSet<String>>;

// ============================================================================
// SORT MODE
// ============================================================================

/// How an axis orders its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortMode {
    /// Component-wise by each attribute's comparator.
    #[default]
    KeyAToZ,
    /// Ascending by the key's total against the opposite axis.
    ValueAToZ,
    /// Descending by the key's total against the opposite axis.
    ValueZToA,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::KeyAToZ => "key_a_to_z",
            SortMode::ValueAToZ => "value_a_to_z",
            SortMode::ValueZToA => "value_z_to_a",
        }
    }
}

impl FromStr for SortMode {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key_a_to_z" => Ok(SortMode::KeyAToZ),
            "value_a_to_z" => Ok(SortMode::ValueAToZ),
            "value_z_to_a" => Ok(SortMode::ValueZToA),
            other => Err(PivotError::UnknownSortMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for SortMode {
    type Error = PivotError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SortMode> for String {
    fn from(mode: SortMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// GROUPING
// ============================================================================

/// Subtotal layout for the grouped axis view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupingOptions {
    /// Interleave subtotal (prefix) entries into the axis layout.
    pub enabled: bool,

    /// Row subtotals precede their group's members instead of following them.
    pub row_group_before: bool,

    /// Column subtotals precede their group's members instead of following them.
    pub col_group_before: bool,

    /// Row headers share one indented column instead of one column per
    /// row attribute. Indentation comes from `AxisEntry::depth`.
    pub compact_rows: bool,
}

// ============================================================================
// MAIN CONFIG STRUCT
// ============================================================================

fn default_aggregator() -> String {
    "Count".to_string()
}

/// The complete description of a pivot. Any change rebuilds from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PivotConfig {
    /// Row attributes (outer to inner).
    pub rows: Vec<String>,

    /// Column attributes (outer to inner).
    pub cols: Vec<String>,

    /// Value attributes fed to the aggregator.
    pub vals: Vec<String>,

    /// Registry name of the aggregator recipe.
    #[serde(default = "default_aggregator")]
    pub aggregator_name: String,

    /// Values excluded from aggregation, per attribute.
    pub value_filter: ValueFilter,

    pub row_order: SortMode,

    pub col_order: SortMode,

    /// Explicit value orderings, per attribute.
    pub sorters: BTreeMap<String, Vec<String>>,

    pub grouping: GroupingOptions,
}

impl Default for PivotConfig {
    fn default() -> Self {
        PivotConfig {
            rows: Vec::new(),
            cols: Vec::new(),
            vals: Vec::new(),
            aggregator_name: default_aggregator(),
            value_filter: ValueFilter::new(),
            row_order: SortMode::KeyAToZ,
            col_order: SortMode::KeyAToZ,
            sorters: BTreeMap::new(),
            grouping: GroupingOptions::default(),
        }
    }
}

impl PivotConfig {
    pub fn new() -> Self {
        PivotConfig::default()
    }

    pub fn rows<S: Into<String>>(mut self, attrs: impl IntoIterator<Item = S>) -> Self {
        self.rows = attrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn cols<S: Into<String>>(mut self, attrs: impl IntoIterator<Item = S>) -> Self {
        self.cols = attrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn vals<S: Into<String>>(mut self, attrs: impl IntoIterator<Item = S>) -> Self {
        self.vals = attrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn aggregator(mut self, name: impl Into<String>) -> Self {
        self.aggregator_name = name.into();
        self
    }

    /// Excludes one more value of an attribute.
    pub fn exclude(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
        self.value_filter
            .entry(attr.into())
            .or_default()
            .insert(value.into());
        self
    }

    pub fn row_order(mut self, mode: SortMode) -> Self {
        self.row_order = mode;
        self
    }

    pub fn col_order(mut self, mode: SortMode) -> Self {
        self.col_order = mode;
        self
    }

    /// Sets an explicit ordering list for an attribute.
    pub fn sort_as<S: Into<String>>(
        mut self,
        attr: impl Into<String>,
        order: impl IntoIterator<Item = S>,
    ) -> Self {
        self.sorters
            .insert(attr.into(), order.into_iter().map(Into::into).collect());
        self
    }

    pub fn grouping(mut self, grouping: GroupingOptions) -> Self {
        self.grouping = grouping;
        self
    }

    /// Parses a configuration; unknown sort modes surface as configuration errors.
    pub fn from_json(json: &str) -> Result<Self, PivotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PivotError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_mode_names() {
        assert_eq!("value_z_to_a".parse::<SortMode>().unwrap(), SortMode::ValueZToA);
        assert_eq!(SortMode::KeyAToZ.to_string(), "key_a_to_z");
        let err = "random".parse::<SortMode>().unwrap_err();
        assert!(matches!(err, PivotError::UnknownSortMode(ref s) if s == "random"));
    }

    #[test]
    fn test_config_defaults() {
        let config = PivotConfig::from_json("{}").unwrap();
        assert_eq!(config, PivotConfig::default());
        assert_eq!(config.aggregator_name, "Count");
        assert_eq!(config.row_order, SortMode::KeyAToZ);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "rows": ["Payer Gender", "Meal"],
            "cols": ["Party Size"],
            "vals": ["Tip"],
            "aggregatorName": "Sum",
            "valueFilter": {"Meal": ["Lunch"]},
            "rowOrder": "value_z_to_a",
            "sorters": {"Meal": ["Lunch", "Dinner"]},
            "grouping": {"enabled": true, "rowGroupBefore": true, "compactRows": true}
        }"#;
        let config = PivotConfig::from_json(json).unwrap();

        assert_eq!(config.rows, vec!["Payer Gender", "Meal"]);
        assert_eq!(config.aggregator_name, "Sum");
        assert!(config.value_filter["Meal"].contains("Lunch"));
        assert_eq!(config.row_order, SortMode::ValueZToA);
        assert_eq!(config.col_order, SortMode::KeyAToZ);
        assert!(config.grouping.enabled && config.grouping.row_group_before);
        assert!(!config.grouping.col_group_before);
        assert!(config.grouping.compact_rows);
    }

    #[test]
    fn test_unknown_sort_mode_in_json_is_configuration_error() {
        let err = PivotConfig::from_json(r#"{"colOrder": "sideways"}"#).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("sideways"));
    }

    #[test]
    fn test_builder_round_trips_through_json() {
        let config = PivotConfig::new()
            .rows(["Gender"])
            .cols(["Meal"])
            .vals(["Tip"])
            .aggregator("Sum")
            .exclude("Gender", "F")
            .sort_as("Meal", ["Lunch", "Dinner"]);
        let json = config.to_json().unwrap();
        assert_eq!(PivotConfig::from_json(&json).unwrap(), config);
    }
}
