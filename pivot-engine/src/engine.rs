//! FILENAME: pivot-engine/src/engine.rs
//! Pivot Engine - builds a pivot from materialized input and answers queries.
//!
//! This module takes a PivotConfig (configuration) and the materialized
//! records (data) and produces a PivotData (the queryable result).
//!
//! Algorithm:
//! 1. Resolve the aggregator recipe and the per-attribute sorters
//! 2. Build the pivot tree in one filtered pass (cells and every margin)
//! 3. Order the observed row and column keys (key order or value order)
//! 4. Answer point queries, applying fraction-of recipes against margins
//!
//! Every configuration change is a full rebuild. A failed build leaves the
//! previously built pivot untouched.

use std::sync::Arc;

use crate::aggregator::{Accumulator, AggregatorRegistry, FractionBase, Recipe, RecipeArgs};
use crate::definition::{Criteria, PivotConfig};
use crate::error::PivotError;
use crate::index::{materialize, AttributeIndex, Materialized};
use crate::input::Derivation;
use crate::keys::sort_keys;
use crate::layout::{flatten_axis, plain_axis, AxisEntry};
use crate::number_format::NumberFormat;
use crate::sort::SortResolver;
use crate::tree::{passes_filter, PivotTree};
use crate::value::{Key, Record, Value};

// ============================================================================
// AGGREGATOR VIEW
// ============================================================================

/// Read-only result of a cell lookup.
#[derive(Debug, Clone)]
pub struct AggregatorView<'a> {
    value: Value,
    recipe: &'a Recipe,
}

impl AggregatorView<'_> {
    /// The aggregate, or `Null` when undefined. Renderers omit `Null`.
    pub fn value(&self) -> Value {
        self.value.clone()
    }

    pub fn is_defined(&self) -> bool {
        !self.value.is_null()
    }

    /// Formats any value with this aggregator's number format.
    pub fn format(&self, value: &Value) -> String {
        self.recipe.format().format_value(value)
    }

    /// The cell's own value, formatted.
    pub fn formatted(&self) -> String {
        self.format(&self.value)
    }

    pub fn number_format(&self) -> &NumberFormat {
        self.recipe.format()
    }

    pub fn num_inputs(&self) -> usize {
        self.recipe.num_inputs()
    }
}

// ============================================================================
// PIVOT DATA
// ============================================================================

/// One built pivot: the tree, its ordered keys and the configuration
/// that produced it.
pub struct PivotData {
    input: Arc<Materialized>,
    config: PivotConfig,
    recipe: Recipe,
    tree: PivotTree,
    row_keys: Vec<Key>,
    col_keys: Vec<Key>,
}

impl std::fmt::Debug for PivotData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PivotData")
            .field("aggregator", &self.config.aggregator_name)
            .field("rows", &self.config.rows)
            .field("cols", &self.config.cols)
            .field("tree", &self.tree)
            .finish()
    }
}

impl PivotData {
    /// Builds a pivot. Fails only on configuration errors.
    pub fn build(
        input: Arc<Materialized>,
        config: &PivotConfig,
        registry: &AggregatorRegistry,
    ) -> Result<Self, PivotError> {
        crate::log_enter!(
            "PIVOT",
            "build",
            "aggregator={} rows={:?} cols={:?} vals={:?}",
            config.aggregator_name,
            config.rows,
            config.cols,
            config.vals
        );

        let recipe = registry.get(&config.aggregator_name)?.clone();
        let sorters = SortResolver::from_orders(&config.sorters);
        let factory = recipe.factory(&RecipeArgs {
            vals: &config.vals,
            sorters: &sorters,
        });

        let tree = PivotTree::build(
            &input.records,
            &config.rows,
            &config.cols,
            &config.value_filter,
            &factory,
        );

        let mut pivot = PivotData {
            input,
            config: config.clone(),
            recipe,
            tree,
            row_keys: Vec::new(),
            col_keys: Vec::new(),
        };

        let row_keys = pivot.ordered_keys(true, &sorters);
        let col_keys = pivot.ordered_keys(false, &sorters);
        pivot.row_keys = row_keys;
        pivot.col_keys = col_keys;

        crate::log_exit!(
            "PIVOT",
            "build",
            "row_keys={} col_keys={} filtered_records={}",
            pivot.row_keys.len(),
            pivot.col_keys.len(),
            pivot.tree.filtered_records()
        );

        Ok(pivot)
    }

    /// Observed full keys of one axis in configured order. An axis without
    /// attributes has exactly the empty key.
    fn ordered_keys(&self, is_row: bool, sorters: &SortResolver) -> Vec<Key> {
        let (attrs, observed, mode) = if is_row {
            (&self.config.rows, self.tree.row_keys(), self.config.row_order)
        } else {
            (&self.config.cols, self.tree.col_keys(), self.config.col_order)
        };

        if attrs.is_empty() {
            return vec![Key::new()];
        }

        let mut keys = observed.to_vec();
        sort_keys(&mut keys, attrs, mode, sorters, |key| {
            if is_row {
                self.cell_value(key, &[])
            } else {
                self.cell_value(&[], key)
            }
        });
        keys
    }

    /// Value at a (row, column) pair, with fraction-of recipes divided by
    /// their margin.
    fn cell_value(&self, row: &[Value], col: &[Value]) -> Value {
        let Some(acc) = self.tree.get(row, col) else {
            return Value::Null;
        };
        let value = acc.value();

        let Some(base) = self.recipe.fraction_base() else {
            return value;
        };
        let denominator = match base {
            FractionBase::Total => self.tree.get(&[], &[]),
            FractionBase::Row => self.tree.get(row, &[]),
            FractionBase::Col => self.tree.get(&[], col),
        };

        fraction(&value, denominator)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Ordered full row keys.
    pub fn row_keys(&self) -> &[Key] {
        &self.row_keys
    }

    /// Ordered full column keys.
    pub fn col_keys(&self) -> &[Key] {
        &self.col_keys
    }

    /// Accumulator view for any (row, column) pair, prefixes and the empty
    /// key included. Never fails; unpopulated pairs report `Null`.
    pub fn get_aggregator(&self, row: &[Value], col: &[Value]) -> AggregatorView<'_> {
        AggregatorView {
            value: self.cell_value(row, col),
            recipe: &self.recipe,
        }
    }

    /// Visits every non-excluded record whose display strings match the
    /// criteria. Each criterion lists the allowed strings for one attribute;
    /// an empty list allows nothing.
    pub fn for_each_matching_record<F>(&self, criteria: &Criteria, mut callback: F)
    where
        F: FnMut(&Record),
    {
        for record in &self.input.records {
            if !passes_filter(record, &self.config.value_filter) {
                continue;
            }
            let matches = criteria
                .iter()
                .all(|(attr, allowed)| allowed.contains(record.get(attr).as_str().as_ref()));
            if matches {
                callback(record);
            }
        }
    }

    /// Criteria selecting the records of a (row, column) pair. Prefixes
    /// constrain only the attributes they cover.
    pub fn criteria_for(&self, row: &[Value], col: &[Value]) -> Criteria {
        let mut criteria = Criteria::new();
        let pairs = self
            .config
            .rows
            .iter()
            .zip(row)
            .chain(self.config.cols.iter().zip(col));
        for (attr, value) in pairs {
            criteria
                .entry(attr.clone())
                .or_default()
                .insert(value.as_str().into_owned());
        }
        criteria
    }

    /// Records behind a full (row key, column key) cell, in input order.
    pub fn contributing_records(
        &self,
        row: &[Value],
        col: &[Value],
    ) -> impl Iterator<Item = &Record> + '_ {
        let records = &self.input.records;
        self.tree
            .members(row, col)
            .iter()
            .filter_map(move |&i| records.get(i))
    }

    /// Display title, e.g. "Sum of Tip" or "Count".
    pub fn aggregator_title(&self) -> String {
        let inputs: Vec<&str> = self
            .config
            .vals
            .iter()
            .take(self.recipe.num_inputs())
            .map(String::as_str)
            .collect();
        if inputs.is_empty() {
            self.config.aggregator_name.clone()
        } else {
            format!("{} of {}", self.config.aggregator_name, inputs.join(", "))
        }
    }

    /// Row axis for rendering; subtotal entries when grouping is enabled.
    pub fn row_axis(&self) -> Vec<AxisEntry> {
        let grouping = &self.config.grouping;
        if grouping.enabled {
            flatten_axis(&self.row_keys, grouping.row_group_before)
        } else {
            plain_axis(&self.row_keys)
        }
    }

    /// Column axis for rendering; subtotal entries when grouping is enabled.
    pub fn col_axis(&self) -> Vec<AxisEntry> {
        let grouping = &self.config.grouping;
        if grouping.enabled {
            flatten_axis(&self.col_keys, grouping.col_group_before)
        } else {
            plain_axis(&self.col_keys)
        }
    }

    /// Number of header columns a renderer reserves for the row axis: one
    /// per row attribute, or a single indented column for compact grouped rows.
    pub fn row_header_columns(&self) -> usize {
        let grouping = &self.config.grouping;
        if grouping.enabled && grouping.compact_rows {
            self.config.rows.len().min(1)
        } else {
            self.config.rows.len()
        }
    }

    pub fn config(&self) -> &PivotConfig {
        &self.config
    }

    pub fn records(&self) -> &[Record] {
        &self.input.records
    }

    /// Number of records that survived the exclusion filter.
    pub fn filtered_record_count(&self) -> usize {
        self.tree.filtered_records()
    }
}

/// `value / denominator`, or `Null` when either side is missing,
/// non-numeric or non-finite, or the denominator is zero.
fn fraction(value: &Value, denominator: Option<&dyn Accumulator>) -> Value {
    let numerator = value.as_finite();
    let denominator = denominator.and_then(|acc| acc.value().as_finite());
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => {
            let ratio = n / d;
            if ratio.is_finite() {
                Value::number(ratio)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Owns the materialized input and the current pivot.
pub struct PivotEngine {
    input: Arc<Materialized>,
    derivation: Derivation,
    registry: AggregatorRegistry,
    config: Option<PivotConfig>,
    pivot: Option<PivotData>,
}

impl std::fmt::Debug for PivotEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PivotEngine")
            .field("records", &self.input.records.len())
            .field("derivation", &self.derivation)
            .field("pivot", &self.pivot)
            .finish()
    }
}

impl PivotEngine {
    /// Materializes the input with the built-in aggregator registry.
    pub fn new(records: &[Record], derivation: Derivation) -> Self {
        let input = Arc::new(materialize(records, &derivation));
        crate::log_info!(
            "PIVOT",
            "engine ready: records={} attributes={}",
            input.records.len(),
            input.index.attribute_names().len()
        );
        PivotEngine {
            input,
            derivation,
            registry: AggregatorRegistry::builtin(),
            config: None,
            pivot: None,
        }
    }

    /// Replaces the aggregator registry. Takes effect on the next build.
    pub fn with_registry(mut self, registry: AggregatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &AggregatorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AggregatorRegistry {
        &mut self.registry
    }

    /// Builds a new pivot. On error the previous pivot stays current.
    pub fn configure(&mut self, config: PivotConfig) -> Result<&PivotData, PivotError> {
        match PivotData::build(Arc::clone(&self.input), &config, &self.registry) {
            Ok(pivot) => {
                self.config = Some(config);
                Ok(&*self.pivot.insert(pivot))
            }
            Err(e) => {
                crate::log_warn!("PIVOT", "configure rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Parses a JSON configuration and builds it.
    pub fn configure_json(&mut self, json: &str) -> Result<&PivotData, PivotError> {
        let config = PivotConfig::from_json(json).map_err(|e| {
            crate::log_warn!("PIVOT", "configure rejected: {}", e);
            e
        })?;
        self.configure(config)
    }

    /// Replaces the input and rebuilds with the last good configuration.
    pub fn set_records(&mut self, records: &[Record]) -> Result<(), PivotError> {
        self.input = Arc::new(materialize(records, &self.derivation));
        self.pivot = None;

        if let Some(config) = &self.config {
            let pivot = PivotData::build(Arc::clone(&self.input), config, &self.registry)?;
            self.pivot = Some(pivot);
        }
        Ok(())
    }

    /// Drops the current pivot. The input and last configuration are kept.
    pub fn clear(&mut self) {
        crate::log_debug!("PIVOT", "pivot cleared");
        self.pivot = None;
    }

    pub fn pivot(&self) -> Option<&PivotData> {
        self.pivot.as_ref()
    }

    pub fn config(&self) -> Option<&PivotConfig> {
        self.config.as_ref()
    }

    pub fn index(&self) -> &AttributeIndex {
        &self.input.index
    }

    pub fn records(&self) -> &[Record] {
        &self.input.records
    }
}
