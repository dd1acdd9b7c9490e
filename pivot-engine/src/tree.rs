//! FILENAME: pivot-engine/src/tree.rs
//! Pivot Tree - one filtered pass building every cell and margin.
//!
//! For each surviving record the accumulator of every (row prefix, column
//! prefix) pair is pushed, from `([], [])` (grand total) down to the full
//! (row key, column key) cell. Margins are therefore exact under any filter
//! without a separate roll-up pass. The cost is
//! O(records × (row depth + 1) × (column depth + 1)) accumulator touches,
//! which stays small because pivots rarely use more than a few attributes
//! per axis.

use rustc_hash::FxHashMap;

use crate::aggregator::{Accumulator, AccumulatorFactory};
use crate::definition::ValueFilter;
use crate::keys::KeySet;
use crate::value::{Key, Record, Value};

/// Returns true when the record survives the exclusion filter.
pub fn passes_filter(record: &Record, filter: &ValueFilter) -> bool {
    filter.iter().all(|(attr, excluded)| {
        excluded.is_empty() || !excluded.contains(record.get(attr).as_str().as_ref())
    })
}

/// Column key → accumulator for one row key (or row prefix).
type RowCells = FxHashMap<Key, Box<dyn Accumulator>>;

/// The aggregate tree: (row key or prefix, column key or prefix) → accumulator,
/// plus the contributing record indices of every full cell.
#[derive(Default)]
pub struct PivotTree {
    cells: FxHashMap<Key, RowCells>,

    /// Full (row key, column key) → indices into the materialized records.
    members: FxHashMap<Key, FxHashMap<Key, Vec<usize>>>,

    /// Distinct full row keys in first-seen order.
    row_keys: KeySet,

    /// Distinct full column keys in first-seen order.
    col_keys: KeySet,

    /// Number of records that passed the filter.
    filtered_records: usize,
}

impl std::fmt::Debug for PivotTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PivotTree")
            .field("row_keys", &self.row_keys.len())
            .field("col_keys", &self.col_keys.len())
            .field("cells", &self.cell_count())
            .field("filtered_records", &self.filtered_records)
            .finish()
    }
}

impl PivotTree {
    /// Builds the tree over materialized records.
    ///
    /// With at least one input record the grand total always exists, so a
    /// fully filtered pivot still reports e.g. a Count of zero. With no
    /// input at all the tree stays empty and every lookup is undefined.
    pub fn build(
        records: &[Record],
        rows: &[String],
        cols: &[String],
        filter: &ValueFilter,
        factory: &AccumulatorFactory,
    ) -> Self {
        let mut tree = PivotTree::default();
        if records.is_empty() {
            return tree;
        }

        tree.cells
            .entry(Key::new())
            .or_default()
            .insert(Key::new(), factory());

        for (index, record) in records.iter().enumerate() {
            if !passes_filter(record, filter) {
                continue;
            }
            tree.process_record(index, record, rows, cols, factory);
        }

        crate::log_debug!(
            "PIVOT",
            "tree built: records={} filtered={} row_keys={} col_keys={} cells={}",
            records.len(),
            tree.filtered_records,
            tree.row_keys.len(),
            tree.col_keys.len(),
            tree.cell_count()
        );

        tree
    }

    fn process_record(
        &mut self,
        index: usize,
        record: &Record,
        rows: &[String],
        cols: &[String],
        factory: &AccumulatorFactory,
    ) {
        let row_key = record.project(rows);
        let col_key = record.project(cols);

        for i in 0..=row_key.len() {
            let row_prefix = &row_key[..i];
            if !self.cells.contains_key(row_prefix) {
                self.cells.insert(Key::from(row_prefix), RowCells::default());
            }
            let Some(row_cells) = self.cells.get_mut(row_prefix) else {
                continue;
            };

            for j in 0..=col_key.len() {
                let col_prefix = &col_key[..j];
                match row_cells.get_mut(col_prefix) {
                    Some(acc) => acc.push(record),
                    None => {
                        let mut acc = factory();
                        acc.push(record);
                        row_cells.insert(Key::from(col_prefix), acc);
                    }
                }
            }
        }

        self.members
            .entry(row_key.clone())
            .or_default()
            .entry(col_key.clone())
            .or_default()
            .push(index);

        self.row_keys.insert(row_key);
        self.col_keys.insert(col_key);
        self.filtered_records += 1;
    }

    /// The accumulator at exactly this (row, column) pair, prefixes included.
    pub fn get(&self, row: &[Value], col: &[Value]) -> Option<&dyn Accumulator> {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(|acc| acc.as_ref())
    }

    /// Indices of the records behind a full (row key, column key) cell.
    pub fn members(&self, row: &[Value], col: &[Value]) -> &[usize] {
        self.members
            .get(row)
            .and_then(|cols| cols.get(col))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn row_keys(&self) -> &KeySet {
        &self.row_keys
    }

    pub fn col_keys(&self) -> &KeySet {
        &self.col_keys
    }

    pub fn filtered_records(&self) -> usize {
        self.filtered_records
    }

    /// Number of accumulators, margins included.
    pub fn cell_count(&self) -> usize {
        self.cells.values().map(|cells| cells.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
