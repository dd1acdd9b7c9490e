//! FILENAME: pivot-engine/src/lib.rs
//! Pivot aggregation engine.
//!
//! Partitions flat records into a row-key × column-key grid and reduces every
//! cell, sub-total and grand total with a pluggable aggregator. Rendering,
//! widgets and raw text parsing live outside this crate.
//!
//! Layers:
//! - `value`: Scalars, records and keys (WHAT we aggregate)
//! - `input` / `index`: Ingestion, derived attributes and the value index
//! - `definition`: Serializable configuration (what the pivot IS)
//! - `sort` / `keys`: Comparators and ordered row/column keys
//! - `aggregator`: Named recipes producing per-cell accumulators
//! - `tree`: The single filtered pass (HOW we compute)
//! - `engine` / `layout`: Query interface and grouped axes (WHAT we display)

pub mod logging;
pub mod error;
pub mod value;
pub mod number_format;
pub mod input;
pub mod index;
pub mod definition;
pub mod sort;
pub mod keys;
pub mod aggregator;
pub mod tree;
pub mod layout;
pub mod engine;

pub use error::PivotError;
pub use value::{key, Key, OrderedFloat, Record, Value};
pub use number_format::NumberFormat;
pub use input::{derivers, records_from_json, Derivation, Deriver, Ingested};
pub use index::{materialize, AttributeIndex, Materialized};
pub use definition::*;
pub use sort::{natural_cmp, sort_as, SortResolver, Sorter};
pub use keys::{sort_keys, KeySet};
pub use aggregator::{
    Accumulator, AccumulatorFactory, AggregatorRegistry, FractionBase, Recipe, RecipeArgs,
};
pub use tree::PivotTree;
pub use layout::{flatten_axis, AxisEntry};
pub use engine::{AggregatorView, PivotData, PivotEngine};
