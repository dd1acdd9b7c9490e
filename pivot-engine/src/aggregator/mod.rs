//! FILENAME: pivot-engine/src/aggregator/mod.rs
//! Aggregator Framework - named recipes producing per-cell accumulators.
//!
//! A recipe is bound to the chosen value attributes once per build and
//! yields a factory; the pivot tree calls the factory for every cell and
//! margin it touches, so no two cells share accumulator state.

pub mod builtins;

use std::fmt;
use std::sync::Arc;

use crate::error::PivotError;
use crate::number_format::NumberFormat;
use crate::sort::SortResolver;
use crate::value::{Record, Value};

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Mutable per-cell aggregation state.
pub trait Accumulator: Send {
    /// Ingests one record.
    fn push(&mut self, record: &Record);

    /// Current result. `Value::Null` when undefined (no input, division by
    /// zero, variance of a single sample, ...).
    fn value(&self) -> Value;
}

/// Produces a fresh accumulator on every call.
pub type AccumulatorFactory = Arc<dyn Fn() -> Box<dyn Accumulator> + Send + Sync>;

/// Arguments a recipe is bound to before a build.
#[derive(Debug, Clone, Copy)]
pub struct RecipeArgs<'a> {
    pub vals: &'a [String],
    pub sorters: &'a SortResolver,
}

impl RecipeArgs<'_> {
    /// Name of the i-th value attribute. A missing one reads as an
    /// attribute no record has, so every value is `Null`.
    pub fn val(&self, i: usize) -> String {
        self.vals.get(i).cloned().unwrap_or_default()
    }
}

// ============================================================================
// RECIPE
// ============================================================================

/// Which margin a fraction-of aggregate is divided by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractionBase {
    /// The grand total `([], [])`.
    Total,
    /// The row margin `(row, [])`.
    Row,
    /// The column margin `([], col)`.
    Col,
}

type Builder = dyn Fn(&RecipeArgs<'_>) -> AccumulatorFactory + Send + Sync;

/// An aggregation recipe: how many value attributes it reads, how its
/// results display, and how to build accumulators.
#[derive(Clone)]
pub struct Recipe {
    num_inputs: usize,
    format: NumberFormat,
    fraction_of: Option<FractionBase>,
    build: Arc<Builder>,
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("num_inputs", &self.num_inputs)
            .field("format", &self.format)
            .field("fraction_of", &self.fraction_of)
            .finish()
    }
}

impl Recipe {
    pub fn new(
        num_inputs: usize,
        format: NumberFormat,
        build: impl Fn(&RecipeArgs<'_>) -> AccumulatorFactory + Send + Sync + 'static,
    ) -> Self {
        Recipe {
            num_inputs,
            format,
            fraction_of: None,
            build: Arc::new(build),
        }
    }

    /// Wraps a recipe so its value is divided by a margin of the finished tree.
    /// The division happens at query time, never during accumulation.
    pub fn fraction_of(inner: Recipe, base: FractionBase, format: NumberFormat) -> Self {
        Recipe {
            fraction_of: Some(base),
            format,
            ..inner
        }
    }

    /// Number of value attributes consumed (0 for count-only recipes).
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn format(&self) -> &NumberFormat {
        &self.format
    }

    pub fn fraction_base(&self) -> Option<FractionBase> {
        self.fraction_of
    }

    /// Binds the recipe to the chosen value attributes.
    pub fn factory(&self, args: &RecipeArgs<'_>) -> AccumulatorFactory {
        (self.build)(args)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Name → recipe. Names are stable identifiers validated at build time.
#[derive(Debug, Clone, Default)]
pub struct AggregatorRegistry {
    recipes: Vec<(String, Recipe)>,
}

impl AggregatorRegistry {
    pub fn empty() -> Self {
        AggregatorRegistry::default()
    }

    /// The built-in recipe set.
    pub fn builtin() -> Self {
        use builtins::*;

        let mut registry = AggregatorRegistry::empty();
        let fmt = NumberFormat::us;
        let fmt_int = NumberFormat::us_int;
        let fmt_pct = NumberFormat::us_pct;

        registry.register("Count", count(fmt_int()));
        registry.register("Count Unique Values", uniques(UniqueMode::Count, fmt_int()));
        registry.register("List Unique Values", uniques(UniqueMode::List(", "), fmt()));
        registry.register("Sum", sum(fmt()));
        registry.register("Integer Sum", sum(fmt_int()));
        registry.register("Average", running_stat(StatMode::Mean, 1, fmt()));
        registry.register("Median", quantile(0.5, fmt()));
        registry.register("Sample Variance", running_stat(StatMode::Var, 1, fmt()));
        registry.register("Sample Standard Deviation", running_stat(StatMode::Stdev, 1, fmt()));
        registry.register("Population Variance", running_stat(StatMode::Var, 0, fmt()));
        registry.register("Population Standard Deviation", running_stat(StatMode::Stdev, 0, fmt()));
        registry.register("Minimum", extremes(Extreme::Min, fmt()));
        registry.register("Maximum", extremes(Extreme::Max, fmt()));
        registry.register("First", extremes(Extreme::First, fmt()));
        registry.register("Last", extremes(Extreme::Last, fmt()));
        registry.register("Sum over Sum", sum_over_sum(fmt()));
        registry.register("80% Upper Bound", sum_over_sum_bound80(true, fmt()));
        registry.register("80% Lower Bound", sum_over_sum_bound80(false, fmt()));
        registry.register("Sum as Fraction of Total", Recipe::fraction_of(sum(fmt()), FractionBase::Total, fmt_pct()));
        registry.register("Sum as Fraction of Rows", Recipe::fraction_of(sum(fmt()), FractionBase::Row, fmt_pct()));
        registry.register("Sum as Fraction of Columns", Recipe::fraction_of(sum(fmt()), FractionBase::Col, fmt_pct()));
        registry.register("Count as Fraction of Total", Recipe::fraction_of(count(fmt_int()), FractionBase::Total, fmt_pct()));
        registry.register("Count as Fraction of Rows", Recipe::fraction_of(count(fmt_int()), FractionBase::Row, fmt_pct()));
        registry.register("Count as Fraction of Columns", Recipe::fraction_of(count(fmt_int()), FractionBase::Col, fmt_pct()));

        registry
    }

    /// Adds or replaces a recipe.
    pub fn register(&mut self, name: impl Into<String>, recipe: Recipe) {
        let name = name.into();
        match self.recipes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = recipe,
            None => self.recipes.push((name, recipe)),
        }
    }

    pub fn get(&self, name: &str) -> Result<&Recipe, PivotError> {
        self.recipes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
            .ok_or_else(|| PivotError::UnknownAggregator(name.to_string()))
    }

    /// Recipe names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
