//! FILENAME: pivot-engine/src/aggregator/builtins.rs
//! Built-in recipe templates.
//!
//! Each template returns a `Recipe`; binding it to value attributes yields a
//! factory of fresh accumulators. Numeric templates ignore values that do not
//! parse as numbers.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::{Accumulator, AccumulatorFactory, Recipe};
use crate::number_format::NumberFormat;
use crate::sort::Sorter;
use crate::value::{Record, Value};

fn factory<A, F>(make: F) -> AccumulatorFactory
where
    A: Accumulator + 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn Accumulator>)
}

// ============================================================================
// COUNT
// ============================================================================

#[derive(Debug, Default)]
struct Count {
    n: u64,
}

impl Accumulator for Count {
    fn push(&mut self, _record: &Record) {
        self.n += 1;
    }

    fn value(&self) -> Value {
        Value::number(self.n as f64)
    }
}

/// Counts records.
pub fn count(format: NumberFormat) -> Recipe {
    Recipe::new(0, format, |_args| factory(Count::default))
}

// ============================================================================
// UNIQUES
// ============================================================================

/// What to report about the distinct values seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueMode {
    Count,
    /// Join the values (first-seen order) with the separator.
    List(&'static str),
}

#[derive(Debug)]
struct Uniques {
    attr: String,
    mode: UniqueMode,
    seen: FxHashSet<Value>,
    order: Vec<Value>,
}

impl Accumulator for Uniques {
    fn push(&mut self, record: &Record) {
        let value = record.get(&self.attr).canonical();
        if !self.seen.contains(&value) {
            self.seen.insert(value.clone());
            self.order.push(value);
        }
    }

    fn value(&self) -> Value {
        match self.mode {
            UniqueMode::Count => Value::number(self.order.len() as f64),
            UniqueMode::List(sep) => {
                let parts: Vec<String> = self.order.iter().map(|v| v.to_string()).collect();
                Value::Text(parts.join(sep))
            }
        }
    }
}

/// Distinct values of the first value attribute.
pub fn uniques(mode: UniqueMode, format: NumberFormat) -> Recipe {
    Recipe::new(1, format, move |args| {
        let attr = args.val(0);
        factory(move || Uniques {
            attr: attr.clone(),
            mode,
            seen: FxHashSet::default(),
            order: Vec::new(),
        })
    })
}

// ============================================================================
// SUM
// ============================================================================

#[derive(Debug)]
struct Sum {
    attr: String,
    sum: f64,
}

impl Accumulator for Sum {
    fn push(&mut self, record: &Record) {
        if let Some(n) = record.get(&self.attr).as_number() {
            self.sum += n;
        }
    }

    fn value(&self) -> Value {
        Value::number(self.sum)
    }
}

/// Sum of the first value attribute.
pub fn sum(format: NumberFormat) -> Recipe {
    Recipe::new(1, format, |args| {
        let attr = args.val(0);
        factory(move || Sum { attr: attr.clone(), sum: 0.0 })
    })
}

// ============================================================================
// EXTREMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    /// Smallest numeric value.
    Min,
    /// Largest numeric value.
    Max,
    /// Smallest raw value under the attribute's sort order.
    First,
    /// Largest raw value under the attribute's sort order.
    Last,
}

struct Extremes {
    attr: String,
    mode: Extreme,
    sorter: Arc<Sorter>,
    val: Option<Value>,
}

impl Accumulator for Extremes {
    fn push(&mut self, record: &Record) {
        let x = record.get(&self.attr);
        match self.mode {
            Extreme::Min | Extreme::Max => {
                let Some(n) = x.as_number() else { return };
                let current = self.val.as_ref().and_then(Value::as_number);
                let next = match (self.mode, current) {
                    (_, None) => n,
                    (Extreme::Min, Some(c)) => c.min(n),
                    (_, Some(c)) => c.max(n),
                };
                self.val = Some(Value::number(next));
            }
            Extreme::First | Extreme::Last => {
                let replace = match &self.val {
                    None => true,
                    Some(current) => {
                        let ordering = self.sorter.compare(x, current);
                        if self.mode == Extreme::First {
                            ordering.is_lt()
                        } else {
                            ordering.is_gt()
                        }
                    }
                };
                if replace {
                    self.val = Some(x.clone());
                }
            }
        }
    }

    fn value(&self) -> Value {
        self.val.clone().unwrap_or(Value::Null)
    }
}

/// Minimum, maximum, first or last value of the first value attribute.
pub fn extremes(mode: Extreme, format: NumberFormat) -> Recipe {
    Recipe::new(1, format, move |args| {
        let attr = args.val(0);
        let sorter = Arc::new(args.sorters.resolve(&attr).clone());
        factory(move || Extremes {
            attr: attr.clone(),
            mode,
            sorter: Arc::clone(&sorter),
            val: None,
        })
    })
}

// ============================================================================
// QUANTILE
// ============================================================================

#[derive(Debug)]
struct Quantile {
    attr: String,
    q: f64,
    /// Appended unsorted; sorted on the first read after a push.
    vals: RefCell<Vec<f64>>,
    sorted: Cell<bool>,
}

impl Accumulator for Quantile {
    fn push(&mut self, record: &Record) {
        if let Some(n) = record.get(&self.attr).as_number() {
            self.vals.get_mut().push(n);
            self.sorted.set(false);
        }
    }

    fn value(&self) -> Value {
        let mut vals = self.vals.borrow_mut();
        if vals.is_empty() {
            return Value::Null;
        }
        if !self.sorted.get() {
            vals.sort_unstable_by(f64::total_cmp);
            self.sorted.set(true);
        }
        let i = (vals.len() - 1) as f64 * self.q;
        let lo = vals[i.floor() as usize];
        let hi = vals[i.ceil() as usize];
        Value::number((lo + hi) / 2.0)
    }
}

/// The q-quantile (0.5 = median) of the first value attribute.
pub fn quantile(q: f64, format: NumberFormat) -> Recipe {
    let q = q.clamp(0.0, 1.0);
    Recipe::new(1, format, move |args| {
        let attr = args.val(0);
        factory(move || Quantile {
            attr: attr.clone(),
            q,
            vals: RefCell::new(Vec::new()),
            sorted: Cell::new(true),
        })
    })
}

// ============================================================================
// RUNNING STATISTICS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatMode {
    Mean,
    Var,
    Stdev,
}

/// Welford's algorithm for numerical stability.
#[derive(Debug)]
struct RunningStat {
    attr: String,
    mode: StatMode,
    ddof: u64,
    n: u64,
    mean: f64,
    m2: f64,
}

impl Accumulator for RunningStat {
    fn push(&mut self, record: &Record) {
        let Some(x) = record.get(&self.attr).as_number() else { return };
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / (self.n as f64);
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    fn value(&self) -> Value {
        match self.mode {
            StatMode::Mean if self.n == 0 => Value::Null,
            StatMode::Mean => Value::number(self.mean),
            _ if self.n <= self.ddof => Value::Null,
            StatMode::Var => Value::number(self.m2 / (self.n - self.ddof) as f64),
            StatMode::Stdev => Value::number((self.m2 / (self.n - self.ddof) as f64).sqrt()),
        }
    }
}

/// Mean, variance or standard deviation of the first value attribute.
/// `ddof` = 1 for sample statistics, 0 for population statistics.
pub fn running_stat(mode: StatMode, ddof: u64, format: NumberFormat) -> Recipe {
    Recipe::new(1, format, move |args| {
        let attr = args.val(0);
        factory(move || RunningStat {
            attr: attr.clone(),
            mode,
            ddof,
            n: 0,
            mean: 0.0,
            m2: 0.0,
        })
    })
}

// ============================================================================
// RATIOS
// ============================================================================

#[derive(Debug)]
struct SumOverSum {
    num: String,
    denom: String,
    sum_num: f64,
    sum_denom: f64,
    /// `None` for the plain ratio, `Some(upper)` for an 80% bound.
    bound: Option<bool>,
}

impl Accumulator for SumOverSum {
    fn push(&mut self, record: &Record) {
        if let Some(n) = record.get(&self.num).as_number() {
            self.sum_num += n;
        }
        if let Some(d) = record.get(&self.denom).as_number() {
            self.sum_denom += d;
        }
    }

    fn value(&self) -> Value {
        if self.sum_denom == 0.0 {
            return Value::Null;
        }
        let (num, denom) = (self.sum_num, self.sum_denom);
        let ratio = match self.bound {
            None => num / denom,
            Some(upper) => {
                let sign = if upper { 1.0 } else { -1.0 };
                (0.821187207574908 / denom
                    + num / denom
                    + 1.2815515655446004
                        * sign
                        * (0.410593603787454 / (denom * denom)
                            + (num * (1.0 - num / denom)) / (denom * denom))
                            .sqrt())
                    / (1.0 + 1.642374415149816 / denom)
            }
        };
        if ratio.is_finite() {
            Value::number(ratio)
        } else {
            Value::Null
        }
    }
}

fn ratio_recipe(bound: Option<bool>, format: NumberFormat) -> Recipe {
    Recipe::new(2, format, move |args| {
        let num = args.val(0);
        let denom = args.val(1);
        factory(move || SumOverSum {
            num: num.clone(),
            denom: denom.clone(),
            sum_num: 0.0,
            sum_denom: 0.0,
            bound,
        })
    })
}

/// Σ first value attribute / Σ second value attribute.
pub fn sum_over_sum(format: NumberFormat) -> Recipe {
    ratio_recipe(None, format)
}

/// 80% confidence bound (Wilson score) on the sum-over-sum ratio.
pub fn sum_over_sum_bound80(upper: bool, format: NumberFormat) -> Recipe {
    ratio_recipe(Some(upper), format)
}
