//! FILENAME: pivot-engine/src/sort.rs
//! Sort Resolver - total-order comparators for attribute values.
//!
//! Natural order puts nulls first, then numbers (numeric comparison), then
//! everything else (lexical). An attribute with an explicit ordering list
//! sorts listed values by list position ahead of all unlisted values.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::value::{Key, Value};

// ============================================================================
// NATURAL ORDER
// ============================================================================

/// Coarse class used before any value comparison.
fn rank(value: &Value) -> (u8, Option<f64>) {
    match value {
        Value::Null => (0, None),
        other => match other.as_number() {
            Some(n) => (1, Some(n)),
            None => (2, None),
        },
    }
}

/// Natural comparison of two values. A strict total order: ties on the
/// numeric reading fall back to true numbers before numeric-looking text,
/// then to the raw display string.
pub fn natural_cmp(a: &Value, b: &Value) -> Ordering {
    let (class_a, num_a) = rank(a);
    let (class_b, num_b) = rank(b);

    class_a
        .cmp(&class_b)
        .then_with(|| match (num_a, num_b) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        })
        .then_with(|| {
            let text_a = matches!(a, Value::Text(_));
            let text_b = matches!(b, Value::Text(_));
            text_a.cmp(&text_b)
        })
        .then_with(|| a.as_str().cmp(&b.as_str()))
}

// ============================================================================
// EXPLICIT ORDER
// ============================================================================

/// An explicit ordering list for one attribute (see `sort_as`).
#[derive(Debug, Clone, Default)]
pub struct ExplicitOrder {
    exact: FxHashMap<String, usize>,
    folded: FxHashMap<String, usize>,
}

impl ExplicitOrder {
    pub fn new<S: AsRef<str>>(order: &[S]) -> Self {
        let mut exact = FxHashMap::default();
        let mut folded = FxHashMap::default();
        for (i, item) in order.iter().enumerate() {
            let item = item.as_ref();
            exact.entry(item.to_string()).or_insert(i);
            folded.entry(item.to_lowercase()).or_insert(i);
        }
        ExplicitOrder { exact, folded }
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let sa = a.as_str();
        let sb = b.as_str();

        match (self.exact.get(sa.as_ref()), self.exact.get(sb.as_ref())) {
            (Some(ia), Some(ib)) => return ia.cmp(ib).then_with(|| natural_cmp(a, b)),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => {}
        }

        // Second tier: case-insensitive matches, still ahead of unlisted values
        match (
            self.folded.get(&sa.to_lowercase()),
            self.folded.get(&sb.to_lowercase()),
        ) {
            (Some(ia), Some(ib)) => ia.cmp(ib).then_with(|| natural_cmp(a, b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => natural_cmp(a, b),
        }
    }
}

/// Builds an explicit-order comparator from a list of display strings.
pub fn sort_as<S: AsRef<str>>(order: &[S]) -> Sorter {
    Sorter::Explicit(ExplicitOrder::new(order))
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Comparator policy for one attribute.
#[derive(Debug, Clone, Default)]
pub enum Sorter {
    #[default]
    Natural,
    Explicit(ExplicitOrder),
}

impl Sorter {
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match self {
            Sorter::Natural => natural_cmp(a, b),
            Sorter::Explicit(order) => order.compare(a, b),
        }
    }
}

/// Registry of per-attribute orderings.
#[derive(Debug, Clone, Default)]
pub struct SortResolver {
    sorters: FxHashMap<String, Sorter>,
}

static NATURAL: Sorter = Sorter::Natural;

impl SortResolver {
    pub fn new() -> Self {
        SortResolver::default()
    }

    /// Builds a resolver from attribute → explicit ordering list.
    pub fn from_orders(orders: &BTreeMap<String, Vec<String>>) -> Self {
        let mut resolver = SortResolver::new();
        for (attr, order) in orders {
            resolver.set(attr.clone(), sort_as(order));
        }
        resolver
    }

    pub fn set(&mut self, attr: impl Into<String>, sorter: Sorter) {
        self.sorters.insert(attr.into(), sorter);
    }

    /// Comparator for an attribute; natural order unless one is configured.
    pub fn resolve(&self, attr: &str) -> &Sorter {
        self.sorters.get(attr).unwrap_or(&NATURAL)
    }

    /// Component-wise comparison of two keys over the given attribute list.
    pub fn compare_keys(&self, attrs: &[String], a: &Key, b: &Key) -> Ordering {
        for (i, (va, vb)) in a.iter().zip(b.iter()).enumerate() {
            let ordering = match attrs.get(i) {
                Some(attr) => self.resolve(attr).compare(va, vb),
                None => natural_cmp(va, vb),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.len().cmp(&b.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<Value> {
        items.iter().map(|s| Value::text(*s)).collect()
    }

    fn sorted_with(sorter: &Sorter, mut values: Vec<Value>) -> Vec<String> {
        values.sort_by(|a, b| sorter.compare(a, b));
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_natural_order_numbers_before_text() {
        let values = vec![
            Value::text("b"),
            Value::text("10"),
            Value::number(9.0),
            Value::Null,
            Value::text("a"),
        ];
        assert_eq!(
            sorted_with(&Sorter::Natural, values),
            vec!["null", "9", "10", "a", "b"]
        );
    }

    #[test]
    fn test_natural_order_is_total_on_numeric_ties() {
        let a = Value::number(1.0);
        let b = Value::text("1.0");
        let c = Value::text("1");
        assert_eq!(natural_cmp(&a, &b), Ordering::Less);
        assert_eq!(natural_cmp(&b, &a), Ordering::Greater);
        assert_ne!(natural_cmp(&b, &c), Ordering::Equal);
        assert_eq!(natural_cmp(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_explicit_order_lists_first() {
        let sorter = sort_as(&["Thursday", "Friday", "Saturday", "Sunday"]);
        let values = texts(&["Sunday", "Monday", "Friday", "Apr", "Thursday"]);
        assert_eq!(
            sorted_with(&sorter, values),
            vec!["Thursday", "Friday", "Sunday", "Apr", "Monday"]
        );
    }

    #[test]
    fn test_explicit_order_case_insensitive_tier() {
        let sorter = sort_as(&["Lunch", "Dinner"]);
        let values = texts(&["dinner", "Brunch", "Lunch"]);
        assert_eq!(sorted_with(&sorter, values), vec!["Lunch", "dinner", "Brunch"]);
    }

    #[test]
    fn test_explicit_order_unlisted_numbers_use_natural_order() {
        let sorter = sort_as(&["High"]);
        let values = vec![Value::text("10"), Value::text("9"), Value::text("High")];
        assert_eq!(sorted_with(&sorter, values), vec!["High", "9", "10"]);
    }

    #[test]
    fn test_resolver_falls_back_to_natural() {
        let mut orders = BTreeMap::new();
        orders.insert("Meal".to_string(), vec!["Lunch".to_string(), "Dinner".to_string()]);
        let resolver = SortResolver::from_orders(&orders);

        let meal = resolver.resolve("Meal");
        assert_eq!(
            meal.compare(&Value::text("Lunch"), &Value::text("Dinner")),
            Ordering::Less
        );
        let other = resolver.resolve("Day");
        assert_eq!(
            other.compare(&Value::text("Lunch"), &Value::text("Dinner")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_keys_componentwise() {
        let resolver = SortResolver::new();
        let attrs = vec!["a".to_string(), "b".to_string()];
        let k1: Key = crate::value::key(["x", "2"]);
        let k2: Key = crate::value::key(["x", "10"]);
        let k3: Key = crate::value::key(["w", "99"]);
        assert_eq!(resolver.compare_keys(&attrs, &k1, &k2), Ordering::Less);
        assert_eq!(resolver.compare_keys(&attrs, &k3, &k1), Ordering::Less);
    }
}
