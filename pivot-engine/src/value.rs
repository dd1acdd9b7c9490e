//! FILENAME: pivot-engine/src/value.rs
//! Scalar values, records and keys.
//!
//! Records are flat attribute → value mappings. A missing attribute reads as
//! `Value::Null`, which displays as `"null"` so that filters and drill-down
//! criteria can address it like any other value.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ============================================================================
// VALUE
// ============================================================================

/// A normalized, hashable scalar. Used as key components and as aggregate results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Number(OrderedFloat),
    Text(String),
}

/// Wrapper around f64 that implements Eq and Hash for use as HashMap keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // -0.0 == 0.0, so they must hash alike
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

impl OrderedFloat {
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl Value {
    pub fn number(n: f64) -> Self {
        Value::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric reading of the value. Text is parsed after trimming and only
    /// counts when finite; NaN never counts as a number.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Value::Null => return None,
            Value::Number(n) => n.0,
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                // "inf", "infinity" and "nan" parse as floats but are text here
                return trimmed.parse::<f64>().ok().filter(|n| n.is_finite());
            }
        };
        if n.is_nan() {
            None
        } else {
            Some(n)
        }
    }

    /// Like `as_number`, but only for finite results. Consumers plotting
    /// aggregates use this to decide whether to omit a point.
    pub fn as_finite(&self) -> Option<f64> {
        self.as_number().filter(|n| n.is_finite())
    }

    /// The form a value takes inside keys and the attribute index. Values
    /// sharing a display string share one canonical form, so grouping agrees
    /// with filters and drill-down criteria, which match on display strings.
    pub fn canonical(&self) -> Value {
        match self {
            Value::Text(s) if s == "null" => Value::Null,
            Value::Text(s) => match s.parse::<f64>() {
                Ok(n) if n.is_finite() && Value::number(n).to_string() == *s => Value::number(n),
                _ => self.clone(),
            },
            other => other.clone(),
        }
    }

    /// The display string used by filters, drill-down criteria and explicit orderings.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            // -0 groups with 0, so it displays like it
            Value::Number(n) if n.0 == 0.0 => f.write_str("0"),
            Value::Number(n) => write!(f, "{}", n.0),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// RECORD
// ============================================================================

static NULL: Value = Value::Null;

/// A single flat input record. Attributes iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Value of an attribute, `Null` when the record lacks it.
    pub fn get(&self, attr: &str) -> &Value {
        self.fields.get(attr).unwrap_or(&NULL)
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.fields.contains_key(attr)
    }

    pub fn insert(&mut self, attr: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(attr.into(), value.into());
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Projects the record onto an attribute list, producing a key.
    pub fn project(&self, attrs: &[String]) -> Key {
        attrs.iter().map(|a| self.get(a).canonical()).collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ============================================================================
// KEY
// ============================================================================

/// An ordered tuple of attribute values identifying a row or column group.
/// SmallVec hashes like a slice, so `&[Value]` can be used for lookups.
pub type Key = SmallVec<[Value; 4]>;

/// Builds a key from anything convertible to values.
pub fn key<V: Into<Value>>(parts: impl IntoIterator<Item = V>) -> Key {
    parts.into_iter().map(Into::into).collect()
}
