//! FILENAME: pivot-engine/src/keys.rs
//! Key Generator - distinct, ordered row and column keys.
//!
//! Keys are only ever the attribute-value combinations observed together in
//! a record that survived the exclusion filter, never the cross product of
//! each attribute's values. The pivot tree collects them while it builds;
//! this module deduplicates and orders them.

use std::cmp::Ordering;

use rustc_hash::FxHashSet;

use crate::definition::SortMode;
use crate::sort::{natural_cmp, SortResolver};
use crate::value::{Key, Value};

/// Distinct keys in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<Key>,
    seen: FxHashSet<Key>,
}

impl KeySet {
    pub fn new() -> Self {
        KeySet::default()
    }

    /// Adds a key; returns false if it was already present.
    pub fn insert(&mut self, key: Key) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        self.seen.insert(key.clone());
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: &[Value]) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.keys.iter()
    }

    pub fn to_vec(&self) -> Vec<Key> {
        self.keys.clone()
    }
}

/// Orders keys in place.
///
/// `value_of` reads a key's aggregate against the opposite axis's grand
/// total; it is only consulted for the value sort modes and is evaluated
/// once per key. Ties in value order fall back to key order.
pub fn sort_keys<F>(
    keys: &mut Vec<Key>,
    attrs: &[String],
    mode: SortMode,
    resolver: &SortResolver,
    value_of: F,
) where
    F: Fn(&Key) -> Value,
{
    match mode {
        SortMode::KeyAToZ => {
            keys.sort_by(|a, b| resolver.compare_keys(attrs, a, b));
        }
        SortMode::ValueAToZ | SortMode::ValueZToA => {
            let descending = mode == SortMode::ValueZToA;
            let mut keyed: Vec<(Value, Key)> = keys
                .drain(..)
                .map(|key| (value_of(&key), key))
                .collect();

            keyed.sort_by(|(va, ka), (vb, kb)| {
                let by_value = if descending {
                    natural_cmp(vb, va)
                } else {
                    natural_cmp(va, vb)
                };
                match by_value {
                    Ordering::Equal => resolver.compare_keys(attrs, ka, kb),
                    other => other,
                }
            });

            keys.extend(keyed.into_iter().map(|(_, key)| key));
        }
    }
}
