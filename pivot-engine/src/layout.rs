//! FILENAME: pivot-engine/src/layout.rs
//! Axis Layout - flattens ordered keys into a grouped axis.
//!
//! The ordered full keys are folded into a prefix tree whose children keep
//! the order in which they first appear, then walked depth-first. Every
//! prefix with children below it (except the empty root) becomes a
//! subtotal entry, placed before or after its members.

use rustc_hash::FxHashMap;

use crate::value::{Key, Value};

/// One position on a rendered axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisEntry {
    /// Full key, or the group prefix for a subtotal.
    pub key: Key,

    /// Whether this entry is a group subtotal rather than a full key.
    pub is_subtotal: bool,

    /// Indent level: the number of enclosing groups.
    pub depth: usize,
}

impl AxisEntry {
    fn full(key: Key) -> Self {
        let depth = key.len().saturating_sub(1);
        AxisEntry {
            key,
            is_subtotal: false,
            depth,
        }
    }

    /// Label of the innermost component ("null" for a missing value).
    pub fn label(&self) -> String {
        self.key.last().map(Value::to_string).unwrap_or_default()
    }
}

/// Entries for an axis without grouping: the full keys as they are.
pub fn plain_axis(keys: &[Key]) -> Vec<AxisEntry> {
    keys.iter().cloned().map(AxisEntry::full).collect()
}

#[derive(Default)]
struct Node {
    key: Key,
    children: Vec<usize>,
}

/// Interleaves subtotal entries into an ordered list of full keys.
///
/// Keys that share a prefix are pulled together behind the first member
/// of their group, so value-sorted axes still render contiguous groups.
pub fn flatten_axis(keys: &[Key], subtotals_before: bool) -> Vec<AxisEntry> {
    let mut nodes = vec![Node::default()];
    let mut by_prefix: FxHashMap<Key, usize> = FxHashMap::default();

    for key in keys {
        let mut parent = 0;
        for depth in 1..=key.len() {
            let prefix = &key[..depth];
            parent = match by_prefix.get(prefix) {
                Some(&id) => id,
                None => {
                    let id = nodes.len();
                    nodes.push(Node {
                        key: Key::from(prefix),
                        children: Vec::new(),
                    });
                    nodes[parent].children.push(id);
                    by_prefix.insert(Key::from(prefix), id);
                    id
                }
            };
        }
    }

    let mut entries = Vec::with_capacity(nodes.len());
    let root_children = nodes[0].children.clone();
    for child in root_children {
        flatten_node(&nodes, child, subtotals_before, &mut entries);
    }

    // The empty key of a zero-attribute axis has no node of its own.
    if entries.is_empty() && keys.iter().any(|k| k.is_empty()) {
        entries.push(AxisEntry::full(Key::new()));
    }

    entries
}

fn flatten_node(nodes: &[Node], id: usize, subtotals_before: bool, entries: &mut Vec<AxisEntry>) {
    let node = &nodes[id];
    if node.children.is_empty() {
        entries.push(AxisEntry::full(node.key.clone()));
        return;
    }

    let subtotal = AxisEntry {
        key: node.key.clone(),
        is_subtotal: true,
        depth: node.key.len() - 1,
    };

    if subtotals_before {
        entries.push(subtotal.clone());
    }
    for &child in &node.children {
        flatten_node(nodes, child, subtotals_before, entries);
    }
    if !subtotals_before {
        entries.push(subtotal);
    }
}
