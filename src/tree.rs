//! Comparison tree builder.
//!
//! Folds the walker's flat paths into a nested tree keyed by path prefix.
//! Each node records the tokens seen at its level in first-insertion order,
//! which is the order the synthesizer emits comparisons in; the generated
//! output must never depend on hash-map iteration order.

use crate::walker::{MAP, METHOD, SLICE};
use std::collections::HashMap;

/// Insertion-order-preserving token map: an ordered key list plus a value
/// lookup, kept in sync behind one insert path.
#[derive(Debug)]
pub struct OrderedMap<V> {
    keys: Vec<String>,
    values: HashMap<String, V>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            values: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> V) -> &mut V {
        if !self.values.contains_key(key) {
            self.keys.push(key.to_string());
            self.values.insert(key.to_string(), default());
        }
        self.values.get_mut(key).expect("key inserted above")
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.keys
            .iter()
            .map(|key| (key.as_str(), &self.values[key]))
    }
}

/// One entry at a tree level: either a terminal comparable token or a
/// subtree to recurse into.
#[derive(Debug)]
pub enum Entry {
    Leaf,
    Subtree(Comparisons),
}

/// A node of the comparison tree. `path` is the marker-stripped-on-loops
/// accessor prefix locating this node inside the compared value; entries
/// hold the tokens visited at this level; `methods` the exported method
/// names reported here.
#[derive(Debug, Default)]
pub struct Comparisons {
    path: Vec<String>,
    entries: OrderedMap<Entry>,
    methods: Vec<String>,
}

impl Comparisons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter()
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.methods.is_empty()
    }

    /// Inserts one leaf path. Single token: a terminal field at this level.
    /// `[method]` + name: a method at this level. Otherwise the head token
    /// names (or reuses) a child subtree and the tail recurses into it.
    ///
    /// A child created for `[map]` or `[slice]` starts with an empty
    /// accessor path: inside the generated loop the compared values are
    /// rebound locals, not a static field chain.
    pub fn add(&mut self, path: &[String]) {
        match path {
            [] => {}
            [token] => {
                self.entries.get_or_insert_with(token, || Entry::Leaf);
            }
            [marker, name] if marker == METHOD => {
                self.methods.push(name.clone());
            }
            [token, rest @ ..] => {
                let parent_path = self.path.clone();
                let entry = self.entries.get_or_insert_with(token, || {
                    let mut child = Comparisons::new();
                    if token != MAP && token != SLICE {
                        child.path = parent_path;
                        child.path.push(token.clone());
                    }
                    Entry::Subtree(child)
                });
                if let Entry::Subtree(child) = entry {
                    child.add(rest);
                }
            }
        }
    }
}
