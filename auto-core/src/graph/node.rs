//! Graph Nodes
//!
//! This module defines what lives in the graph: named entries (constants and
//! computations), the effect nodes that run purely for their side effects,
//! and the store that holds the committed value of every entry.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::reactive::Auto;

/// A derived computation: reads the graph, returns a value.
pub type Computation<V> = Rc<dyn Fn(&Auto<V>) -> V>;

/// Identifier for an effect registered on a graph.
///
/// Ids are handed out per graph, starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EffectId(u64);

impl EffectId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{:03}", self.0)
    }
}

/// Anything that can sit on the evaluation stack and own a dependency set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// A named entry of the graph. Only computations are ever evaluated.
    Entry(String),

    /// A non-materializing computation. It runs for effect and never
    /// writes to the value cache.
    Effect(EffectId),
}

impl Node {
    /// Create an entry node.
    pub fn entry(name: impl Into<String>) -> Self {
        Self::Entry(name.into())
    }

    /// The entry name, if this node is an entry.
    pub fn as_entry(&self) -> Option<&str> {
        match self {
            Node::Entry(name) => Some(name),
            Node::Effect(_) => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Entry(name) => f.write_str(name),
            Node::Effect(id) => id.fmt(f),
        }
    }
}

/// The kind of a named entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Holds an assignable value. Has no dependencies of its own.
    Constant,

    /// Holds a callable whose value is derived from other entries.
    Computation,
}

/// Definition of a single entry.
pub(crate) enum Entry<V> {
    Constant,
    Computation(Computation<V>),
}

impl<V> Entry<V> {
    pub(crate) fn kind(&self) -> EntryKind {
        match self {
            Entry::Constant => EntryKind::Constant,
            Entry::Computation(_) => EntryKind::Computation,
        }
    }
}

/// Entry definitions plus the value cache.
///
/// A name is present in `cache` iff its value is currently known-valid.
/// Invalidation moves the value to `retired` so that the next evaluation can
/// still tell whether the recomputed value actually changed.
pub(crate) struct EntryStore<V> {
    entries: IndexMap<String, Entry<V>>,
    cache: IndexMap<String, V>,
    retired: HashMap<String, V>,
}

impl<V> EntryStore<V>
where
    V: Clone + PartialEq,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            cache: IndexMap::new(),
            retired: HashMap::new(),
        }
    }

    /// Declare a constant entry holding `value`.
    pub(crate) fn declare_constant(&mut self, name: String, value: V) {
        self.retired.remove(&name);
        self.cache.insert(name.clone(), value);
        self.entries.insert(name, Entry::Constant);
    }

    /// Declare a computation entry. It starts out uncached.
    pub(crate) fn declare_computation(&mut self, name: String, compute: Computation<V>) {
        self.cache.shift_remove(&name);
        self.retired.remove(&name);
        self.entries.insert(name, Entry::Computation(compute));
    }

    pub(crate) fn kind(&self, name: &str) -> Option<EntryKind> {
        self.entries.get(name).map(Entry::kind)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The callable behind a computation entry.
    pub(crate) fn computation(&self, name: &str) -> Option<Computation<V>> {
        match self.entries.get(name) {
            Some(Entry::Computation(compute)) => Some(Rc::clone(compute)),
            _ => None,
        }
    }

    /// Names of all computation entries, in declaration order.
    pub(crate) fn computations(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.kind() == EntryKind::Computation)
            .map(|(name, _)| name.as_str())
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn cached(&self, name: &str) -> Option<&V> {
        self.cache.get(name)
    }

    pub(crate) fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub(crate) fn cache(&self) -> &IndexMap<String, V> {
        &self.cache
    }

    /// Commit a value for `name`.
    ///
    /// Returns true if it differs from the last committed value, including
    /// one that was invalidated since.
    pub(crate) fn commit(&mut self, name: &str, value: V) -> bool {
        let changed = match self.cache.get(name) {
            Some(current) => *current != value,
            None => self.retired.remove(name).as_ref() != Some(&value),
        };
        self.cache.insert(name.to_owned(), value);
        changed
    }

    /// Revoke the validity of a cached value.
    ///
    /// Returns true if the name was cached.
    pub(crate) fn invalidate(&mut self, name: &str) -> bool {
        match self.cache.shift_remove(name) {
            Some(value) => {
                self.retired.insert(name.to_owned(), value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntryStore<i64> {
        let mut store = EntryStore::new();
        store.declare_constant("a".into(), 1);
        store.declare_computation("b".into(), Rc::new(|_: &Auto<i64>| 2));
        store
    }

    #[test]
    fn kinds_follow_declaration() {
        let store = store();
        assert_eq!(store.kind("a"), Some(EntryKind::Constant));
        assert_eq!(store.kind("b"), Some(EntryKind::Computation));
        assert_eq!(store.kind("missing"), None);
        assert!(store.computation("a").is_none());
        assert!(store.computation("b").is_some());
        assert_eq!(store.computations().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn computations_start_uncached() {
        let store = store();
        assert_eq!(store.cached("a"), Some(&1));
        assert!(!store.is_cached("b"));
    }

    #[test]
    fn commit_reports_changes() {
        let mut store = store();
        assert!(store.commit("b", 2));
        assert!(!store.commit("b", 2));
        assert!(store.commit("b", 3));
        assert!(!store.commit("a", 1));
    }

    #[test]
    fn invalidation_keeps_previous_value_for_comparison() {
        let mut store = store();
        store.commit("b", 2);

        assert!(store.invalidate("b"));
        assert!(!store.is_cached("b"));
        assert!(!store.invalidate("b"));

        // Recomputing the same value is not a change.
        assert!(!store.commit("b", 2));
        assert!(store.invalidate("b"));
        assert!(store.commit("b", 5));
    }

    #[test]
    fn node_display() {
        assert_eq!(Node::entry("total").to_string(), "total");
        assert_eq!(Node::Effect(EffectId::new(7)).to_string(), "effect#007");
        assert_eq!(Node::entry("x").as_entry(), Some("x"));
        assert_eq!(Node::Effect(EffectId::new(0)).as_entry(), None);
    }
}
