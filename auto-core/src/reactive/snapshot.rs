//! Introspection snapshot.
//!
//! A point-in-time copy of the engine's internal maps. It is never needed
//! for correct operation; tooling uses it to see what the graph is doing.

use indexmap::IndexMap;
use serde::Serialize;

use super::fault::Fault;
use crate::graph::EntryKind;

/// Copy of a graph's internal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<V> {
    /// Entries whose value is currently valid.
    pub cache: IndexMap<String, V>,

    /// Kind of every declared entry, in declaration order.
    pub kinds: IndexMap<String, EntryKind>,

    /// Dependency set of every node that has run, keyed by node name.
    pub dependencies: IndexMap<String, Vec<String>>,

    /// Subscriber tags per entry.
    pub subscriptions: IndexMap<String, Vec<String>>,

    /// Nodes mid-evaluation, oldest first.
    pub stack: Vec<String>,

    pub fault: Option<Fault>,
}

impl<V: Serialize> Snapshot<V> {
    /// Render the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
