//! Dependency Index
//!
//! Keeps both directions of every dependency edge:
//!
//! - forward: node -> the entry names it read during its last run
//! - reverse: entry name -> the nodes that read it
//!
//! The forward sets are rebuilt from scratch on every evaluation, so the
//! reverse index is kept in step edge by edge. Invalidation only ever walks
//! the reverse direction.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use super::node::Node;

/// Bidirectional dependency edges between nodes and entry names.
#[derive(Debug, Default)]
pub(crate) struct DependencyIndex {
    forward: IndexMap<Node, IndexSet<String>>,
    reverse: HashMap<String, IndexSet<Node>>,
}

impl DependencyIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Forget every edge out of `node` and start an empty dependency set.
    ///
    /// Called right before the node runs again.
    pub(crate) fn reset(&mut self, node: &Node) {
        self.unlink(node);
        self.forward.insert(node.clone(), IndexSet::new());
    }

    /// Remove `node` and all of its outgoing edges.
    pub(crate) fn remove(&mut self, node: &Node) {
        self.unlink(node);
        self.forward.shift_remove(node);
    }

    fn unlink(&mut self, node: &Node) {
        let Some(previous) = self.forward.get_mut(node) else {
            return;
        };
        for name in previous.drain(..) {
            if let Some(dependents) = self.reverse.get_mut(&name) {
                dependents.shift_remove(node);
                if dependents.is_empty() {
                    self.reverse.remove(&name);
                }
            }
        }
    }

    /// Record that `node` read `name`. Returns false if the edge existed.
    pub(crate) fn record(&mut self, node: &Node, name: &str) -> bool {
        let inserted = self
            .forward
            .entry(node.clone())
            .or_default()
            .insert(name.to_owned());
        if inserted {
            self.reverse
                .entry(name.to_owned())
                .or_default()
                .insert(node.clone());
        }
        inserted
    }

    /// Names read by `node` during its last run.
    pub(crate) fn dependencies(&self, node: &Node) -> Option<&IndexSet<String>> {
        self.forward.get(node)
    }

    /// Nodes that read `name` during their last run.
    pub(crate) fn dependents(&self, name: &str) -> impl Iterator<Item = &Node> {
        self.reverse.get(name).into_iter().flatten()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Node, &IndexSet<String>)> {
        self.forward.iter()
    }

    /// Every node that transitively depends on `root`, in discovery order.
    ///
    /// Depth-first over the reverse index with a visited set, so it stops on
    /// any graph shape, cycles included. Effects are leaves: nothing can read
    /// an effect.
    pub(crate) fn stale_from(&self, root: &str) -> Vec<Node> {
        let mut stale = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut seen_effects = HashSet::new();
        let mut worklist = vec![root];
        visited.insert(root);

        while let Some(name) = worklist.pop() {
            for node in self.dependents(name) {
                match node {
                    Node::Entry(dependent) => {
                        if visited.insert(dependent.as_str()) {
                            stale.push(node.clone());
                            worklist.push(dependent.as_str());
                        }
                    }
                    Node::Effect(id) => {
                        if seen_effects.insert(*id) {
                            stale.push(node.clone());
                        }
                    }
                }
            }
        }

        stale
    }

    /// Entries `root` read during its last run, transitively, restricted to
    /// those accepted by `pending`.
    ///
    /// The walk does not continue past a rejected entry. The result excludes
    /// `root` and lists every entry after the entries it read, so evaluating
    /// it front to back never needs to recurse.
    pub(crate) fn pending_from<F>(&self, root: &str, pending: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut order = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut worklist: Vec<(&str, bool)> = vec![(root, false)];

        while let Some((name, expanded)) = worklist.pop() {
            if expanded {
                if name != root {
                    order.push(name.to_owned());
                }
                continue;
            }
            // A name can be queued more than once; only the first pop counts.
            if !visited.insert(name) {
                continue;
            }
            worklist.push((name, true));

            let Some(deps) = self.forward.get(&Node::entry(name)) else {
                continue;
            };
            for dep in deps.iter().rev() {
                if !visited.contains(dep.as_str()) && pending(dep) {
                    worklist.push((dep.as_str(), false));
                }
            }
        }

        order
    }
}
