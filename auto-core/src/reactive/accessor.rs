//! Per-entry accessor bundle.

use std::fmt;

use super::runtime::Auto;
use super::subscriber::Subscription;
use crate::graph::EntryKind;

/// `get` / `set` / `subscribe` bound to one entry name.
pub struct Accessor<V> {
    graph: Auto<V>,
    name: String,
}

impl<V> Accessor<V>
where
    V: Clone + PartialEq + 'static,
{
    pub(crate) fn new(graph: Auto<V>, name: &str) -> Self {
        Self {
            graph,
            name: name.to_owned(),
        }
    }

    /// The entry this accessor is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// See [`Auto::kind`].
    pub fn kind(&self) -> Option<EntryKind> {
        self.graph.kind(&self.name)
    }

    /// See [`Auto::get`].
    pub fn get(&self) -> Option<V> {
        self.graph.get(&self.name)
    }

    /// See [`Auto::set`].
    pub fn set(&self, value: V) {
        self.graph.set(&self.name, value);
    }

    /// See [`Auto::subscribe`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription<V>
    where
        F: Fn(Option<&V>) + 'static,
    {
        self.graph.subscribe(&self.name, callback)
    }
}

impl<V> Clone for Accessor<V> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            name: self.name.clone(),
        }
    }
}

impl<V> fmt::Debug for Accessor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::Config;
    use crate::graph::EntryKind;
    use crate::reactive::{auto, Auto};

    #[test]
    fn accessor_reads_and_writes_its_entry() {
        let graph = auto(
            Config::new()
                .constant("a", 1)
                .computed("b", |g: &Auto<i32>| g.get("a").unwrap_or(0) + 1),
        );
        let a = graph.entry("a").unwrap();
        let b = graph.entry("b").unwrap();

        assert_eq!(a.kind(), Some(EntryKind::Constant));
        assert_eq!(b.kind(), Some(EntryKind::Computation));
        assert_eq!(b.get(), Some(2));

        a.set(5);
        assert_eq!(b.get(), Some(6));
    }

    #[test]
    fn accessor_subscribe_delegates_to_graph() {
        let graph = auto(Config::new().constant("a", 1));
        let a = graph.entry("a").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let subscription = a.subscribe(move |v| seen_clone.borrow_mut().push(v.copied()));
        a.set(2);
        subscription.cancel();
        a.set(3);

        assert_eq!(*seen.borrow(), vec![Some(1), Some(2)]);
        assert_eq!(subscription.name(), "a");
    }

    #[test]
    fn only_declared_entries_have_accessors() {
        let graph = auto(Config::new().constant("a", 1).constant("b", 2));

        assert!(graph.entry("missing").is_none());
        let names: Vec<_> = graph.entries().iter().map(|e| e.name().to_owned()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
