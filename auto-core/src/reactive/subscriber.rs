//! Subscriptions
//!
//! A subscription is an external callback attached to one entry. It is called
//! once when registered and again after every committed change of that
//! entry's value.

use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::debug;

use super::runtime::Inner;

/// Callback invoked with an entry's current value.
pub type Callback<V> = Rc<dyn Fn(Option<&V>)>;

/// Tag identifying one subscriber within an entry's table.
///
/// Tags count up from zero per entry and are never reused, even after a
/// cancellation. They render zero-padded (`000`, `001`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberTag(u32);

impl SubscriberTag {
    /// Get the raw tag value.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubscriberTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Per-entry tables of subscriber callbacks.
pub(crate) struct SubscriptionTable<V> {
    tables: IndexMap<String, IndexMap<SubscriberTag, Callback<V>>>,
    next: IndexMap<String, u32>,
}

impl<V> SubscriptionTable<V> {
    pub(crate) fn new() -> Self {
        Self {
            tables: IndexMap::new(),
            next: IndexMap::new(),
        }
    }

    /// Register `callback` under a fresh tag.
    pub(crate) fn insert(&mut self, name: &str, callback: Callback<V>) -> SubscriberTag {
        let counter = self.next.entry(name.to_owned()).or_insert(0);
        let tag = SubscriberTag(*counter);
        *counter += 1;

        self.tables
            .entry(name.to_owned())
            .or_default()
            .insert(tag, callback);
        tag
    }

    /// Remove one subscriber. Returns false if it was already gone.
    pub(crate) fn remove(&mut self, name: &str, tag: SubscriberTag) -> bool {
        let Some(table) = self.tables.get_mut(name) else {
            return false;
        };
        let removed = table.shift_remove(&tag).is_some();
        if table.is_empty() {
            self.tables.shift_remove(name);
        }
        removed
    }

    pub(crate) fn contains(&self, name: &str, tag: SubscriberTag) -> bool {
        self.tables
            .get(name)
            .is_some_and(|table| table.contains_key(&tag))
    }

    pub(crate) fn has_subscribers(&self, name: &str) -> bool {
        self.tables.get(name).is_some_and(|table| !table.is_empty())
    }

    /// The callbacks currently registered for `name`, in registration order.
    pub(crate) fn callbacks(&self, name: &str) -> Vec<(SubscriberTag, Callback<V>)> {
        self.tables
            .get(name)
            .map(|table| {
                table
                    .iter()
                    .map(|(tag, callback)| (*tag, Rc::clone(callback)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rendered tags per entry, for introspection.
    pub(crate) fn tags(&self) -> IndexMap<String, Vec<String>> {
        self.tables
            .iter()
            .map(|(name, table)| (name.clone(), table.keys().map(ToString::to_string).collect()))
            .collect()
    }
}

/// Capability to cancel one subscription.
///
/// Dropping the handle does not cancel; call [`Subscription::cancel`].
/// Cancelling more than once is harmless.
#[must_use = "a subscription can only be cancelled through its handle"]
pub struct Subscription<V> {
    graph: Weak<Inner<V>>,
    name: String,
    tag: Option<SubscriberTag>,
}

impl<V> Subscription<V> {
    pub(crate) fn new(graph: Weak<Inner<V>>, name: &str, tag: SubscriberTag) -> Self {
        Self {
            graph,
            name: name.to_owned(),
            tag: Some(tag),
        }
    }

    /// A handle that was never registered (the graph was already faulted).
    pub(crate) fn detached(name: &str) -> Self {
        Self {
            graph: Weak::new(),
            name: name.to_owned(),
            tag: None,
        }
    }

    /// The entry this subscription listens to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tag this subscription was registered under, if any.
    pub fn tag(&self) -> Option<SubscriberTag> {
        self.tag
    }

    /// Check whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        let (Some(inner), Some(tag)) = (self.graph.upgrade(), self.tag) else {
            return false;
        };
        let active = inner.subscriptions.borrow().contains(&self.name, tag);
        active
    }

    /// Stop receiving notifications.
    pub fn cancel(&self) {
        let (Some(inner), Some(tag)) = (self.graph.upgrade(), self.tag) else {
            return;
        };
        let removed = inner.subscriptions.borrow_mut().remove(&self.name, tag);
        if removed {
            debug!(entry = %self.name, %tag, "subscription cancelled");
        }
    }
}

impl<V> fmt::Debug for Subscription<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn noop() -> Callback<i32> {
        Rc::new(|_: Option<&i32>| {})
    }

    #[test]
    fn tags_are_unique_and_zero_padded() {
        let mut table = SubscriptionTable::new();
        let first = table.insert("a", noop());
        let second = table.insert("a", noop());
        let other = table.insert("b", noop());

        assert_ne!(first, second);
        assert_eq!(first.to_string(), "000");
        assert_eq!(second.to_string(), "001");
        assert_eq!(other.to_string(), "000");
    }

    #[test]
    fn tags_are_not_reused_after_removal() {
        let mut table = SubscriptionTable::new();
        let first = table.insert("a", noop());
        assert!(table.remove("a", first));

        let second = table.insert("a", noop());
        assert_eq!(second.raw(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut table = SubscriptionTable::new();
        let tag = table.insert("a", noop());

        assert!(table.remove("a", tag));
        assert!(!table.remove("a", tag));
        assert!(!table.has_subscribers("a"));
    }

    #[test]
    fn remove_only_touches_one_tag() {
        let mut table = SubscriptionTable::new();
        let keep = table.insert("a", noop());
        let gone = table.insert("a", noop());

        table.remove("a", gone);

        assert!(table.contains("a", keep));
        assert!(!table.contains("a", gone));
        assert_eq!(table.tags()["a"], vec!["000"]);
    }

    #[test]
    fn callbacks_are_returned_in_registration_order() {
        let mut table = SubscriptionTable::new();
        let order = Rc::new(Cell::new(0));

        for expected in 0..3 {
            let order = order.clone();
            table.insert(
                "a",
                Rc::new(move |_: Option<&i32>| {
                    assert_eq!(order.get(), expected);
                    order.set(expected + 1);
                }),
            );
        }

        for (_, callback) in table.callbacks("a") {
            callback(None);
        }
        assert_eq!(order.get(), 3);
    }

    #[test]
    fn detached_subscription_is_inert() {
        let subscription: Subscription<i32> = Subscription::detached("a");
        assert!(!subscription.is_active());
        assert!(subscription.tag().is_none());
        subscription.cancel();
    }
}
