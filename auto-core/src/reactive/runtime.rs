//! Reactive Runtime
//!
//! [`Auto`] is the graph handle. It owns every piece of engine state and is
//! the only way consumers read and write entries.
//!
//! # How It Works
//!
//! 1. At construction every computation entry is evaluated once, in
//!    declaration order, which establishes its value and dependency set.
//!
//! 2. Reading an entry from inside a running computation records an edge
//!    from the running node to the entry. Dependency sets are rebuilt from
//!    scratch on every run.
//!
//! 3. Reading a computation whose value is not cached evaluates it. Cached
//!    values are returned without re-running anything.
//!
//! 4. Writing a constant drops every transitive dependent from the cache.
//!    Effects, entries with subscribers, and (under the eager policy) every
//!    other stale entry are then recomputed right away; everything else
//!    waits for its next read.
//!
//! 5. Re-entering a node that is already running, or writing a constant
//!    while anything is running, faults the graph for good.
//!
//! # Notifications
//!
//! Subscription callbacks never run in the middle of an evaluation chain.
//! Committed changes are queued and delivered once the evaluation stack is
//! empty again, so a callback is free to read and write the graph.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, error, trace, warn};

use super::accessor::Accessor;
use super::context::{EvalContext, Frame};
use super::effect::Effect;
use super::fault::{Fault, FaultKind};
use super::snapshot::Snapshot;
use super::subscriber::{Callback, Subscription, SubscriptionTable};
use crate::config::{Config, Definition, FatalHandler, GraphOptions, InvalidationPolicy};
use crate::graph::{DependencyIndex, EffectId, EntryKind, EntryStore, Node};

/// Function run by an effect.
pub(crate) type EffectFn<V> = Rc<dyn Fn(&Auto<V>)>;

/// State shared by a graph handle and the capabilities it hands out.
pub(crate) struct Inner<V> {
    pub(crate) store: RefCell<EntryStore<V>>,
    pub(crate) index: RefCell<DependencyIndex>,
    pub(crate) context: RefCell<EvalContext>,
    pub(crate) subscriptions: RefCell<SubscriptionTable<V>>,
    pub(crate) effects: RefCell<IndexMap<EffectId, EffectFn<V>>>,
    next_effect: Cell<u64>,
    pending: RefCell<VecDeque<String>>,
    fault: RefCell<Option<Fault>>,
    fatal: Option<FatalHandler<V>>,
    options: GraphOptions,
}

/// A graph of named entries with automatic dependency tracking.
///
/// `Auto` is a cheap handle: clones share the same graph. It is neither
/// `Send` nor `Sync`; one graph lives on one thread.
///
/// # Example
///
/// ```rust,ignore
/// let graph = auto(
///     Config::new()
///         .constant("a", 1)
///         .computed("b", |g: &Auto<i64>| g.get("a").unwrap_or(0) + 1),
/// );
///
/// assert_eq!(graph.get("b"), Some(2));
/// graph.set("a", 5);
/// assert_eq!(graph.get("b"), Some(6));
/// ```
pub struct Auto<V> {
    inner: Rc<Inner<V>>,
}

impl<V> Clone for Auto<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Build a graph from `config` and boot it.
pub fn auto<V>(config: Config<V>) -> Auto<V>
where
    V: Clone + PartialEq + 'static,
{
    Auto::new(config)
}

impl<V> Auto<V>
where
    V: Clone + PartialEq + 'static,
{
    /// Build a graph from `config` and evaluate every computation once.
    pub fn new(config: Config<V>) -> Self {
        let Config {
            entries,
            fatal,
            options,
        } = config;

        let mut store = EntryStore::new();
        for (name, definition) in entries {
            match definition {
                Definition::Constant(value) => store.declare_constant(name, value),
                Definition::Computed(compute) => store.declare_computation(name, compute),
            }
        }

        let graph = Self {
            inner: Rc::new(Inner {
                store: RefCell::new(store),
                index: RefCell::new(DependencyIndex::new()),
                context: RefCell::new(EvalContext::new()),
                subscriptions: RefCell::new(SubscriptionTable::new()),
                effects: RefCell::new(IndexMap::new()),
                next_effect: Cell::new(0),
                pending: RefCell::new(VecDeque::new()),
                fault: RefCell::new(None),
                fatal,
                options,
            }),
        };
        graph.boot();
        graph
    }

    fn boot(&self) {
        let names: Vec<String> = self
            .inner
            .store
            .borrow()
            .computations()
            .map(str::to_owned)
            .collect();
        debug!(computations = names.len(), policy = %self.inner.options.policy, "booting graph");

        for name in names {
            if self.is_faulted() {
                break;
            }
            // Already pulled in as a dependency of an earlier entry.
            let cached = self.inner.store.borrow().is_cached(&name);
            if !cached {
                self.evaluate(&name);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Accessor surface
    // ------------------------------------------------------------------------

    /// Read an entry.
    ///
    /// Inside a running computation this records `name` as one of its
    /// dependencies. A computation that is not cached is evaluated first,
    /// after any stale inputs it read last time, so a long invalidated chain
    /// is rebuilt bottom up instead of through nested reads.
    /// Returns `None` for undeclared names and on a faulted graph.
    pub fn get(&self, name: &str) -> Option<V> {
        if self.is_faulted() {
            return None;
        }
        self.track(name);

        let needs_evaluation = {
            let store = self.inner.store.borrow();
            store.kind(name) == Some(EntryKind::Computation) && !store.is_cached(name)
        };
        if needs_evaluation {
            self.settle_inputs(name);
            self.evaluate(name);
            if self.is_faulted() {
                return None;
            }
        } else {
            trace!(entry = name, "cache hit");
        }

        self.inner.store.borrow().cached(name).cloned()
    }

    /// Read the cached value of an entry without tracking or evaluating.
    pub fn peek(&self, name: &str) -> Option<V> {
        if self.is_faulted() {
            return None;
        }
        self.inner.store.borrow().cached(name).cloned()
    }

    /// Write a constant entry.
    ///
    /// Writing an undeclared name declares it as a constant. Writes to
    /// computation entries are ignored. Writing while any computation is
    /// running faults the graph.
    pub fn set(&self, name: &str, value: V) {
        if self.is_faulted() {
            return;
        }

        let running = self.inner.context.borrow().running().cloned();
        if let Some(running) = running {
            self.fail(FaultKind::IllegalMutation {
                running: running.to_string(),
                target: name.to_owned(),
            });
            return;
        }

        let changed = {
            let mut store = self.inner.store.borrow_mut();
            match store.kind(name) {
                Some(EntryKind::Constant) => store.commit(name, value),
                Some(EntryKind::Computation) => {
                    warn!(entry = name, "ignoring write to a computation entry");
                    return;
                }
                None => {
                    debug!(entry = name, "declaring constant on first write");
                    store.declare_constant(name.to_owned(), value);
                    true
                }
            }
        };
        if !changed {
            trace!(entry = name, "value unchanged, nothing to propagate");
            return;
        }

        debug!(entry = name, "value committed");
        let stale = self.invalidate(name);
        self.queue(name);
        self.flush();
        self.refresh(stale);
    }

    /// Evaluate a computation entry now, whether or not it is cached.
    ///
    /// Does nothing for constants, undeclared names, or on a faulted graph.
    /// Unlike [`Auto::get`], this does not record a dependency.
    pub fn evaluate(&self, name: &str) {
        if self.is_faulted() {
            return;
        }
        let compute = self.inner.store.borrow().computation(name);
        let Some(compute) = compute else {
            return;
        };

        let node = Node::entry(name);
        let Some(frame) = self.enter(&node) else {
            return;
        };
        debug!(entry = name, "evaluating");
        let value = compute(self);
        drop(frame);

        if self.is_faulted() {
            return;
        }
        let changed = self.inner.store.borrow_mut().commit(name, value);
        if changed {
            debug!(entry = name, "computed value changed");
            self.queue(name);
        }
        self.flush();
    }

    /// Get the accessor bundle for a declared entry.
    pub fn entry(&self, name: &str) -> Option<Accessor<V>> {
        let declared = self.inner.store.borrow().contains(name);
        declared.then(|| Accessor::new(self.clone(), name))
    }

    /// Accessor bundles for every declared entry, in declaration order.
    pub fn entries(&self) -> Vec<Accessor<V>> {
        self.names()
            .iter()
            .map(|name| Accessor::new(self.clone(), name))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Subscriptions and effects
    // ------------------------------------------------------------------------

    /// Call `callback` with the current value of `name` now and after every
    /// committed change of it.
    pub fn subscribe<F>(&self, name: &str, callback: F) -> Subscription<V>
    where
        F: Fn(Option<&V>) + 'static,
    {
        if self.is_faulted() {
            return Subscription::detached(name);
        }

        // Read first: if this evaluates the entry, the change notification
        // must not reach the new callback as well.
        let current = self.get(name);
        if self.is_faulted() {
            return Subscription::detached(name);
        }

        let callback: Callback<V> = Rc::new(callback);
        let tag = self
            .inner
            .subscriptions
            .borrow_mut()
            .insert(name, Rc::clone(&callback));
        debug!(entry = name, %tag, "subscribed");

        callback(current.as_ref());
        Subscription::new(Rc::downgrade(&self.inner), name, tag)
    }

    /// Register a computation that runs for its side effects.
    ///
    /// It runs once now and again whenever an entry it read is invalidated.
    /// It never stores a value, but it is subject to the same reentrancy
    /// rules as any computation.
    pub fn effect<F>(&self, run: F) -> Effect<V>
    where
        F: Fn(&Auto<V>) + 'static,
    {
        let id = EffectId::new(self.inner.next_effect.get());
        self.inner.next_effect.set(id.raw() + 1);
        self.inner.effects.borrow_mut().insert(id, Rc::new(run));
        debug!(effect = %id, "effect registered");

        self.run_effect(id);
        Effect::new(Rc::downgrade(&self.inner), id)
    }

    // ------------------------------------------------------------------------
    // Fault state and introspection
    // ------------------------------------------------------------------------

    /// Check whether the graph has faulted.
    pub fn is_faulted(&self) -> bool {
        self.inner.fault.borrow().is_some()
    }

    /// The fault that froze this graph, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.inner.fault.borrow().clone()
    }

    /// `Err` with the fault if the graph is frozen.
    pub fn check(&self) -> Result<(), Fault> {
        match self.fault() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    /// The options the graph was built with.
    pub fn options(&self) -> GraphOptions {
        self.inner.options
    }

    /// Check whether `name` is a declared entry.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.store.borrow().contains(name)
    }

    /// Kind of a declared entry.
    pub fn kind(&self, name: &str) -> Option<EntryKind> {
        self.inner.store.borrow().kind(name)
    }

    /// Check whether `name` currently holds a valid value.
    pub fn is_cached(&self, name: &str) -> bool {
        self.inner.store.borrow().is_cached(name)
    }

    /// Declared entry names, in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .store
            .borrow()
            .names()
            .map(str::to_owned)
            .collect()
    }

    /// Names read by `name` during its last evaluation, in read order.
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        self.inner
            .index
            .borrow()
            .dependencies(&Node::entry(name))
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Nodes that read `name` during their last run.
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.inner
            .index
            .borrow()
            .dependents(name)
            .map(ToString::to_string)
            .collect()
    }

    /// Copy of the engine's internal state, for tooling and debugging.
    pub fn snapshot(&self) -> Snapshot<V> {
        let store = self.inner.store.borrow();
        let index = self.inner.index.borrow();

        Snapshot {
            cache: store.cache().clone(),
            kinds: store
                .names()
                .filter_map(|name| store.kind(name).map(|kind| (name.to_owned(), kind)))
                .collect(),
            dependencies: index
                .iter()
                .map(|(node, deps)| (node.to_string(), deps.iter().cloned().collect()))
                .collect(),
            subscriptions: self.inner.subscriptions.borrow().tags(),
            stack: self.inner.context.borrow().snapshot(),
            fault: self.inner.fault.borrow().clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Record `name` as a dependency of the running node, if any.
    fn track(&self, name: &str) {
        let running = self.inner.context.borrow().running().cloned();
        if let Some(running) = running {
            if self.inner.index.borrow_mut().record(&running, name) {
                trace!(node = %running, dependency = name, "dependency recorded");
            }
        }
    }

    /// Push `node` on the evaluation stack with a fresh dependency set.
    ///
    /// Faults and returns `None` if `node` is already running.
    fn enter(&self, node: &Node) -> Option<Frame<'_>> {
        let cycle = {
            let context = self.inner.context.borrow();
            context.contains(node).then(|| context.cycle_path(node))
        };
        if let Some(path) = cycle {
            self.fail(FaultKind::CircularDependency { path });
            return None;
        }

        self.inner.index.borrow_mut().reset(node);
        Some(EvalContext::enter(&self.inner.context, node.clone()))
    }

    /// Evaluate the stale computations `name` read during its last run,
    /// inputs before the entries that read them.
    ///
    /// Entries already on the evaluation stack are left alone; reaching one
    /// of them is a cycle that the evaluation of `name` itself reports.
    fn settle_inputs(&self, name: &str) {
        let inputs = {
            let store = self.inner.store.borrow();
            let context = self.inner.context.borrow();
            let index = self.inner.index.borrow();
            index.pending_from(name, |dep| {
                store.kind(dep) == Some(EntryKind::Computation)
                    && !store.is_cached(dep)
                    && !context.contains(&Node::entry(dep))
            })
        };
        if inputs.is_empty() {
            return;
        }

        trace!(entry = name, inputs = inputs.len(), "settling stale inputs");
        for input in inputs {
            if self.is_faulted() {
                return;
            }
            let cached = self.inner.store.borrow().is_cached(&input);
            if !cached {
                self.evaluate(&input);
            }
        }
    }

    fn run_effect(&self, id: EffectId) {
        if self.is_faulted() {
            return;
        }
        let run = self.inner.effects.borrow().get(&id).cloned();
        let Some(run) = run else {
            return;
        };

        let node = Node::Effect(id);
        let Some(frame) = self.enter(&node) else {
            return;
        };
        debug!(effect = %id, "running effect");
        run(self);
        drop(frame);

        // Disposed mid-run: reads after the disposal recorded fresh edges.
        let registered = self.inner.effects.borrow().contains_key(&id);
        if !registered {
            self.inner.index.borrow_mut().remove(&node);
        }
        self.flush();
    }

    /// Drop every transitive dependent of `name` from the cache.
    fn invalidate(&self, name: &str) -> Vec<Node> {
        let stale = self.inner.index.borrow().stale_from(name);

        let mut store = self.inner.store.borrow_mut();
        for entry in stale.iter().filter_map(Node::as_entry) {
            store.invalidate(entry);
        }
        debug!(root = name, stale = stale.len(), "invalidated dependents");
        stale
    }

    /// Recompute what cannot wait for the next read.
    fn refresh(&self, stale: Vec<Node>) {
        let eager = self.inner.options.policy == InvalidationPolicy::Eager;

        for node in stale {
            if self.is_faulted() {
                break;
            }
            match node {
                Node::Effect(id) => self.run_effect(id),
                Node::Entry(name) => {
                    let watched = self.inner.subscriptions.borrow().has_subscribers(&name);
                    if eager || watched {
                        self.get(&name);
                    }
                }
            }
        }
    }

    fn queue(&self, name: &str) {
        self.inner.pending.borrow_mut().push_back(name.to_owned());
    }

    /// Deliver queued change notifications once no evaluation is running.
    fn flush(&self) {
        if !self.inner.context.borrow().is_idle() {
            return;
        }

        let mut delivered = 0usize;
        loop {
            if self.is_faulted() {
                self.inner.pending.borrow_mut().clear();
                return;
            }
            let next = self.inner.pending.borrow_mut().pop_front();
            let Some(name) = next else {
                break;
            };

            let value = self.inner.store.borrow().cached(&name).cloned();
            let callbacks = self.inner.subscriptions.borrow().callbacks(&name);
            for (tag, callback) in callbacks {
                if self.is_faulted() {
                    return;
                }
                // An earlier callback may have cancelled this one.
                let active = self.inner.subscriptions.borrow().contains(&name, tag);
                if active {
                    callback(value.as_ref());
                }
            }
            delivered += 1;
        }

        if delivered > 0 {
            trace!(entries = delivered, "notifications delivered");
        }
    }

    fn fail(&self, kind: FaultKind) {
        if self.is_faulted() {
            return;
        }
        let stack = self.inner.context.borrow().snapshot();
        let fault = Fault::new(kind, stack);
        error!(fault = %fault, stack = ?fault.stack(), "graph faulted");
        *self.inner.fault.borrow_mut() = Some(fault);

        if let Some(handler) = self.inner.fatal.clone() {
            handler(self);
        }
    }
}

impl<V> fmt::Debug for Auto<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auto")
            .field("policy", &self.inner.options.policy)
            .field("faulted", &self.inner.fault.borrow().is_some())
            .field("depth", &self.inner.context.borrow().snapshot().len())
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
