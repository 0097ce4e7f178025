//! Effect Handles
//!
//! An effect is a computation that runs for its side effects and never
//! stores a value. It reads entries like any computation does, so it picks
//! up dependencies, and it is re-run as soon as one of them is invalidated,
//! whatever the graph's invalidation policy.
//!
//! # Differences from Computation Entries
//!
//! - Computations produce a cached value; effects produce nothing.
//! - Computations can be recomputed lazily; effects always run eagerly.
//! - Effects are registered at runtime via [`Auto::effect`](super::Auto::effect)
//!   and have no name, only an [`EffectId`].

use std::fmt;
use std::rc::Weak;

use tracing::debug;

use super::runtime::Inner;
use crate::graph::{EffectId, Node};

/// Handle to an effect registered on a graph.
///
/// Dropping the handle leaves the effect running; call
/// [`Effect::dispose`] to remove it.
pub struct Effect<V> {
    graph: Weak<Inner<V>>,
    id: EffectId,
}

impl<V> Effect<V> {
    pub(crate) fn new(graph: Weak<Inner<V>>, id: EffectId) -> Self {
        Self { graph, id }
    }

    /// Get the effect's ID.
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Remove the effect and its dependency edges.
    ///
    /// After disposal, the effect will not run again. Disposing twice is
    /// harmless.
    pub fn dispose(&self) {
        let Some(inner) = self.graph.upgrade() else {
            return;
        };
        let removed = inner.effects.borrow_mut().shift_remove(&self.id).is_some();
        if removed {
            inner.index.borrow_mut().remove(&Node::Effect(self.id));
            debug!(effect = %self.id, "effect disposed");
        }
    }

    /// Check if the effect has been disposed (or its graph dropped).
    pub fn is_disposed(&self) -> bool {
        let Some(inner) = self.graph.upgrade() else {
            return true;
        };
        let registered = inner.effects.borrow().contains_key(&self.id);
        !registered
    }
}

impl<V> fmt::Debug for Effect<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
