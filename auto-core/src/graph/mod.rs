//! Dependency Graph
//!
//! This module holds the data side of the engine: entry definitions, the
//! value cache and the dependency edges between them. It has no behavior of
//! its own beyond bookkeeping; evaluation and propagation live in
//! [`crate::reactive`].
//!
//! # Overview
//!
//! - Nodes are named entries (constants and computations) or effects.
//! - Edges point from a node to the entry names it read during its most
//!   recent run. The reverse direction (name -> readers) is indexed too so
//!   that invalidation never has to rescan every entry.
//!
//! # Design Decisions
//!
//! 1. Presence in the cache is the validity flag. Invalidating an entry
//!    removes it from the cache instead of flipping a dirty bit in place.
//!
//! 2. Dependency sets are ordered by first read and rebuilt on every run,
//!    so conditional reads never leave stale edges behind.

mod index;
mod node;

pub(crate) use index::DependencyIndex;
pub(crate) use node::EntryStore;
pub use node::{Computation, EffectId, EntryKind, Node};
