//! Reactive Engine
//!
//! This module implements the behavior of the graph: evaluation with
//! automatic dependency tracking, invalidation, subscriptions, effects and
//! the fault state.
//!
//! # Concepts
//!
//! ## Constants
//!
//! A constant entry holds a value that callers assign directly. Writing a
//! new value invalidates every computation that read it, transitively.
//!
//! ## Computations
//!
//! A computation entry derives its value from other entries. It is evaluated
//! once at boot and then again only after something it read has changed.
//! Which entries it read is discovered while it runs, so conditional reads
//! are tracked exactly.
//!
//! ## Effects
//!
//! An effect is a computation without a value. It re-runs eagerly whenever
//! an entry it read is invalidated.
//!
//! ## Subscriptions
//!
//! A subscription is an outside callback attached to one entry. It fires
//! once on registration and then on every committed change.
//!
//! # Faults
//!
//! Re-entering a running node (a circular dependency) or writing a constant
//! from inside a running computation freezes the whole graph. See
//! [`Fault`].

mod accessor;
mod context;
mod effect;
mod fault;
mod runtime;
mod snapshot;
mod subscriber;

pub use accessor::Accessor;
pub use effect::Effect;
pub use fault::{Fault, FaultKind};
pub use runtime::{auto, Auto};
pub use snapshot::Snapshot;
pub use subscriber::{Callback, SubscriberTag, Subscription};
