//! Auto Core
//!
//! This crate provides the engine behind `auto`: a graph of named entries
//! where some hold plain values and others are derived from them. It
//! implements:
//!
//! - Automatic dependency discovery while computations run
//! - Lazy (default) or eager recomputation after a change
//! - Cycle detection and reentrancy protection
//! - Change-driven subscriptions and effects
//! - A terminal fault state with an optional fatal handler
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `config`: Initial entries, fatal handler and engine options
//! - `graph`: Entry store, value cache and dependency index
//! - `reactive`: Evaluation, invalidation, subscriptions and faults
//!
//! # Example
//!
//! ```rust,ignore
//! use auto_core::{auto, Auto, Config};
//!
//! let graph = auto(
//!     Config::new()
//!         .constant("a", 1)
//!         .computed("b", |g: &Auto<i64>| g.get("a").unwrap_or(0) + 1),
//! );
//!
//! let _sub = graph.subscribe("b", |b| println!("b = {b:?}"));
//! // prints: "b = Some(2)"
//!
//! graph.set("a", 5);
//! // prints: "b = Some(6)"
//! ```

pub mod config;
pub mod graph;
pub mod reactive;

pub use config::{Config, GraphOptions, InvalidationPolicy};
pub use graph::{EntryKind, Node};
pub use reactive::{auto, Accessor, Auto, Effect, Fault, FaultKind, Snapshot, Subscription};
