//! Fault Container
//!
//! A graph is either live or faulted. It enters the faulted state at most
//! once, when a circular dependency or an illegal mutation is detected, and
//! never leaves it: every later read returns nothing, every later write is
//! ignored and no subscription fires again.

use serde::Serialize;
use thiserror::Error;

/// Why a graph faulted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultKind {
    /// A node depends on itself within one evaluation chain.
    #[error("circular dependency: {}", .path.join(" -> "))]
    CircularDependency {
        /// The loop, starting and ending with the re-entered node.
        path: Vec<String>,
    },

    /// A constant was written while a computation was running.
    #[error("illegal mutation: `{running}` tried to set `{target}` while being evaluated")]
    IllegalMutation {
        /// The node that was running.
        running: String,
        /// The entry it tried to write.
        target: String,
    },
}

/// The terminal error state of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}")]
pub struct Fault {
    kind: FaultKind,
    stack: Vec<String>,
}

impl Fault {
    pub(crate) fn new(kind: FaultKind, stack: Vec<String>) -> Self {
        Self { kind, stack }
    }

    /// What went wrong.
    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    /// The evaluation stack at the moment the fault was detected, oldest
    /// first.
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Human-readable description, same as the `Display` output.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}
