//! Graph Configuration
//!
//! A [`Config`] names every entry the graph starts with, in declaration
//! order, plus an optional fatal handler and the [`GraphOptions`].
//!
//! ```rust,ignore
//! let config = Config::new()
//!     .constant("a", 1)
//!     .computed("b", |g: &Auto<i64>| g.get("a").unwrap_or(0) + 1)
//!     .on_fatal(|g| eprintln!("fatal: {:?}", g.fault()));
//! ```

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::Computation;
use crate::reactive::Auto;

/// Callback invoked once when the graph faults.
pub type FatalHandler<V> = Rc<dyn Fn(&Auto<V>)>;

/// How a committed change reaches the entries that depend on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationPolicy {
    /// Drop stale values from the cache and recompute them on next read.
    #[default]
    Lazy,

    /// Drop stale values, then recompute all of them right away.
    Eager,
}

impl fmt::Display for InvalidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationPolicy::Lazy => f.write_str("lazy"),
            InvalidationPolicy::Eager => f.write_str("eager"),
        }
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown invalidation policy `{0}` (expected `lazy` or `eager`)")]
pub struct ParsePolicyError(String);

impl FromStr for InvalidationPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lazy" => Ok(InvalidationPolicy::Lazy),
            "eager" => Ok(InvalidationPolicy::Eager),
            _ => Err(ParsePolicyError(s.to_owned())),
        }
    }
}

/// Engine-wide options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// How committed changes reach dependents.
    pub policy: InvalidationPolicy,
}

/// Initial definition of one entry.
pub enum Definition<V> {
    Constant(V),
    Computed(Computation<V>),
}

impl<V: fmt::Debug> fmt::Debug for Definition<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Definition::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Builder for a graph's initial entries.
///
/// Declaring a name twice replaces the earlier definition but keeps its
/// original position.
pub struct Config<V> {
    pub(crate) entries: IndexMap<String, Definition<V>>,
    pub(crate) fatal: Option<FatalHandler<V>>,
    pub(crate) options: GraphOptions,
}

impl<V> Config<V> {
    /// Start an empty configuration with default options.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            fatal: None,
            options: GraphOptions::default(),
        }
    }

    /// Declare a constant entry.
    pub fn constant(mut self, name: impl Into<String>, value: V) -> Self {
        self.entries.insert(name.into(), Definition::Constant(value));
        self
    }

    /// Declare a computation entry.
    pub fn computed<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Auto<V>) -> V + 'static,
    {
        self.entries
            .insert(name.into(), Definition::Computed(Rc::new(compute)));
        self
    }

    /// Install the handler that is called once if the graph faults.
    ///
    /// The handler receives the faulted graph, so it can inspect
    /// [`Auto::fault`] and [`Auto::snapshot`].
    pub fn on_fatal<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Auto<V>) + 'static,
    {
        self.fatal = Some(Rc::new(handler));
        self
    }

    /// Replace the engine options.
    pub fn options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the invalidation policy.
    pub fn policy(mut self, policy: InvalidationPolicy) -> Self {
        self.options.policy = policy;
        self
    }

    /// Number of declared entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no entries are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for Config<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Config<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("entries", &self.entries)
            .field("has_fatal_handler", &self.fatal.is_some())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_order_is_kept() {
        let config: Config<i32> = Config::new()
            .constant("b", 1)
            .computed("a", |_| 2)
            .constant("c", 3);

        let names: Vec<_> = config.entries.keys().cloned().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn redeclaring_replaces_in_place() {
        let config: Config<i32> = Config::new()
            .constant("a", 1)
            .constant("b", 2)
            .computed("a", |_| 3);

        let names: Vec<_> = config.entries.keys().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(matches!(config.entries["a"], Definition::Computed(_)));
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("lazy".parse::<InvalidationPolicy>(), Ok(InvalidationPolicy::Lazy));
        assert_eq!(" Eager ".parse::<InvalidationPolicy>(), Ok(InvalidationPolicy::Eager));
        assert!("sometimes".parse::<InvalidationPolicy>().is_err());
        assert_eq!(InvalidationPolicy::Eager.to_string(), "eager");
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: GraphOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.policy, InvalidationPolicy::Lazy);

        let options: GraphOptions = serde_json::from_str(r#"{"policy":"eager"}"#).unwrap();
        assert_eq!(
            options,
            GraphOptions {
                policy: InvalidationPolicy::Eager
            }
        );
    }
}
