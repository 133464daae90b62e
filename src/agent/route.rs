//! Route keys for handler dispatch
//!
//! A handler is registered under a [`Route`]. `Wildcard` handlers fire in
//! every round; `Named` handlers fire only while the agent is in that state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque state label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateName(String);

impl StateName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StateName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Transition trigger reported by a receive handler
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLabel(String);

impl EventLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for EventLabel {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// Handler dispatch key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Always active
    Wildcard,
    /// Active only in the named state
    Named(StateName),
}

impl Route {
    pub fn named(state: impl Into<StateName>) -> Self {
        Route::Named(state.into())
    }

    /// Whether a handler on this route fires for `current`
    pub fn matches(&self, current: Option<&StateName>) -> bool {
        match self {
            Route::Wildcard => true,
            Route::Named(state) => current == Some(state),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Wildcard => f.write_str("*"),
            Route::Named(state) => write!(f, "{}", state),
        }
    }
}
