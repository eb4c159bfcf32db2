//! Error types for patching, validation, loading, and resolution.

use std::fmt;

use rpcl_types::{Locator, VersionRange};
use serde_json::Value;
use thiserror::Error;

/// Failure while applying a patch. The first failing operation aborts the
/// whole application; no partially patched value is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error("operation {index} ({op}): path '{path}' not found")]
    PathNotFound { index: usize, op: &'static str, path: String },

    #[error("operation {index} (test): value at '{path}' is {actual}, expected {expected}")]
    TestFailed {
        index: usize,
        path: String,
        expected: Value,
        actual: Value,
    },

    #[error("operation {index} (move): '{path}' is inside '{from}'")]
    InvalidMove { index: usize, from: String, path: String },
}

/// A single structural finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending location.
    pub path: String,
    /// Stable rule identifier for machine-readable handling.
    pub rule: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{} [{}]: {}", path, self.rule, self.message)
    }
}

/// Every structural violation found in one value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} structural violation(s): {}", .violations.len(), join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// True when any violation carries `rule`.
    pub fn has_rule(&self, rule: &str) -> bool {
        self.violations.iter().any(|violation| violation.rule == rule)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Failures reported by a [`DocumentLoader`](crate::DocumentLoader).
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("no version of {locator} satisfies {required}")]
    NoCompatibleVersion { locator: Locator, required: VersionRange },

    #[error("list not found: {locator}")]
    NotFound { locator: Locator },

    #[error("cannot load {locator}: {reason}")]
    Unsupported { locator: Locator, reason: String },

    #[error("transport error for {locator}: {message}")]
    Transport { locator: Locator, message: String },

    #[error("cannot parse {locator}: {message}")]
    Parse { locator: Locator, message: String },

    #[error("{locator} is not a valid list: {source}")]
    Structural {
        locator: Locator,
        #[source]
        source: ValidationError,
    },
}

impl LoaderError {
    pub fn transport(locator: &Locator, message: impl Into<String>) -> Self {
        Self::Transport {
            locator: locator.clone(),
            message: message.into(),
        }
    }

    pub fn parse(locator: &Locator, message: impl Into<String>) -> Self {
        Self::Parse {
            locator: locator.clone(),
            message: message.into(),
        }
    }
}

/// Errors produced while resolving a list into its provider table.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no version of {locator} satisfies {required}")]
    NoCompatibleVersion { locator: Locator, required: VersionRange },

    #[error("cyclic extends: {locator} is already part of the chain [{}]", format_chain(.chain))]
    CyclicExtends { locator: Locator, chain: Vec<Locator> },

    #[error("extends chain is longer than {limit} hops")]
    DepthExceeded { limit: usize },

    #[error("applying changes of '{list}' failed: {source}")]
    Patch {
        list: String,
        #[source]
        source: PatchError,
    },

    #[error(transparent)]
    StructuralViolation(#[from] ValidationError),

    #[error(transparent)]
    Loader(LoaderError),

    #[error("provider table serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("resolution cancelled")]
    Cancelled,
}

impl From<LoaderError> for ResolveError {
    fn from(error: LoaderError) -> Self {
        match error {
            LoaderError::NoCompatibleVersion { locator, required } => ResolveError::NoCompatibleVersion { locator, required },
            other => ResolveError::Loader(other),
        }
    }
}

fn format_chain(chain: &[Locator]) -> String {
    chain.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}
