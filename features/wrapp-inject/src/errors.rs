use std::sync::Arc;

use thiserror::Error;

use crate::types::{DynError, Key};

/// Errors while registering bindings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// Name keys must not be empty
    #[error("A name key must not be empty")]
    EmptyName,
    /// A type key was bound to a producer supplying a different type
    #[error("Key '{key}' was bound to a producer supplying '{supplied}' - Consider using `Producer::upcast`")]
    TypeMismatch { key: Key, supplied: &'static str },
}

/// Errors of a single resolve call
///
/// None of these leave a partially built singleton behind.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// No binding, no implicit constructor and no default
    #[error("Cannot resolve '{key}' - required through {}", format_chain(.chain))]
    Unresolvable { key: Key, chain: Vec<Key> },

    /// A producer was requested again while it was still being constructed
    #[error("A Circular Dependency exists on '{key}' through {} - Consider using `Lazy`", format_chain(.chain))]
    CircularDependency { key: Key, chain: Vec<Key> },

    /// An async producer was reached through the blocking resolver
    #[error("Producer for '{producer}' is async and requires the AsyncResolver - required through {}", format_chain(.chain))]
    RequiresAsync {
        producer: &'static str,
        chain: Vec<Key>,
    },

    /// A Producer returned an error
    #[error("Producer for '{producer}' failed - error: {error}")]
    ProducerFailed {
        producer: &'static str,
        error: Arc<DynError>,
    },

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// A producer asked for an argument it did not declare, or one that was skipped
    #[error("Argument '{0}' was not resolved")]
    MissingArgument(String),

    /// Per-call bindings collide with the resolver's registry
    #[error("Per-call bindings collide with the registry on {}", format_chain(.0))]
    ConflictingBindings(Vec<Key>),

    /// The resolution chain grew beyond the configured depth
    #[error("Maximum resolution depth {depth} exceeded through {}", format_chain(.chain))]
    MaxDepthExceeded { depth: usize, chain: Vec<Key> },
}

/// A scope name that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown scope '{0}', expected one of transient, local, singleton")]
pub struct ParseScopeError(pub String);

pub(crate) fn format_chain(chain: &[Key]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
