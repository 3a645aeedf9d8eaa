// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Graph error types.

use stagehand::tags::TagError;
use stagehand::{BoxError, ContextError};
use thiserror::Error;

/// Errors raised while building or running a provider graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A required value has no provider.
    #[error("missing dependency {key} required by {required_by}")]
    MissingDependency { key: String, required_by: String },

    /// Two providers produce the same non-group value.
    #[error("{key} already provided by {first}, cannot provide it again from {second}")]
    DuplicateProvider {
        key: String,
        first: String,
        second: String,
    },

    /// Providers depend on each other in a loop.
    #[error("cycle detected: {path}")]
    Cycle { path: String },

    /// A constructor returned an error.
    #[error("constructor {label} failed: {source}")]
    Constructor {
        label: String,
        #[source]
        source: BoxError,
    },

    /// An invoked function returned an error.
    #[error("invoke {label} failed: {source}")]
    Invoke {
        label: String,
        #[source]
        source: BoxError,
    },

    /// A value was requested as the wrong type.
    #[error("{key} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// A lifecycle hook failed.
    #[error("{phase} hook {name} failed: {source}")]
    Hook {
        phase: &'static str,
        name: String,
        #[source]
        source: BoxError,
    },

    /// The start or stop phase ran past its deadline.
    #[error("{phase} timed out: {source}")]
    Timeout {
        phase: &'static str,
        #[source]
        source: ContextError,
    },

    /// Several stop hooks failed.
    #[error("{}", join(.0))]
    Lifecycle(Vec<GraphError>),

    /// A provider tag could not be parsed.
    #[error(transparent)]
    InvalidTag(#[from] TagError),
}

fn join(errors: &[GraphError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Type alias for graph results.
pub type Result<T> = std::result::Result<T, GraphError>;
