// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::context::ContextError;
use crate::hooks::HookPhase;
use crate::signals::TerminationCause;

/// Boxed error returned by hooks and backend-specific code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while driving an application lifecycle.
#[derive(Debug, Error)]
pub enum Error {
    /// `start` was called on an application that already started.
    #[error("already started")]
    AlreadyStarted,

    /// `stop` or `wait` was called before a successful `start`.
    #[error("not started")]
    NotStarted,

    /// The backend does not know how to handle the configuration type.
    #[error("unsupported config type: {type_name}")]
    UnsupportedConfigType {
        /// Concrete type name of the rejected configuration.
        type_name: String,
    },

    /// A lifecycle hook failed; remaining hooks of the phase were skipped.
    #[error("{phase} hook #{index} failed: {source}")]
    Hook {
        /// Phase the failing hook belongs to.
        phase: HookPhase,
        /// Position of the hook in its phase list.
        index: usize,
        /// Error returned by the hook.
        #[source]
        source: BoxError,
    },

    /// Backend initialization failed.
    #[error("{backend}: {source}")]
    BackendInit {
        /// Backend identity.
        backend: String,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Backend start failed.
    #[error("{backend}: start: {source}")]
    BackendStart {
        /// Backend identity.
        backend: String,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Backend stop failed.
    #[error("{backend}: stop: {source}")]
    BackendStop {
        /// Backend identity.
        backend: String,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// The application terminated (signal or backend shutdown).
    #[error(transparent)]
    Terminated(#[from] TerminationError),

    /// The lifecycle context was cancelled or ran past its deadline.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A backend tried to store a value of the wrong type into a slot.
    #[error("slot holds {expected}, got {found}")]
    SlotType {
        /// Declared slot type.
        expected: &'static str,
        /// Offered value type.
        found: &'static str,
    },

    /// Configuration validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend-specific failure.
    #[error(transparent)]
    Backend(BoxError),
}

impl Error {
    /// Wraps a backend-specific error.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Backend(err.into())
    }

    /// Returns the innermost lifecycle error, looking through backend wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::BackendInit { source, .. }
            | Error::BackendStart { source, .. }
            | Error::BackendStop { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Termination cause delivered through `wait`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.cause))]
pub struct TerminationError {
    /// What ended the waiting phase.
    pub cause: TerminationCause,
}

fn describe(cause: &TerminationCause) -> String {
    match cause {
        TerminationCause::Signal(signal) => format!("canceled by {signal} signal"),
        TerminationCause::Shutdown { exit_code } => {
            format!("shutdown requested with exit code {exit_code}")
        }
    }
}

/// Type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, Error>;
