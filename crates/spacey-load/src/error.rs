// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for require/load

use thiserror::Error;

/// Result type for load service operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// What a failed load attempt does to the per-name lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The attempt is final: the lock is destroyed and waiters see "already loaded"
    Terminal,
    /// The lock is kept so the next acquirer runs the load again
    Retryable,
}

/// Errors that can occur while resolving or loading a unit
#[derive(Debug, Error)]
pub enum LoadError {
    /// Exhaustive search failed, or the policy hook denied the name
    #[error("no such file to load -- {0}")]
    NotFound(String),

    /// The name resolved to a resource kind that cannot be loaded
    #[error("{kind} are not supported, can't load '{name}'")]
    Unsupported {
        /// Human readable resource kind, plural
        kind: String,
        /// The resource that was found
        name: String,
    },

    /// An extension unit could not be instantiated
    #[error("library '{name}' could not be loaded: {cause}")]
    Library {
        /// Extension identifier or requested name
        name: String,
        /// Reason for failure
        cause: String,
    },

    /// I/O failure while reading a resolved unit
    #[error("load error: {name} -- {cause}")]
    LoadFailed {
        /// Canonical name of the unit
        name: String,
        /// The underlying I/O error
        #[source]
        cause: std::io::Error,
    },

    /// Failure raised by the loaded unit's own body
    #[error("{0}")]
    Raised(String),

    /// The host asked the interpreter to exit
    #[error("exit status {0}")]
    Exit(i32),

    /// The executor was terminated while waiting or loading
    #[error("executor terminated")]
    Terminated,

    /// Archive or filesystem error outside a unit body
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LoadError {
    /// Create a not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create an error for a native shared object
    pub fn native_unsupported(name: impl Into<String>) -> Self {
        Self::Unsupported {
            kind: "native extensions".to_string(),
            name: name.into(),
        }
    }

    /// Create an error for a failure raised by a unit body
    pub fn raised(msg: impl Into<String>) -> Self {
        Self::Raised(msg.into())
    }

    /// Host-level signals that bypass classification and always propagate
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Exit(_) | Self::Terminated)
    }

    /// Lock disposition for a load attempt that failed with this error.
    ///
    /// Fatal signals keep the lock, like any other non-definitive failure.
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::NotFound(_)
            | Self::Unsupported { .. }
            | Self::Library { .. }
            | Self::LoadFailed { .. }
            | Self::Io(_) => Disposition::Terminal,
            Self::Raised(_) | Self::Exit(_) | Self::Terminated | Self::Config(_) => {
                Disposition::Retryable
            }
        }
    }
}
