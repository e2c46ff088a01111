// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module runtime.

use lodestone_script::ScriptError;
use thiserror::Error;

/// Result type for module runtime operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while resolving and instantiating modules.
///
/// None of these are recovered internally; every error surfaces
/// synchronously to the immediate caller.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Malformed or over-ascending identifier, or malformed
    /// `define`/`require` arguments. Always a caller bug.
    #[error("invalid identifier '{id}': {reason}")]
    InvalidIdentifier {
        /// The offending identifier (or a description of the argument)
        id: String,
        /// Why it was rejected
        reason: String,
    },

    /// The identifier could not be resolved to any entry after a load
    /// attempt, or was previously marked permanently failed.
    #[error("module '{0}' is not available")]
    ModuleUnavailable(String),

    /// Re-entrant resolution of an entry that is already constructing.
    #[error("circular dependency while constructing module '{0}'")]
    CircularDependency(String),

    /// The caller lacks the trust level a flagged value requires.
    #[error("access to '{0}' denied: secure caller required")]
    AccessDenied(String),

    /// A loader plugin broke its `load`/`normalize` contract.
    #[error("loader plugin '{plugin}' violated its contract: {reason}")]
    LoaderProtocolViolation {
        /// Public identifier the plugin is registered under
        plugin: String,
        /// The contract clause that was broken
        reason: String,
    },

    /// Misused global configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A factory or evaluated script failed.
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    /// Source provider I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoaderError {
    /// Create an `InvalidIdentifier` error.
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a `LoaderProtocolViolation` error.
    pub fn protocol(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoaderProtocolViolation {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }

    /// Recover a runtime error that was tunneled through the script
    /// boundary, wrapping anything else as a script failure.
    ///
    /// Callables constructed by the runtime (scoped `require`, guarded
    /// wrappers) tunnel their `LoaderError`s through
    /// [`ScriptError::Host`]; this is the inverse applied wherever the
    /// runtime invokes script code.
    pub fn from_script(err: ScriptError) -> Self {
        match err.try_downcast_host::<LoaderError>() {
            Ok(runtime_err) => runtime_err,
            Err(other) => Self::Script(other),
        }
    }
}

impl From<LoaderError> for ScriptError {
    fn from(err: LoaderError) -> Self {
        ScriptError::host(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_round_trip() {
        let original = LoaderError::ModuleUnavailable("a/b".to_string());
        let through: ScriptError = original.into();
        match LoaderError::from_script(through) {
            LoaderError::ModuleUnavailable(id) => assert_eq!(id, "a/b"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_plain_script_error_is_wrapped() {
        let err = LoaderError::from_script(ScriptError::type_error("bad argument"));
        assert!(matches!(err, LoaderError::Script(_)));
    }

    #[test]
    fn test_display() {
        let err = LoaderError::invalid_id("../x", "ascends past the root of 'a'");
        assert_eq!(
            err.to_string(),
            "invalid identifier '../x': ascends past the root of 'a'"
        );
    }
}
