// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Errors crossing the script-value boundary.

use thiserror::Error;

/// Result type for script-value operations.
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

/// Errors raised by values, objects, and callables.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// A value had the wrong type for the requested operation
    #[error("TypeError: {0}")]
    Type(String),

    /// Attempted to invoke a non-callable value
    #[error("TypeError: {0} is not callable")]
    NotCallable(String),

    /// A member lookup that the target requires to succeed did not
    #[error("no member '{member}' on {target}")]
    NoSuchMember {
        /// Description of the object that was accessed
        target: String,
        /// The member name that was requested
        member: String,
    },

    /// Generic error with message
    #[error("{0}")]
    Message(String),

    /// An error tunneled through the value boundary by the embedding host.
    ///
    /// Hosts wrap their own typed errors here when a native callable
    /// fails, and recover them by downcast on the other side of the
    /// boundary via [`ScriptError::try_downcast_host`].
    #[error("{0}")]
    Host(Box<dyn std::error::Error + Send + Sync>),
}

impl ScriptError {
    /// Create a type error.
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    /// Wrap a host error for tunneling through the value boundary.
    pub fn host<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Host(Box::new(err))
    }

    /// Recover a tunneled host error of a concrete type.
    ///
    /// Returns the original error unchanged if this is not a `Host`
    /// variant or the payload is of a different type.
    pub fn try_downcast_host<E>(self) -> Result<E, Self>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self {
            Self::Host(boxed) => match boxed.downcast::<E>() {
                Ok(err) => Ok(*err),
                Err(boxed) => Err(Self::Host(boxed)),
            },
            other => Err(other),
        }
    }
}
