// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script function representation.

use crate::caps::Capabilities;
use crate::error::ScriptResult;
use crate::value::Value;
use std::sync::Arc;

/// A native (Rust) function body.
pub type NativeFn = dyn Fn(&[Value]) -> ScriptResult<Value> + Send + Sync;

/// A callable value.
///
/// Wraps a native closure together with an optional name and the
/// capability flags the callable declares for itself. Hosts construct
/// these for the native functions they expose; the runtime constructs
/// them for pseudo-dependencies and forwarding wrappers.
pub struct Callable {
    name: Option<String>,
    requires: Capabilities,
    func: Box<NativeFn>,
}

impl Callable {
    /// Create a callable with an optional name and declared flags.
    pub fn new<F>(name: Option<String>, requires: Capabilities, func: F) -> Arc<Self>
    where
        F: Fn(&[Value]) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name,
            requires,
            func: Box::new(func),
        })
    }

    /// Create a named callable.
    pub fn named<F>(name: impl Into<String>, func: F) -> Arc<Self>
    where
        F: Fn(&[Value]) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        Self::new(Some(name.into()), Capabilities::NONE, func)
    }

    /// Create an anonymous callable.
    pub fn anonymous<F>(func: F) -> Arc<Self>
    where
        F: Fn(&[Value]) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        Self::new(None, Capabilities::NONE, func)
    }

    /// Create a named callable that declares capability flags.
    pub fn with_capabilities<F>(
        name: impl Into<String>,
        requires: Capabilities,
        func: F,
    ) -> Arc<Self>
    where
        F: Fn(&[Value]) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        Self::new(Some(name.into()), requires, func)
    }

    /// The function name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The capability flags this callable declares.
    pub fn requires(&self) -> Capabilities {
        self.requires
    }

    /// Invoke the callable.
    pub fn call(&self, args: &[Value]) -> ScriptResult<Value> {
        (self.func)(args)
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Callable({})", name),
            None => write!(f, "Callable(<anonymous>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call() {
        let double = Callable::named("double", |args| {
            let n = match args.first() {
                Some(Value::Number(n)) => *n,
                _ => 0.0,
            };
            Ok(Value::Number(n * 2.0))
        });
        assert_eq!(double.call(&[Value::Number(21.0)]).unwrap(), Value::Number(42.0));
        assert_eq!(double.name(), Some("double"));
    }

    #[test]
    fn test_capabilities_default_empty() {
        let f = Callable::anonymous(|_| Ok(Value::Undefined));
        assert!(f.requires().is_empty());
        assert_eq!(format!("{:?}", f), "Callable(<anonymous>)");
    }

    #[test]
    fn test_with_capabilities() {
        let f = Callable::with_capabilities("locked", Capabilities::secure_caller(), |_| {
            Ok(Value::Undefined)
        });
        assert!(f.requires().requires_secure_caller());
    }
}
