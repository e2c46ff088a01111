// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The loader-plugin protocol.
//!
//! A loader plugin registered under public identifier `N` intercepts
//! resolution of every identifier of the form `N!rest`. The plugin
//! receives the normalized `rest` and must deliver exactly one
//! [`LoadOutcome`] through [`LoadContext::finish`]: either a ready
//! value or a source location for the runtime to evaluate. A plugin may
//! also override relative normalization of its `rest` half (for
//! example, treating it as a file path rather than a dotted
//! identifier).

use crate::error::{LoaderError, Result};
use crate::module_system::context::CallerContext;
use crate::runtime::ModuleRuntime;
use lodestone_script::Value;
use std::sync::Arc;

/// What a plugin delivers for a load request.
#[derive(Debug)]
pub enum LoadOutcome {
    /// A ready module value
    Value(Value),
    /// A source location for the runtime to evaluate
    Source(String),
}

/// Per-request context handed to [`LoaderPlugin::load`].
pub struct LoadContext<'a> {
    runtime: &'a Arc<ModuleRuntime>,
    caller: &'a mut CallerContext,
    plugin_id: String,
    outcome: Option<LoadOutcome>,
    delivered: bool,
}

impl<'a> LoadContext<'a> {
    pub(crate) fn new(
        runtime: &'a Arc<ModuleRuntime>,
        caller: &'a mut CallerContext,
        plugin_id: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            caller,
            plugin_id: plugin_id.into(),
            outcome: None,
            delivered: false,
        }
    }

    /// Resolve another module on behalf of the requester.
    pub fn require(&mut self, id: &str) -> Result<Value> {
        self.runtime.require(id, self.caller)
    }

    /// Deliver the load outcome. Must be called exactly once.
    pub fn finish(&mut self, outcome: LoadOutcome) -> Result<()> {
        if self.delivered {
            return Err(LoaderError::protocol(
                &self.plugin_id,
                "finish called more than once",
            ));
        }
        self.delivered = true;
        self.outcome = Some(outcome);
        Ok(())
    }

    pub(crate) fn into_outcome(self) -> Option<LoadOutcome> {
        self.outcome
    }
}

/// A named loader module intercepting `name!rest` identifiers.
pub trait LoaderPlugin: Send + Sync {
    /// Load `rest`, delivering the outcome through the context.
    ///
    /// Not delivering an outcome leaves the requested identifier
    /// permanently unavailable.
    fn load(&self, rest: &str, ctx: &mut LoadContext<'_>) -> Result<()>;

    /// Normalize the `rest` half of a qualified identifier.
    ///
    /// The default delegates to the runtime's normalizer
    /// (`default_normalize`); plugins with their own relative-resolution
    /// semantics override this. `caller_base` is the base identifier of
    /// the requesting caller, when one is active.
    fn normalize(
        &self,
        rest: &str,
        default_normalize: &dyn Fn(&str) -> Result<String>,
        caller_base: Option<&str>,
    ) -> Result<String> {
        let _ = caller_base;
        default_normalize(rest)
    }
}

/// A plugin table registration.
pub(crate) struct RegisteredPlugin {
    pub plugin: Arc<dyn LoaderPlugin>,
    pub trusted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemorySourceProvider, NullEvaluator};

    struct Echo;

    impl LoaderPlugin for Echo {
        fn load(&self, rest: &str, ctx: &mut LoadContext<'_>) -> Result<()> {
            ctx.finish(LoadOutcome::Value(Value::from(rest)))
        }
    }

    fn runtime() -> Arc<ModuleRuntime> {
        ModuleRuntime::new(
            Arc::new(MemorySourceProvider::new()),
            Arc::new(NullEvaluator),
        )
    }

    #[test]
    fn test_finish_delivers_once() {
        let runtime = runtime();
        let mut caller = CallerContext::untrusted_root();
        let mut ctx = LoadContext::new(&runtime, &mut caller, "echo");

        Echo.load("a/b", &mut ctx).unwrap();
        let err = ctx.finish(LoadOutcome::Source("x.js".to_string())).unwrap_err();
        assert!(matches!(err, LoaderError::LoaderProtocolViolation { .. }));

        match ctx.into_outcome() {
            Some(LoadOutcome::Value(value)) => assert_eq!(value, Value::from("a/b")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_default_normalize_delegates() {
        let default = |rest: &str| Ok(format!("normalized/{}", rest));
        let result = Echo.normalize("x", &default, None).unwrap();
        assert_eq!(result, "normalized/x");
    }
}
