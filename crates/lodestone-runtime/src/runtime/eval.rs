// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scope handed to a script evaluator.

use crate::error::Result;
use crate::module_system::{CallerContext, CallerMarker, SourceOrigin};
use crate::runtime::ModuleRuntime;
use lodestone_script::Value;
use std::sync::Arc;

/// `define`/`require` access for one unit of source under evaluation.
///
/// Every call through the scope is attributed to the evaluated source
/// location: entries registered by `define` carry the location and its
/// trust level, relative identifiers resolve against it, and an
/// anonymous `define` claims the identifier the load was initiated for.
pub struct EvalScope<'a> {
    runtime: &'a Arc<ModuleRuntime>,
    origin: Arc<SourceOrigin>,
    ctx: CallerContext,
}

impl<'a> EvalScope<'a> {
    pub(crate) fn new(runtime: &'a Arc<ModuleRuntime>, origin: Arc<SourceOrigin>) -> Self {
        let ctx = CallerContext::rooted(CallerMarker::Source(Arc::clone(&origin)));
        Self {
            runtime,
            origin,
            ctx,
        }
    }

    /// The location under evaluation.
    pub fn location(&self) -> &str {
        &self.origin.location
    }

    /// Whether the location is a trusted source.
    pub fn trusted(&self) -> bool {
        self.origin.trusted
    }

    /// Declare a module (positional AMD argument list).
    pub fn define(&mut self, args: Vec<Value>) -> Result<String> {
        self.runtime.define(args, &mut self.ctx)
    }

    /// Resolve a module as this source.
    pub fn require(&mut self, id: &str) -> Result<Value> {
        self.runtime.require(id, &mut self.ctx)
    }
}
