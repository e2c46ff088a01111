// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Caller-context tracking.
//!
//! Every resolution call carries an explicit [`CallerContext`]: a stack
//! of markers recording who is currently asking. The top marker supplies
//! the base identifier for relative resolution, the trust level for
//! capability checks, and the attribution for anonymous `define` calls.
//! An empty stack falls back to the context's root trust, which the host
//! chooses when it creates the context.

use crate::module_system::entry::ModuleEntry;
use std::sync::Arc;

/// Origin of an evaluated source, used as a caller marker while that
/// source runs.
#[derive(Debug)]
pub struct SourceOrigin {
    /// Normalized source location
    pub location: String,
    /// Whether the location is a trusted source
    pub trusted: bool,
    /// Public identifier the load was initiated for, claimed by an
    /// anonymous `define` in the source
    pub default_id: Option<String>,
}

/// One "who is asking" marker.
#[derive(Debug, Clone)]
pub enum CallerMarker {
    /// A raw source location under evaluation
    Source(Arc<SourceOrigin>),
    /// A resolved module
    Module(Arc<ModuleEntry>),
}

impl CallerMarker {
    /// Base identifier for relative resolution.
    pub fn base_id(&self) -> &str {
        match self {
            CallerMarker::Source(origin) => &origin.location,
            CallerMarker::Module(entry) => entry.internal_id(),
        }
    }

    /// Identifier used for the caller side of the mapping walk.
    ///
    /// A source under evaluation maps as the module it is being loaded
    /// for, when one is known.
    pub fn map_id(&self) -> &str {
        match self {
            CallerMarker::Source(origin) => {
                origin.default_id.as_deref().unwrap_or(&origin.location)
            }
            CallerMarker::Module(entry) => entry.internal_id(),
        }
    }

    /// Trust level of the caller.
    pub fn trusted(&self) -> bool {
        match self {
            CallerMarker::Source(origin) => origin.trusted,
            CallerMarker::Module(entry) => entry.trusted(),
        }
    }
}

/// Explicit caller-context stack.
#[derive(Debug, Clone)]
pub struct CallerContext {
    stack: Vec<CallerMarker>,
    root_trusted: bool,
}

impl CallerContext {
    /// Context for an untrusted host caller.
    pub fn untrusted_root() -> Self {
        Self {
            stack: Vec::new(),
            root_trusted: false,
        }
    }

    /// Context for a trusted host caller.
    pub fn trusted_root() -> Self {
        Self {
            stack: Vec::new(),
            root_trusted: true,
        }
    }

    /// Fresh context rooted at a marker.
    ///
    /// Used when control re-enters the runtime through a value that
    /// crossed the capability gate: the captured marker becomes the
    /// whole known context.
    pub fn rooted(marker: CallerMarker) -> Self {
        let root_trusted = marker.trusted();
        Self {
            stack: vec![marker],
            root_trusted,
        }
    }

    /// The current caller, if any.
    pub fn current(&self) -> Option<&CallerMarker> {
        self.stack.last()
    }

    /// Whether no caller is active (global configuration is only legal
    /// here).
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run `body` with `marker` pushed as the current caller.
    ///
    /// The marker is popped on every exit path.
    pub fn with<R>(&mut self, marker: CallerMarker, body: impl FnOnce(&mut Self) -> R) -> R {
        self.stack.push(marker);
        let result = body(self);
        self.stack.pop();
        result
    }

    /// Base identifier of the current caller.
    pub fn base_id(&self) -> Option<&str> {
        self.current().map(CallerMarker::base_id)
    }

    /// Mapping-walk identifier of the current caller.
    pub fn map_id(&self) -> Option<&str> {
        self.current().map(CallerMarker::map_id)
    }

    /// Trust level in force: the current caller's, or the root's.
    pub fn trusted(&self) -> bool {
        self.current()
            .map(CallerMarker::trusted)
            .unwrap_or(self.root_trusted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestone_script::Value;

    fn module_marker(id: &str, trusted: bool) -> CallerMarker {
        CallerMarker::Module(
            ModuleEntry::builder(id)
                .trusted(trusted)
                .value(Value::Undefined),
        )
    }

    #[test]
    fn test_root_trust() {
        assert!(!CallerContext::untrusted_root().trusted());
        assert!(CallerContext::trusted_root().trusted());
    }

    #[test]
    fn test_with_pushes_and_pops() {
        let mut ctx = CallerContext::untrusted_root();
        assert!(ctx.is_idle());

        ctx.with(module_marker("a/b", true), |ctx| {
            assert!(!ctx.is_idle());
            assert_eq!(ctx.base_id(), Some("a/b"));
            assert!(ctx.trusted());

            ctx.with(module_marker("c/d", false), |ctx| {
                assert_eq!(ctx.base_id(), Some("c/d"));
                assert!(!ctx.trusted());
            });

            assert_eq!(ctx.base_id(), Some("a/b"));
        });

        assert!(ctx.is_idle());
        assert_eq!(ctx.base_id(), None);
    }

    #[test]
    fn test_source_marker_attribution() {
        let origin = Arc::new(SourceOrigin {
            location: "/srv/app/main.js".to_string(),
            trusted: true,
            default_id: Some("app/main".to_string()),
        });
        let marker = CallerMarker::Source(origin);
        assert_eq!(marker.base_id(), "/srv/app/main.js");
        assert_eq!(marker.map_id(), "app/main");
        assert!(marker.trusted());
    }

    #[test]
    fn test_rooted_inherits_marker_trust() {
        let ctx = CallerContext::rooted(module_marker("a", true));
        assert!(ctx.trusted());
        assert_eq!(ctx.base_id(), Some("a"));
    }
}
