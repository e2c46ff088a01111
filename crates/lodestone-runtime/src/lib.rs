// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # lodestone-runtime
//!
//! A dynamic module resolution and lazy-instantiation runtime in the AMD
//! convention: scripts declare named modules with optional dependency
//! lists, consumers request modules by identifier, and the runtime
//! resolves identifiers, instantiates module values on first use,
//! detects circular dependencies, and gates access to flagged modules by
//! caller trust.
//!
//! The runtime is host-agnostic. Two collaborator seams connect it to an
//! embedding:
//!
//! - a [`SourceProvider`] turns normalized identifiers into script
//!   source ([`MemorySourceProvider`] and [`DirSourceProvider`] ship
//!   in-crate)
//! - a [`ScriptEvaluator`] executes one unit of source for its `define`
//!   side effects through an [`EvalScope`]
//!
//! Module exports are opaque [`lodestone_script::Value`]s; the runtime
//! never inspects them beyond capability-flag declarations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lodestone_runtime::{CallerContext, ModuleRuntime};
//! use lodestone_runtime::host::{MemorySourceProvider, NullEvaluator};
//! use lodestone_script::Value;
//! use std::sync::Arc;
//!
//! let runtime = ModuleRuntime::new(
//!     Arc::new(MemorySourceProvider::new()),
//!     Arc::new(NullEvaluator),
//! );
//! runtime.register_value("conf/limits", Value::Number(8.0), false);
//!
//! let mut ctx = CallerContext::untrusted_root();
//! let limits = runtime.require("conf/limits", &mut ctx)?;
//! ```
//!
//! ## Resolution pipeline
//!
//! `require(id)` normalizes relative segments against the caller's base
//! identifier, applies the per-caller mapping tables, splits off any
//! `loader!` qualification, and consults the registry. A missing entry
//! triggers a load (through the named loader plugin, or through the
//! path table and source provider) during which the evaluated source
//! registers entries via `define`. The entry's factory runs at most
//! once; the memoized value passes through the capability gate under the
//! requesting caller's trust level before it is returned.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod host;
pub mod module_system;
pub mod runtime;

// Re-exports
pub use error::{LoaderError, Result};
pub use host::{
    DirSourceProvider, MemorySourceProvider, NullEvaluator, ScriptEvaluator, ScriptSource,
    SourceProvider,
};
pub use module_system::{
    CallerContext, CallerMarker, CapabilityGate, EntryStatus, IdResolver, LoadContext,
    LoadOutcome, LoaderPlugin, ModuleEntry, Registry, ResolverConfig, SourceOrigin,
};
pub use runtime::{EvalScope, ModuleRuntime};

/// Version of the lodestone runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
