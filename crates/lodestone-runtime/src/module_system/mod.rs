// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The module system.
//!
//! Everything between an identifier and a guarded module value:
//!
//! - identifier normalization (`./`, `../` collapsing)
//! - mapping and path resolution (prefix tables, `*` fallback)
//! - caller-context tracking (who is asking)
//! - the registry and per-entry instantiation state machine
//! - the capability gate (trust-checked proxying)
//! - the loader-plugin protocol (`name!rest` interception)

pub mod context;
pub mod entry;
pub mod guard;
pub mod normalize;
pub mod plugin;
pub mod registry;
pub mod require;
pub mod resolver;

pub use context::{CallerContext, CallerMarker, SourceOrigin};
pub use entry::{
    EntryStatus, ModuleEntry, ModuleEntryBuilder, DEFAULT_DEPENDENCIES, EXPORTS_DEPENDENCY,
    MODULE_DEPENDENCY, REQUIRE_DEPENDENCY,
};
pub use guard::CapabilityGate;
pub use normalize::{is_relative, normalize_relative, split_loader};
pub use plugin::{LoadContext, LoadOutcome, LoaderPlugin};
pub use registry::{FailedKind, Registry};
pub use require::{parse_define_args, DefinePayload, ParsedDefine};
pub use resolver::{IdResolver, PathSpec, ResolverConfig, WILDCARD_PREFIX};
