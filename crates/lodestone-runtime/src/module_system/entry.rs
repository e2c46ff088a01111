// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module entries and their instantiation state machine.

use lodestone_script::{Callable, Value};
use parking_lot::Mutex;
use std::sync::Arc;

/// The `require` pseudo-dependency name.
pub const REQUIRE_DEPENDENCY: &str = "require";
/// The `exports` pseudo-dependency name.
pub const EXPORTS_DEPENDENCY: &str = "exports";
/// The `module` pseudo-dependency name.
pub const MODULE_DEPENDENCY: &str = "module";

/// Default dependency list for factories declared without one.
pub const DEFAULT_DEPENDENCIES: [&str; 3] =
    [REQUIRE_DEPENDENCY, EXPORTS_DEPENDENCY, MODULE_DEPENDENCY];

/// Instantiation state of an entry.
///
/// `Pending → Constructing → Resolved`, or directly `Resolved` for
/// value-based registration. `Resolved` is terminal; a failed
/// construction falls back to `Pending` with the factory intact so an
/// independent later attempt may retry.
#[derive(Debug)]
pub(crate) enum EntryState {
    /// Factory registered, not yet invoked
    Pending {
        /// The module factory
        factory: Arc<Callable>,
    },
    /// Factory invocation in progress
    Constructing {
        /// Pre-published exports object, present when the factory
        /// declared the `exports` pseudo-dependency
        exports: Option<Value>,
    },
    /// Value memoized
    Resolved {
        /// The module value
        value: Value,
    },
}

/// Externally observable entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Factory registered, not yet invoked
    Pending,
    /// Factory invocation in progress
    Constructing,
    /// Value memoized
    Resolved,
}

/// One registered module.
///
/// The state cell is shared: an alias entry registered under a
/// different public identifier clones the cell, so the at-most-one-
/// `Constructing` invariant holds across every name an entry is bound
/// under.
#[derive(Debug)]
pub struct ModuleEntry {
    public_id: String,
    internal_id: String,
    loader_name: Option<String>,
    source_location: Option<String>,
    trusted: bool,
    declared_deps: Vec<String>,
    state: Arc<Mutex<EntryState>>,
}

impl ModuleEntry {
    /// Start building an entry for a public identifier.
    pub fn builder(public_id: impl Into<String>) -> ModuleEntryBuilder {
        ModuleEntryBuilder {
            public_id: public_id.into(),
            internal_id: None,
            loader_name: None,
            source_location: None,
            trusted: false,
            deps: None,
        }
    }

    /// Create an alias of this entry under another public identifier.
    ///
    /// The alias shares this entry's state cell and internal identifier.
    pub fn alias(self: &Arc<Self>, public_id: impl Into<String>) -> Arc<ModuleEntry> {
        Arc::new(ModuleEntry {
            public_id: public_id.into(),
            internal_id: self.internal_id.clone(),
            loader_name: self.loader_name.clone(),
            source_location: self.source_location.clone(),
            trusted: self.trusted,
            declared_deps: self.declared_deps.clone(),
            state: Arc::clone(&self.state),
        })
    }

    /// Identifier consumers look this entry up under.
    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    /// Identifier used for dependency and caching purposes.
    pub fn internal_id(&self) -> &str {
        &self.internal_id
    }

    /// Loader plugin that produced this entry, if any.
    pub fn loader_name(&self) -> Option<&str> {
        self.loader_name.as_deref()
    }

    /// Source location the entry was created from, if any.
    pub fn source_location(&self) -> Option<&str> {
        self.source_location.as_deref()
    }

    /// Whether the entry originates from a trusted source.
    pub fn trusted(&self) -> bool {
        self.trusted
    }

    /// Declared dependency identifiers, in resolution order.
    pub fn declared_deps(&self) -> &[String] {
        &self.declared_deps
    }

    /// Current instantiation status.
    pub fn status(&self) -> EntryStatus {
        match &*self.state.lock() {
            EntryState::Pending { .. } => EntryStatus::Pending,
            EntryState::Constructing { .. } => EntryStatus::Constructing,
            EntryState::Resolved { .. } => EntryStatus::Resolved,
        }
    }

    pub(crate) fn state(&self) -> &Mutex<EntryState> {
        &self.state
    }
}

/// Builder for [`ModuleEntry`].
#[derive(Debug)]
pub struct ModuleEntryBuilder {
    public_id: String,
    internal_id: Option<String>,
    loader_name: Option<String>,
    source_location: Option<String>,
    trusted: bool,
    deps: Option<Vec<String>>,
}

impl ModuleEntryBuilder {
    /// Set the internal identifier (defaults to the public identifier).
    pub fn internal_id(mut self, id: impl Into<String>) -> Self {
        self.internal_id = Some(id.into());
        self
    }

    /// Record the loader plugin that produced the entry.
    pub fn loader_name(mut self, name: impl Into<String>) -> Self {
        self.loader_name = Some(name.into());
        self
    }

    /// Record the source location the entry was created from.
    pub fn source_location(mut self, location: impl Into<String>) -> Self {
        self.source_location = Some(location.into());
        self
    }

    /// Mark the entry as originating from a trusted source.
    pub fn trusted(mut self, trusted: bool) -> Self {
        self.trusted = trusted;
        self
    }

    /// Declare the dependency list explicitly.
    ///
    /// An explicit empty list suppresses the default pseudo-dependency
    /// list for factories.
    pub fn dependencies(mut self, deps: Vec<String>) -> Self {
        self.deps = Some(deps);
        self
    }

    /// Finish as a value-based entry (immediately `Resolved`).
    pub fn value(self, value: Value) -> Arc<ModuleEntry> {
        self.build(None, EntryState::Resolved { value })
    }

    /// Finish as a factory-based entry (`Pending`).
    ///
    /// Without an explicit dependency list the factory gets the default
    /// `["require", "exports", "module"]`.
    pub fn factory(self, factory: Arc<Callable>) -> Arc<ModuleEntry> {
        let deps = self.deps.clone().unwrap_or_else(|| {
            DEFAULT_DEPENDENCIES
                .iter()
                .map(|dep| dep.to_string())
                .collect()
        });
        self.build(Some(deps), EntryState::Pending { factory })
    }

    fn build(self, deps: Option<Vec<String>>, state: EntryState) -> Arc<ModuleEntry> {
        Arc::new(ModuleEntry {
            internal_id: self.internal_id.unwrap_or_else(|| self.public_id.clone()),
            public_id: self.public_id,
            loader_name: self.loader_name,
            source_location: self.source_location,
            trusted: self.trusted,
            declared_deps: deps.or(self.deps).unwrap_or_default(),
            state: Arc::new(Mutex::new(state)),
        })
    }
}
