// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The module registry.
//!
//! Storage only: identifier and source-location indexes plus the
//! permanent-failure cache. Lazy instantiation is driven by the runtime
//! (`runtime::ModuleRuntime`), which keeps every load and factory
//! invocation outside the registry lock.

use crate::error::LoaderError;
use crate::module_system::entry::ModuleEntry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error class recorded in the permanent-failure cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedKind {
    /// Resolution found no entry after a load attempt
    Unavailable,
    /// Resolution was denied for lack of trust
    Denied,
}

#[derive(Default)]
struct RegistryMaps {
    entries: HashMap<String, Arc<ModuleEntry>>,
    by_source: HashMap<String, Vec<Arc<ModuleEntry>>>,
}

/// Identifier and source-location indexes over registered modules.
///
/// Registration overwrites (last write wins); holders of a previously
/// returned entry keep a valid reference. The failure cache
/// short-circuits repeated load attempts for identifiers that have
/// already failed permanently, re-raising the same error class.
pub struct Registry {
    maps: RwLock<RegistryMaps>,
    failed: DashMap<String, FailedKind>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(RegistryMaps::default()),
            failed: DashMap::new(),
        }
    }

    /// Insert an entry under its public identifier.
    ///
    /// Appends to the source-location index when the entry carries a
    /// source location. No resolution is performed.
    pub fn register(&self, entry: Arc<ModuleEntry>) {
        debug!(
            "registered '{}' (internal '{}', source {:?})",
            entry.public_id(),
            entry.internal_id(),
            entry.source_location()
        );
        let mut maps = self.maps.write();
        if let Some(location) = entry.source_location() {
            maps.by_source
                .entry(location.to_string())
                .or_default()
                .push(Arc::clone(&entry));
        }
        maps.entries.insert(entry.public_id().to_string(), entry);
    }

    /// Look up an entry by public identifier.
    pub fn lookup(&self, public_id: &str) -> Option<Arc<ModuleEntry>> {
        self.maps.read().entries.get(public_id).cloned()
    }

    /// Entries created from a source location, in insertion order.
    pub fn by_source(&self, location: &str) -> Vec<Arc<ModuleEntry>> {
        self.maps
            .read()
            .by_source
            .get(location)
            .cloned()
            .unwrap_or_default()
    }

    /// All registered public identifiers.
    pub fn ids(&self) -> Vec<String> {
        self.maps.read().entries.keys().cloned().collect()
    }

    /// Remove a binding and any cached failure for the identifier.
    ///
    /// Holders of the removed entry are unaffected.
    pub fn remove(&self, public_id: &str) -> Option<Arc<ModuleEntry>> {
        self.failed.remove(public_id);
        let mut maps = self.maps.write();
        let removed = maps.entries.remove(public_id)?;
        if let Some(location) = removed.source_location() {
            if let Some(list) = maps.by_source.get_mut(location) {
                list.retain(|entry| !Arc::ptr_eq(entry, &removed));
                if list.is_empty() {
                    maps.by_source.remove(location);
                }
            }
        }
        Some(removed)
    }

    /// Record a permanent failure for an identifier.
    pub fn mark_failed(&self, public_id: &str, kind: FailedKind) {
        warn!("'{}' marked permanently failed: {:?}", public_id, kind);
        self.failed.insert(public_id.to_string(), kind);
    }

    /// The cached failure for an identifier, as a raisable error.
    pub fn cached_failure(&self, public_id: &str) -> Option<LoaderError> {
        self.failed.get(public_id).map(|kind| match *kind {
            FailedKind::Unavailable => LoaderError::ModuleUnavailable(public_id.to_string()),
            FailedKind::Denied => LoaderError::AccessDenied(public_id.to_string()),
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestone_script::Value;

    fn entry(public_id: &str, location: Option<&str>) -> Arc<ModuleEntry> {
        let mut builder = ModuleEntry::builder(public_id);
        if let Some(location) = location {
            builder = builder.source_location(location);
        }
        builder.value(Value::from(public_id))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        registry.register(entry("a/b", None));
        assert!(registry.lookup("a/b").is_some());
        assert!(registry.lookup("a/c").is_none());
    }

    #[test]
    fn test_last_write_wins_but_old_reference_survives() {
        let registry = Registry::new();
        let first = entry("a/b", None);
        registry.register(Arc::clone(&first));
        registry.register(entry("a/b", None));

        let current = registry.lookup("a/b").unwrap();
        assert!(!Arc::ptr_eq(&first, &current));
        // The overwritten entry is still a valid module.
        assert_eq!(first.public_id(), "a/b");
    }

    #[test]
    fn test_by_source_insertion_order() {
        let registry = Registry::new();
        registry.register(entry("a/one", Some("/srv/pack.js")));
        registry.register(entry("a/two", Some("/srv/pack.js")));

        let entries = registry.by_source("/srv/pack.js");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].public_id(), "a/one");
        assert_eq!(entries[1].public_id(), "a/two");
    }

    #[test]
    fn test_remove_clears_indexes_and_failures() {
        let registry = Registry::new();
        registry.register(entry("a/b", Some("/srv/pack.js")));
        registry.mark_failed("a/gone", FailedKind::Unavailable);

        assert!(registry.remove("a/b").is_some());
        assert!(registry.lookup("a/b").is_none());
        assert!(registry.by_source("/srv/pack.js").is_empty());

        assert!(registry.cached_failure("a/gone").is_some());
        registry.remove("a/gone");
        assert!(registry.cached_failure("a/gone").is_none());
    }

    #[test]
    fn test_cached_failure_classes() {
        let registry = Registry::new();
        registry.mark_failed("u", FailedKind::Unavailable);
        registry.mark_failed("d", FailedKind::Denied);

        assert!(matches!(
            registry.cached_failure("u"),
            Some(LoaderError::ModuleUnavailable(_))
        ));
        assert!(matches!(
            registry.cached_failure("d"),
            Some(LoaderError::AccessDenied(_))
        ));
        assert!(registry.cached_failure("other").is_none());
    }
}
