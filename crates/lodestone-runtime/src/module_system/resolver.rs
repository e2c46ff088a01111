// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Identifier mapping and source-location resolution.
//!
//! Two prefix tables drive resolution: the mapping table rewrites
//! requested identifiers per requesting package ("map different things
//! to the same dependency name for different requesters"), and the path
//! table turns identifiers into candidate source locations probed
//! through the [`SourceProvider`](crate::host::SourceProvider). Both
//! support `*` as the global fallback prefix. Tables are populated by
//! administrative configuration and read-only during steady-state
//! resolution.

use crate::host::SourceProvider;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, trace};

/// The global-fallback prefix.
pub const WILDCARD_PREFIX: &str = "*";

/// One-or-many base locations for a path-table prefix.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
    /// A single base location
    One(String),
    /// An ordered list of base locations to probe in turn
    Many(Vec<String>),
}

impl PathSpec {
    /// The base locations in probe order.
    pub fn locations(&self) -> &[String] {
        match self {
            PathSpec::One(loc) => std::slice::from_ref(loc),
            PathSpec::Many(locs) => locs,
        }
    }
}

/// Configuration document for the resolver tables.
///
/// Deserializable from the JSON shape hosts pass to
/// `require.config({paths, map})`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverConfig {
    /// Identifier-prefix to base-location(s)
    #[serde(default)]
    pub paths: HashMap<String, PathSpec>,
    /// Identifier-prefix to `{from -> to}` substitution table
    #[serde(default)]
    pub map: HashMap<String, HashMap<String, String>>,
}

/// Mapping and path resolver.
pub struct IdResolver {
    paths: RwLock<HashMap<String, Vec<String>>>,
    map: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl IdResolver {
    /// Create a resolver with empty tables.
    pub fn new() -> Self {
        Self {
            paths: RwLock::new(HashMap::new()),
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Merge a configuration document into the tables.
    ///
    /// Later configuration wins per prefix (paths) and per `from` entry
    /// (map).
    pub fn merge_config(&self, config: ResolverConfig) {
        let mut paths = self.paths.write();
        for (prefix, spec) in config.paths {
            debug!("paths['{}'] = {:?}", prefix, spec.locations());
            paths.insert(prefix, spec.locations().to_vec());
        }
        drop(paths);

        let mut map = self.map.write();
        for (prefix, table) in config.map {
            let slot = map.entry(prefix).or_default();
            for (from, to) in table {
                trace!("map: '{}' -> '{}'", from, to);
                slot.insert(from, to);
            }
        }
    }

    /// Apply the mapping walk to a requested identifier.
    ///
    /// The caller's identifier is truncated at each `/` from most- to
    /// least-specific; the first prefix with a mapping table is
    /// consulted, falling back to the `*` table. Within a table the
    /// target's own prefixes are tried most-specific-first and the first
    /// `{from -> to}` hit rewrites prefix and remainder. Unmatched
    /// identifiers pass through unchanged.
    pub fn apply_map(&self, target: &str, caller: Option<&str>) -> String {
        let map = self.map.read();

        if let Some(caller_id) = caller {
            for caller_prefix in prefixes(caller_id) {
                if let Some(table) = map.get(caller_prefix) {
                    if let Some(mapped) = rewrite(table, target) {
                        trace!(
                            "mapped '{}' -> '{}' for caller '{}'",
                            target, mapped, caller_id
                        );
                        return mapped;
                    }
                }
            }
        }

        if let Some(table) = map.get(WILDCARD_PREFIX) {
            if let Some(mapped) = rewrite(table, target) {
                trace!("mapped '{}' -> '{}' via wildcard", target, mapped);
                return mapped;
            }
        }

        target.to_string()
    }

    /// Resolve an internal identifier to a loadable source location.
    ///
    /// Walks the identifier's own prefixes against the path table
    /// (fallback `*`), takes the first matching base-location list, and
    /// probes `base '/' identifier suffix` for every base and
    /// provider-supported suffix in order. When no prefix matches at
    /// all, the bare identifier is probed directly so an unconfigured
    /// runtime still resolves provider-native locations.
    pub fn resolve_source_location(
        &self,
        internal_id: &str,
        provider: &dyn SourceProvider,
    ) -> Option<String> {
        let paths = self.paths.read();
        let bases = prefixes(internal_id)
            .find_map(|prefix| paths.get(prefix))
            .or_else(|| paths.get(WILDCARD_PREFIX));

        let suffixes = provider.suffixes();
        match bases {
            Some(bases) => {
                for base in bases {
                    for suffix in &suffixes {
                        let candidate =
                            format!("{}/{}{}", base.trim_end_matches('/'), internal_id, suffix);
                        if provider.exists(&candidate) {
                            trace!("'{}' resolved to '{}'", internal_id, candidate);
                            return Some(candidate);
                        }
                    }
                }
                None
            }
            None => {
                for suffix in &suffixes {
                    let candidate = format!("{}{}", internal_id, suffix);
                    if provider.exists(&candidate) {
                        trace!("'{}' resolved to '{}'", internal_id, candidate);
                        return Some(candidate);
                    }
                }
                None
            }
        }
    }
}

impl Default for IdResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite a target identifier through one `{from -> to}` table,
/// most-specific target prefix first.
fn rewrite(table: &HashMap<String, String>, target: &str) -> Option<String> {
    for target_prefix in prefixes(target) {
        if let Some(to) = table.get(target_prefix) {
            let remainder = &target[target_prefix.len()..];
            return Some(format!("{}{}", to, remainder));
        }
    }
    None
}

/// The identifier's prefixes, most specific first (`a/b/c`, `a/b`, `a`).
fn prefixes(id: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(id);
    std::iter::from_fn(move || {
        let prefix = current?;
        current = prefix.rfind('/').map(|cut| &prefix[..cut]);
        Some(prefix)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemorySourceProvider;

    fn config(json: &str) -> ResolverConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_prefixes_order() {
        let collected: Vec<&str> = prefixes("a/b/c").collect();
        assert_eq!(collected, vec!["a/b/c", "a/b", "a"]);
    }

    #[test]
    fn test_mapping_precedence() {
        let resolver = IdResolver::new();
        resolver.merge_config(config(
            r#"{"map": {"a/b": {"x": "y"}, "*": {"x": "z"}}}"#,
        ));

        // A caller under a/b sees the package-specific mapping.
        assert_eq!(resolver.apply_map("x", Some("a/b/c")), "y");
        // Any other caller falls back to the wildcard table.
        assert_eq!(resolver.apply_map("x", Some("d/e")), "z");
        assert_eq!(resolver.apply_map("x", None), "z");
    }

    #[test]
    fn test_mapping_rewrites_prefix_and_remainder() {
        let resolver = IdResolver::new();
        resolver.merge_config(config(r#"{"map": {"*": {"old/util": "new/util"}}}"#));
        assert_eq!(resolver.apply_map("old/util/strings", None), "new/util/strings");
    }

    #[test]
    fn test_mapping_most_specific_target_wins() {
        let resolver = IdResolver::new();
        resolver.merge_config(config(
            r#"{"map": {"*": {"a": "one", "a/b": "two"}}}"#,
        ));
        assert_eq!(resolver.apply_map("a/b/c", None), "two/c");
        assert_eq!(resolver.apply_map("a/x", None), "one/x");
    }

    #[test]
    fn test_unmatched_passes_through() {
        let resolver = IdResolver::new();
        assert_eq!(resolver.apply_map("plain/id", Some("caller")), "plain/id");
    }

    #[test]
    fn test_path_probe_prefix_and_suffix_order() {
        let provider = MemorySourceProvider::new();
        provider.insert("vendor/a/b.js", "// b");

        let resolver = IdResolver::new();
        resolver.merge_config(config(
            r#"{"paths": {"a": ["lib", "vendor"], "*": "fallback"}}"#,
        ));

        assert_eq!(
            resolver.resolve_source_location("a/b", &provider),
            Some("vendor/a/b.js".to_string())
        );
    }

    #[test]
    fn test_path_wildcard_fallback() {
        let provider = MemorySourceProvider::new();
        provider.insert("fallback/d/e.js", "// e");

        let resolver = IdResolver::new();
        resolver.merge_config(config(
            r#"{"paths": {"a": "lib", "*": "fallback"}}"#,
        ));

        assert_eq!(
            resolver.resolve_source_location("d/e", &provider),
            Some("fallback/d/e.js".to_string())
        );
    }

    #[test]
    fn test_unconfigured_probes_bare_identifier() {
        let provider = MemorySourceProvider::new();
        provider.insert("d/e.js", "// e");

        let resolver = IdResolver::new();
        assert_eq!(
            resolver.resolve_source_location("d/e", &provider),
            Some("d/e.js".to_string())
        );
    }

    #[test]
    fn test_exact_location_probed_before_suffixes() {
        let provider = MemorySourceProvider::new();
        provider.insert("lib/a/b", "// exact");
        provider.insert("lib/a/b.js", "// suffixed");

        let resolver = IdResolver::new();
        resolver.merge_config(config(r#"{"paths": {"*": "lib"}}"#));
        assert_eq!(
            resolver.resolve_source_location("a/b", &provider),
            Some("lib/a/b".to_string())
        );
    }

    #[test]
    fn test_no_location_found() {
        let provider = MemorySourceProvider::new();
        let resolver = IdResolver::new();
        assert_eq!(resolver.resolve_source_location("a/b", &provider), None);
    }
}
