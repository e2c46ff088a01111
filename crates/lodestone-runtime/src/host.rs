// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host collaborator seams.
//!
//! The runtime never touches storage and never executes script text
//! itself; both concerns belong to the embedding host. A
//! [`SourceProvider`] turns normalized source locations into script
//! text, and a [`ScriptEvaluator`] runs one unit of source for its side
//! effects (its `define` calls) against an [`EvalScope`].

use crate::error::{LoaderError, Result};
use crate::runtime::EvalScope;
use dashmap::DashMap;
use std::path::{Path, PathBuf};

/// One unit of loadable script source.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    /// Normalized location the source was read from
    pub location: String,
    /// The raw source text
    pub text: String,
    /// Whether the location is a trusted ("secure") source
    pub trusted: bool,
}

/// Turns normalized source locations into script text.
pub trait SourceProvider: Send + Sync {
    /// Suffixes to probe for each candidate location, in order.
    ///
    /// The empty suffix probes the location exactly as given; the
    /// default probes exact first, then `.js`.
    fn suffixes(&self) -> Vec<String> {
        vec![String::new(), ".js".to_string()]
    }

    /// Whether a source exists at the location.
    fn exists(&self, location: &str) -> bool;

    /// Read the source at the location.
    fn read(&self, location: &str) -> Result<ScriptSource>;

    /// Whether the location is a trusted ("secure") source.
    fn is_trusted(&self, location: &str) -> bool {
        let _ = location;
        false
    }
}

/// In-memory source provider.
///
/// The standard provider for embeddings that assemble their module
/// space programmatically, and the test double of choice.
#[derive(Debug, Default)]
pub struct MemorySourceProvider {
    sources: DashMap<String, StoredSource>,
}

#[derive(Debug, Clone)]
struct StoredSource {
    text: String,
    trusted: bool,
}

impl MemorySourceProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an untrusted source.
    pub fn insert(&self, location: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(
            location.into(),
            StoredSource {
                text: text.into(),
                trusted: false,
            },
        );
    }

    /// Store a trusted source.
    pub fn insert_trusted(&self, location: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(
            location.into(),
            StoredSource {
                text: text.into(),
                trusted: true,
            },
        );
    }

    /// Remove a source.
    pub fn remove(&self, location: &str) -> bool {
        self.sources.remove(location).is_some()
    }
}

impl SourceProvider for MemorySourceProvider {
    fn exists(&self, location: &str) -> bool {
        self.sources.contains_key(location)
    }

    fn read(&self, location: &str) -> Result<ScriptSource> {
        let stored = self
            .sources
            .get(location)
            .ok_or_else(|| LoaderError::ModuleUnavailable(location.to_string()))?;
        Ok(ScriptSource {
            location: location.to_string(),
            text: stored.text.clone(),
            trusted: stored.trusted,
        })
    }

    fn is_trusted(&self, location: &str) -> bool {
        self.sources
            .get(location)
            .map(|stored| stored.trusted)
            .unwrap_or(false)
    }
}

/// Directory-rooted file-system source provider.
///
/// Locations are interpreted as paths relative to the root directory;
/// locations that escape the root do not exist. Trust is a property of
/// the whole root, chosen at construction.
#[derive(Debug)]
pub struct DirSourceProvider {
    root: PathBuf,
    trusted: bool,
}

impl DirSourceProvider {
    /// Create a provider rooted at a directory, serving untrusted
    /// sources.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            trusted: false,
        }
    }

    /// Create a provider whose whole root is a trusted source.
    pub fn trusted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            trusted: true,
        }
    }

    /// Resolve a location to a file inside the root, or `None` when it
    /// escapes the root or does not exist.
    fn contained(&self, location: &str) -> Option<PathBuf> {
        if Path::new(location).is_absolute() {
            return None;
        }
        let candidate = self.root.join(location);
        let canonical = candidate.canonicalize().ok()?;
        let root = self.root.canonicalize().ok()?;
        if canonical.starts_with(&root) && canonical.is_file() {
            Some(canonical)
        } else {
            None
        }
    }
}

impl SourceProvider for DirSourceProvider {
    fn exists(&self, location: &str) -> bool {
        self.contained(location).is_some()
    }

    fn read(&self, location: &str) -> Result<ScriptSource> {
        let path = self
            .contained(location)
            .ok_or_else(|| LoaderError::ModuleUnavailable(location.to_string()))?;
        let text = std::fs::read_to_string(&path)?;
        Ok(ScriptSource {
            location: location.to_string(),
            text,
            trusted: self.trusted,
        })
    }

    fn is_trusted(&self, location: &str) -> bool {
        let _ = location;
        self.trusted
    }
}

/// Executes one unit of script source for its side effects.
///
/// Evaluation is expected to call [`EvalScope::define`] once per module
/// the source declares; the scope attributes every call to the evaluated
/// location and its trust level.
pub trait ScriptEvaluator: Send + Sync {
    /// Evaluate the source against the scope.
    fn evaluate(&self, source: &ScriptSource, scope: &mut EvalScope<'_>) -> Result<()>;
}

/// An evaluator that evaluates nothing.
///
/// For embeddings that register every module programmatically and never
/// load script source; any load attempt that reaches evaluation
/// registers no entries and the requested identifier is reported
/// unavailable.
#[derive(Debug, Default)]
pub struct NullEvaluator;

impl ScriptEvaluator for NullEvaluator {
    fn evaluate(&self, source: &ScriptSource, scope: &mut EvalScope<'_>) -> Result<()> {
        let _ = (source, scope);
        Ok(())
    }
}
