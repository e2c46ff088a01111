// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Main module runtime implementation.

use crate::error::{LoaderError, Result};
use crate::host::{ScriptEvaluator, SourceProvider};
use crate::module_system::entry::EntryState;
use crate::module_system::plugin::RegisteredPlugin;
use crate::module_system::{
    is_relative, normalize_relative, parse_define_args, split_loader, CallerContext, CallerMarker,
    CapabilityGate, DefinePayload, FailedKind, IdResolver, LoadContext, LoadOutcome, LoaderPlugin,
    ModuleEntry, Registry, ResolverConfig, SourceOrigin, EXPORTS_DEPENDENCY, MODULE_DEPENDENCY,
    REQUIRE_DEPENDENCY,
};
use crate::runtime::EvalScope;
use lodestone_script::{Callable, DictObject, ScriptError, ScriptObject, ScriptResult, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// A public identifier after normalization and mapping, with its loader
/// qualification when present.
struct ResolvedId {
    public_id: String,
    /// `(loader public id, normalized rest)` for `name!rest` identifiers
    loader: Option<(String, String)>,
}

/// The module runtime.
///
/// Owns the registry, the resolver tables, the capability gate, and the
/// loader-plugin table, and drives lazy instantiation against the host's
/// source provider and script evaluator. All operations are synchronous;
/// every resolution call carries an explicit [`CallerContext`].
pub struct ModuleRuntime {
    registry: Registry,
    resolver: IdResolver,
    gate: CapabilityGate,
    plugins: RwLock<HashMap<String, RegisteredPlugin>>,
    provider: Arc<dyn SourceProvider>,
    evaluator: Arc<dyn ScriptEvaluator>,
}

impl ModuleRuntime {
    /// Create a runtime over a source provider and script evaluator.
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        evaluator: Arc<dyn ScriptEvaluator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Registry::new(),
            resolver: IdResolver::new(),
            gate: CapabilityGate::new(),
            plugins: RwLock::new(HashMap::new()),
            provider,
            evaluator,
        })
    }

    /// The module registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Declare a module (positional AMD argument list).
    ///
    /// Returns the effective public identifier: the explicit one
    /// (normalized when relative), else the identifier of the
    /// currently-executing module, else a freshly generated unique one.
    /// Registration overwrites any existing binding; no resolution is
    /// performed.
    pub fn define(self: &Arc<Self>, args: Vec<Value>, ctx: &mut CallerContext) -> Result<String> {
        let parsed = parse_define_args(args)?;

        let public_id = match parsed.id {
            Some(raw) => {
                if is_relative(&raw) {
                    normalize_relative(&raw, ctx.base_id().unwrap_or(""))?
                } else {
                    raw
                }
            }
            None => match ctx.current() {
                Some(CallerMarker::Module(entry)) => entry.internal_id().to_string(),
                Some(CallerMarker::Source(origin)) => origin
                    .default_id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                None => Uuid::new_v4().to_string(),
            },
        };

        let (trusted, source_location) = match ctx.current() {
            Some(CallerMarker::Source(origin)) => (origin.trusted, Some(origin.location.clone())),
            Some(CallerMarker::Module(entry)) => (
                entry.trusted(),
                entry.source_location().map(str::to_string),
            ),
            None => (ctx.trusted(), None),
        };

        let mut builder = ModuleEntry::builder(public_id.as_str()).trusted(trusted);
        if let Some(location) = source_location {
            builder = builder.source_location(location);
        }
        let entry = match parsed.payload {
            DefinePayload::Factory(factory) => {
                if let Some(deps) = parsed.deps {
                    builder = builder.dependencies(deps);
                }
                builder.factory(factory)
            }
            // A dependency list next to a plain value carries no meaning
            // and is dropped, per the AMD convention.
            DefinePayload::Value(value) => builder.value(value),
        };

        self.registry.register(entry);
        debug!("defined '{}'", public_id);
        Ok(public_id)
    }

    /// Resolve a single identifier to its (guarded) module value.
    pub fn require(self: &Arc<Self>, id: &str, ctx: &mut CallerContext) -> Result<Value> {
        self.resolve(id, ctx)
    }

    /// Resolve several identifiers; the first failure propagates.
    pub fn require_all(
        self: &Arc<Self>,
        ids: &[String],
        ctx: &mut CallerContext,
    ) -> Result<Vec<Value>> {
        ids.iter().map(|id| self.require(id, ctx)).collect()
    }

    /// Resolve several identifiers, collecting successes and failures
    /// with placeholders where the other applied.
    ///
    /// This is the payload of the AMD array form's error callback.
    pub fn try_require_all(
        self: &Arc<Self>,
        ids: &[String],
        ctx: &mut CallerContext,
    ) -> (Vec<Option<Value>>, Vec<Option<LoaderError>>) {
        let mut values = Vec::with_capacity(ids.len());
        let mut errors = Vec::with_capacity(ids.len());
        for id in ids {
            match self.require(id, ctx) {
                Ok(value) => {
                    values.push(Some(value));
                    errors.push(None);
                }
                Err(err) => {
                    values.push(None);
                    errors.push(Some(err));
                }
            }
        }
        (values, errors)
    }

    /// Merge a `{paths, map}` configuration document.
    ///
    /// Configuration is global: only legal while no caller context is
    /// active.
    pub fn configure(&self, config: ResolverConfig, ctx: &CallerContext) -> Result<()> {
        if !ctx.is_idle() {
            return Err(LoaderError::Config(
                "configuration is global and cannot run under a module caller".to_string(),
            ));
        }
        self.resolver.merge_config(config);
        Ok(())
    }

    /// Merge a configuration document given as JSON text.
    pub fn configure_json(&self, json: &str, ctx: &CallerContext) -> Result<()> {
        let config: ResolverConfig =
            serde_json::from_str(json).map_err(|err| LoaderError::Config(err.to_string()))?;
        self.configure(config, ctx)
    }

    /// Register a loader plugin under a public identifier.
    pub fn register_loader(
        &self,
        public_id: impl Into<String>,
        plugin: Arc<dyn LoaderPlugin>,
        trusted: bool,
    ) -> Result<()> {
        let public_id = public_id.into();
        if public_id.is_empty() || public_id.contains('!') {
            return Err(LoaderError::invalid_id(
                public_id,
                "loader identifiers must be plain module identifiers",
            ));
        }
        debug!("registered loader plugin '{}'", public_id);
        self.plugins
            .write()
            .insert(public_id, RegisteredPlugin { plugin, trusted });
        Ok(())
    }

    /// Register a ready value under a public identifier.
    pub fn register_value(
        &self,
        public_id: impl Into<String>,
        value: Value,
        trusted: bool,
    ) -> Arc<ModuleEntry> {
        let entry = ModuleEntry::builder(public_id).trusted(trusted).value(value);
        self.registry.register(Arc::clone(&entry));
        entry
    }

    /// Resolve an identifier to its source location without
    /// instantiating anything.
    ///
    /// Loader-qualified identifiers never consult the path table and
    /// yield `None`.
    pub fn resolve_location(&self, id: &str, ctx: &CallerContext) -> Result<Option<String>> {
        let resolved = self.resolve_public_id(id, ctx)?;
        if resolved.loader.is_some() {
            return Ok(None);
        }
        Ok(self
            .resolver
            .resolve_source_location(&resolved.public_id, self.provider.as_ref()))
    }

    /// All registered public identifiers.
    pub fn registered_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Remove a binding and any cached failure for the identifier.
    ///
    /// Holders of the previously resolved value are unaffected. Returns
    /// whether a binding existed.
    pub fn undefine(&self, id: &str) -> bool {
        self.registry.remove(id).is_some()
    }

    // ---- resolution pipeline ----

    fn resolve(self: &Arc<Self>, raw_id: &str, ctx: &mut CallerContext) -> Result<Value> {
        let resolved = self.resolve_public_id(raw_id, ctx)?;
        let public_id = resolved.public_id.clone();

        let entry = match self.registry.lookup(&public_id) {
            Some(entry) => entry,
            None => {
                if let Some(err) = self.registry.cached_failure(&public_id) {
                    return Err(err);
                }
                self.load_missing(&resolved, ctx)?;
                match self.registry.lookup(&public_id) {
                    Some(entry) => entry,
                    None => {
                        self.registry.mark_failed(&public_id, FailedKind::Unavailable);
                        return Err(LoaderError::ModuleUnavailable(public_id));
                    }
                }
            }
        };

        let value = self.instantiate(&entry, ctx)?;
        match self.gate.guard(value, &public_id, ctx) {
            Err(err @ LoaderError::AccessDenied(_)) => {
                self.registry.mark_failed(&public_id, FailedKind::Denied);
                Err(err)
            }
            other => other,
        }
    }

    /// Normalize and map a raw identifier into its final public
    /// identifier, splitting off any loader qualification.
    fn resolve_public_id(&self, raw_id: &str, ctx: &CallerContext) -> Result<ResolvedId> {
        if raw_id.is_empty() {
            return Err(LoaderError::invalid_id(raw_id, "empty identifier"));
        }

        match split_loader(raw_id) {
            Some((loader_raw, rest_raw)) => {
                // The loader-name half is itself a module identifier and
                // may be relative or mapped.
                let loader_id = self.plain_public_id(loader_raw, ctx)?;

                let base = ctx.base_id().map(str::to_string);
                let default_normalize = move |rest: &str| -> Result<String> {
                    if is_relative(rest) {
                        normalize_relative(rest, base.as_deref().unwrap_or(""))
                    } else if rest.is_empty() {
                        Err(LoaderError::invalid_id(rest, "empty identifier"))
                    } else {
                        Ok(rest.to_string())
                    }
                };

                let rest = match self.plugin(&loader_id) {
                    Some((plugin, _)) => {
                        plugin.normalize(rest_raw, &default_normalize, ctx.base_id())?
                    }
                    None => default_normalize(rest_raw)?,
                };

                Ok(ResolvedId {
                    public_id: format!("{}!{}", loader_id, rest),
                    loader: Some((loader_id, rest)),
                })
            }
            None => Ok(ResolvedId {
                public_id: self.plain_public_id(raw_id, ctx)?,
                loader: None,
            }),
        }
    }

    fn plain_public_id(&self, raw: &str, ctx: &CallerContext) -> Result<String> {
        if raw.is_empty() {
            return Err(LoaderError::invalid_id(raw, "empty identifier"));
        }
        let normalized = if is_relative(raw) {
            normalize_relative(raw, ctx.base_id().unwrap_or(""))?
        } else {
            raw.to_string()
        };
        Ok(self.resolver.apply_map(&normalized, ctx.map_id()))
    }

    fn plugin(&self, public_id: &str) -> Option<(Arc<dyn LoaderPlugin>, bool)> {
        self.plugins
            .read()
            .get(public_id)
            .map(|registered| (Arc::clone(&registered.plugin), registered.trusted))
    }

    /// Attempt to produce an entry for a missing identifier.
    ///
    /// Leaves registration to the load path; the caller re-checks the
    /// registry and records the permanent failure when nothing appeared.
    fn load_missing(self: &Arc<Self>, resolved: &ResolvedId, ctx: &mut CallerContext) -> Result<()> {
        match &resolved.loader {
            Some((loader_id, rest)) => {
                self.load_via_plugin(&resolved.public_id, loader_id, rest, ctx)
            }
            None => {
                let location = self
                    .resolver
                    .resolve_source_location(&resolved.public_id, self.provider.as_ref());
                match location {
                    Some(location) => {
                        self.evaluate_location(&location, Some(resolved.public_id.clone()))
                    }
                    None => Ok(()),
                }
            }
        }
    }

    fn load_via_plugin(
        self: &Arc<Self>,
        public_id: &str,
        loader_id: &str,
        rest: &str,
        ctx: &mut CallerContext,
    ) -> Result<()> {
        let Some((plugin, plugin_trusted)) = self.plugin(loader_id) else {
            debug!("no loader plugin registered as '{}'", loader_id);
            return Ok(());
        };

        let outcome = {
            let mut load_ctx = LoadContext::new(self, ctx, loader_id);
            plugin.load(rest, &mut load_ctx)?;
            load_ctx.into_outcome()
        };

        match outcome {
            None => {
                warn!(
                    "loader plugin '{}' delivered no outcome for '{}'",
                    loader_id, rest
                );
                Ok(())
            }
            Some(LoadOutcome::Value(value)) => {
                let entry = ModuleEntry::builder(public_id)
                    .loader_name(loader_id)
                    .trusted(plugin_trusted)
                    .value(value);
                self.registry.register(entry);
                Ok(())
            }
            Some(LoadOutcome::Source(location)) => {
                let existing = self.registry.by_source(&location);
                if !existing.is_empty() {
                    // The source already ran; alias instead of
                    // re-evaluating it (its defines must not re-run).
                    let target = existing
                        .iter()
                        .find(|entry| {
                            entry.internal_id() == rest || entry.public_id() == rest
                        })
                        .unwrap_or(&existing[0]);
                    debug!(
                        "aliasing '{}' to '{}' (source '{}' already evaluated)",
                        public_id,
                        target.public_id(),
                        location
                    );
                    self.registry.register(target.alias(public_id));
                    return Ok(());
                }
                self.evaluate_location(&location, Some(public_id.to_string()))
            }
        }
    }

    fn evaluate_location(
        self: &Arc<Self>,
        location: &str,
        default_id: Option<String>,
    ) -> Result<()> {
        let source = self.provider.read(location)?;
        debug!("evaluating source '{}'", location);
        let origin = Arc::new(SourceOrigin {
            location: location.to_string(),
            trusted: source.trusted,
            default_id,
        });
        let mut scope = EvalScope::new(self, origin);
        self.evaluator.evaluate(&source, &mut scope)
    }

    // ---- lazy instantiation ----

    /// Drive an entry's `Pending -> Constructing -> Resolved` machine.
    ///
    /// The entry lock is held only for inspection and transition, never
    /// across dependency resolution or the factory call; re-entrant
    /// resolution of a constructing entry is the circular-dependency
    /// failure unless the entry pre-published an exports object.
    fn instantiate(self: &Arc<Self>, entry: &Arc<ModuleEntry>, ctx: &mut CallerContext) -> Result<Value> {
        let (factory, exports) = {
            let mut state = entry.state().lock();
            match &*state {
                EntryState::Resolved { value } => return Ok(value.clone()),
                EntryState::Constructing { exports } => {
                    return match exports {
                        Some(exports) => Ok(exports.clone()),
                        None => Err(LoaderError::CircularDependency(
                            entry.public_id().to_string(),
                        )),
                    };
                }
                EntryState::Pending { factory } => {
                    let factory = Arc::clone(factory);
                    let exports = entry
                        .declared_deps()
                        .iter()
                        .any(|dep| dep == EXPORTS_DEPENDENCY)
                        .then(|| Value::Object(DictObject::new()));
                    *state = EntryState::Constructing {
                        exports: exports.clone(),
                    };
                    (factory, exports)
                }
            }
        };

        let module_desc = entry
            .declared_deps()
            .iter()
            .any(|dep| dep == MODULE_DEPENDENCY)
            .then(|| {
                DictObject::from_entries([
                    ("id", Value::from(entry.internal_id())),
                    (
                        "exports",
                        exports
                            .clone()
                            .unwrap_or_else(|| Value::Object(DictObject::new())),
                    ),
                ])
            });

        let result = ctx.with(CallerMarker::Module(Arc::clone(entry)), |ctx| {
            let mut dep_values = Vec::with_capacity(entry.declared_deps().len());
            for dep in entry.declared_deps() {
                let value = match dep.as_str() {
                    REQUIRE_DEPENDENCY => self.scoped_require(entry),
                    EXPORTS_DEPENDENCY => exports
                        .clone()
                        .unwrap_or_else(|| Value::Object(DictObject::new())),
                    MODULE_DEPENDENCY => match &module_desc {
                        Some(desc) => Value::Object(Arc::clone(desc) as Arc<dyn ScriptObject>),
                        None => Value::Undefined,
                    },
                    _ => self.resolve(dep, ctx)?,
                };
                dep_values.push(value);
            }
            factory.call(&dep_values).map_err(LoaderError::from_script)
        });

        let returned = match result {
            Ok(value) => value,
            Err(err) => {
                // A failed construction must not block an independent
                // later attempt.
                *entry.state().lock() = EntryState::Pending { factory };
                return Err(err);
            }
        };

        let value = if !returned.is_undefined() {
            returned
        } else if let Some(desc) = &module_desc {
            desc.get("exports")
                .map_err(LoaderError::from_script)?
                .unwrap_or(Value::Undefined)
        } else if let Some(exports) = exports {
            exports
        } else {
            Value::Undefined
        };

        *entry.state().lock() = EntryState::Resolved {
            value: value.clone(),
        };
        debug!("resolved '{}'", entry.public_id());
        Ok(value)
    }

    /// The `require` pseudo-dependency: resolution scoped to a module.
    ///
    /// Accepts the single-identifier form and the AMD array form
    /// (`[ids], callback, errback?`); the error callback receives
    /// placeholder-padded value and message arrays. Captures weak
    /// references so module values stored in the registry never keep the
    /// runtime alive.
    fn scoped_require(self: &Arc<Self>, entry: &Arc<ModuleEntry>) -> Value {
        let runtime = Arc::downgrade(self);
        let module = Arc::downgrade(entry);
        Value::Function(Callable::named(REQUIRE_DEPENDENCY, move |args| {
            let Some(runtime) = runtime.upgrade() else {
                return Err(ScriptError::Message("module runtime dropped".to_string()));
            };
            let Some(module) = module.upgrade() else {
                return Err(ScriptError::Message("module entry dropped".to_string()));
            };
            let mut ctx = CallerContext::rooted(CallerMarker::Module(module));

            match args.first() {
                Some(Value::String(id)) => {
                    runtime.require(id, &mut ctx).map_err(ScriptError::from)
                }
                Some(Value::Array(items)) => {
                    let ids = items
                        .iter()
                        .map(|item| {
                            item.as_str().map(str::to_string).ok_or_else(|| {
                                ScriptError::type_error(
                                    "require: identifier list must contain strings",
                                )
                            })
                        })
                        .collect::<ScriptResult<Vec<String>>>()?;
                    let callback = args.get(1).and_then(Value::as_function).cloned();
                    let errback = args.get(2).and_then(Value::as_function).cloned();

                    match errback {
                        None => {
                            let values = runtime
                                .require_all(&ids, &mut ctx)
                                .map_err(ScriptError::from)?;
                            match callback {
                                Some(callback) => callback.call(&values),
                                None => Ok(Value::Undefined),
                            }
                        }
                        Some(errback) => {
                            let (values, errors) = runtime.try_require_all(&ids, &mut ctx);
                            if errors.iter().all(Option::is_none) {
                                let values: Vec<Value> =
                                    values.into_iter().map(Option::unwrap_or_default).collect();
                                match callback {
                                    Some(callback) => callback.call(&values),
                                    None => Ok(Value::Undefined),
                                }
                            } else {
                                let value_list = Value::Array(
                                    values.into_iter().map(Option::unwrap_or_default).collect(),
                                );
                                let error_list = Value::Array(
                                    errors
                                        .into_iter()
                                        .map(|err| match err {
                                            Some(err) => Value::from(err.to_string()),
                                            None => Value::Undefined,
                                        })
                                        .collect(),
                                );
                                errback.call(&[value_list, error_list])
                            }
                        }
                    }
                }
                _ => Err(ScriptError::type_error(
                    "require: expected an identifier or identifier list",
                )),
            }
        }))
    }
}
