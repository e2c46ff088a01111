// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The capability gate.
//!
//! Every value handed out by the runtime passes through the gate, which
//! enforces "requires secure caller" flags against the requesting
//! caller's trust level and wraps objects and callables in transparent
//! forwarding proxies. The proxies re-apply the gate to whatever crosses
//! them (member reads, call results), so a flagged value stays guarded
//! however deep in a structure it is found. Flags are a property of the
//! value: a nested value's own declaration wins, and a value with no
//! declaration inherits the flags already in force.

use crate::error::{LoaderError, Result};
use crate::module_system::context::{CallerContext, CallerMarker};
use dashmap::DashMap;
use lodestone_script::{
    Callable, Capabilities, ScriptError, ScriptObject, ScriptResult, Value, CAPABILITIES_MEMBER,
};
use std::sync::Arc;
use tracing::trace;

/// Capability-gate handle; clones share the flag cache.
#[derive(Debug, Clone, Default)]
pub struct CapabilityGate {
    // Flag declarations cached by object identity.
    flags: Arc<DashMap<usize, Option<Capabilities>>>,
}

/// The check subject carried through a wrapped value: who originally
/// crossed the gate, with what trust, under which flags.
#[derive(Debug, Clone)]
struct GuardSeed {
    trusted: bool,
    caller: Option<CallerMarker>,
    inherited: Capabilities,
    subject: String,
}

impl CapabilityGate {
    /// Create a gate with an empty flag cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard a value for the given caller.
    ///
    /// `subject` names the module the value was resolved as, for error
    /// reporting.
    pub fn guard(&self, value: Value, subject: &str, ctx: &CallerContext) -> Result<Value> {
        let seed = GuardSeed {
            trusted: ctx.trusted(),
            caller: ctx.current().cloned(),
            inherited: Capabilities::NONE,
            subject: subject.to_string(),
        };
        self.reguard(value, &seed)
    }

    fn reguard(&self, value: Value, seed: &GuardSeed) -> Result<Value> {
        let effective = self.flags_of(&value)?.unwrap_or(seed.inherited);
        if effective.requires_secure_caller() && !seed.trusted {
            return Err(LoaderError::AccessDenied(seed.subject.clone()));
        }

        let next = GuardSeed {
            inherited: effective,
            ..seed.clone()
        };
        match value {
            Value::Object(inner) => Ok(Value::Object(Arc::new(GuardedObject {
                inner,
                gate: self.clone(),
                seed: next,
            }))),
            Value::Function(inner) => Ok(Value::Function(self.wrap_callable(inner, effective, next))),
            other => Ok(other),
        }
    }

    /// The value's own flag declaration, if it makes one.
    fn flags_of(&self, value: &Value) -> Result<Option<Capabilities>> {
        match value {
            Value::Function(func) => {
                let declared = func.requires();
                Ok(if declared.is_empty() {
                    None
                } else {
                    Some(declared)
                })
            }
            Value::Object(obj) => {
                if let Some(cached) = self.flags.get(&obj.id()) {
                    return Ok(*cached);
                }
                let declared = obj
                    .get(CAPABILITIES_MEMBER)
                    .map_err(LoaderError::from_script)?
                    .map(|decl| Capabilities::from_declaration(&decl));
                self.flags.insert(obj.id(), declared);
                Ok(declared)
            }
            _ => Ok(None),
        }
    }

    fn wrap_callable(
        &self,
        inner: Arc<Callable>,
        effective: Capabilities,
        seed: GuardSeed,
    ) -> Arc<Callable> {
        let gate = self.clone();
        let name = inner.name().map(str::to_string);
        Callable::new(name, effective, move |args: &[Value]| -> ScriptResult<Value> {
            if let Some(caller) = &seed.caller {
                trace!(
                    "delegated call on '{}' attributed to caller '{}'",
                    seed.subject,
                    caller.base_id()
                );
            }
            let result = inner.call(args)?;
            gate.reguard(result, &seed).map_err(ScriptError::from)
        })
    }
}

/// Transparent forwarding proxy over an object.
///
/// Preserves the inner object's identity, forwards writes and key
/// listing untouched, and re-guards every member read.
#[derive(Debug)]
struct GuardedObject {
    inner: Arc<dyn ScriptObject>,
    gate: CapabilityGate,
    seed: GuardSeed,
}

impl ScriptObject for GuardedObject {
    fn get(&self, key: &str) -> ScriptResult<Option<Value>> {
        match self.inner.get(key)? {
            None => Ok(None),
            Some(value) => self
                .gate
                .reguard(value, &self.seed)
                .map(Some)
                .map_err(ScriptError::from),
        }
    }

    fn set(&self, key: &str, value: Value) -> ScriptResult<()> {
        self.inner.set(key, value)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn id(&self) -> usize {
        self.inner.id()
    }
}
