// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script object representation.

use crate::error::ScriptResult;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The object interface of the value model.
///
/// Accessors are fallible so that forwarding implementations (proxies)
/// can surface access-control errors from a member read. `id` must be
/// stable for the lifetime of the object and is used for identity
/// comparisons and identity-keyed caches; forwarding implementations
/// report the identity of the object they wrap.
pub trait ScriptObject: std::fmt::Debug + Send + Sync {
    /// Read a member, `Ok(None)` when absent.
    fn get(&self, key: &str) -> ScriptResult<Option<Value>>;

    /// Write a member.
    fn set(&self, key: &str, value: Value) -> ScriptResult<()>;

    /// Member names, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Stable identity of the underlying object.
    fn id(&self) -> usize;
}

/// The standard dictionary-backed object.
#[derive(Debug, Default)]
pub struct DictObject {
    slots: RwLock<HashMap<String, Value>>,
}

impl DictObject {
    /// Create a new empty object.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create an object from an entry list.
    pub fn from_entries<I, K>(entries: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let slots = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<HashMap<_, _>>();
        Arc::new(Self {
            slots: RwLock::new(slots),
        })
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether the object has no members.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl ScriptObject for DictObject {
    fn get(&self, key: &str) -> ScriptResult<Option<Value>> {
        Ok(self.slots.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> ScriptResult<()> {
        self.slots.write().insert(key.to_string(), value);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let obj = DictObject::new();
        assert_eq!(obj.get("a").unwrap(), None);
        obj.set("a", Value::Number(1.0)).unwrap();
        assert_eq!(obj.get("a").unwrap(), Some(Value::Number(1.0)));
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn test_from_entries() {
        let obj = DictObject::from_entries([("x", Value::from("1")), ("y", Value::from("2"))]);
        assert_eq!(obj.get("y").unwrap(), Some(Value::from("2")));
        let mut keys = obj.keys();
        keys.sort();
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_identity_is_stable() {
        let obj = DictObject::new();
        let id = obj.id();
        obj.set("a", Value::Null).unwrap();
        assert_eq!(obj.id(), id);
        assert_ne!(DictObject::new().id(), id);
    }
}
