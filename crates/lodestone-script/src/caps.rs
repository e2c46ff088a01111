// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Capability flags a value may declare.
//!
//! Flags are a property of the value, not of the registry entry exposing
//! it. Objects declare flags through the well-known
//! [`CAPABILITIES_MEMBER`] member holding an array of flag-name strings;
//! callables declare them at construction. Absence means no restriction.

use crate::value::Value;

/// Well-known object member listing the declared capability flags.
pub const CAPABILITIES_MEMBER: &str = "__capabilities__";

/// Flag name requiring the caller to come from a trusted source.
pub const SECURE_CALLER_FLAG: &str = "secureCaller";

/// The closed set of capability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    secure_caller: bool,
}

impl Capabilities {
    /// No flags declared.
    pub const NONE: Self = Self {
        secure_caller: false,
    };

    /// The "requires secure caller" flag.
    pub fn secure_caller() -> Self {
        Self {
            secure_caller: true,
        }
    }

    /// Whether no flags are set.
    pub fn is_empty(&self) -> bool {
        !self.secure_caller
    }

    /// Whether the "requires secure caller" flag is set.
    pub fn requires_secure_caller(&self) -> bool {
        self.secure_caller
    }

    /// Combine two flag sets.
    pub fn union(self, other: Self) -> Self {
        Self {
            secure_caller: self.secure_caller || other.secure_caller,
        }
    }

    /// Parse a declaration value (an array of flag-name strings).
    ///
    /// Unknown flag names are ignored; the flag set is closed, and a
    /// declaration may only name flags this version knows about.
    pub fn from_declaration(value: &Value) -> Self {
        let mut caps = Self::NONE;
        if let Value::Array(items) = value {
            for item in items {
                if item.as_str() == Some(SECURE_CALLER_FLAG) {
                    caps.secure_caller = true;
                }
            }
        }
        caps
    }

    /// Produce the declaration value for this flag set.
    pub fn declaration(&self) -> Value {
        let mut names = Vec::new();
        if self.secure_caller {
            names.push(Value::from(SECURE_CALLER_FLAG));
        }
        Value::Array(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_round_trip() {
        let caps = Capabilities::secure_caller();
        let decl = caps.declaration();
        assert_eq!(Capabilities::from_declaration(&decl), caps);
    }

    #[test]
    fn test_unknown_flags_ignored() {
        let decl = Value::Array(vec![Value::from("fancyFutureFlag")]);
        assert!(Capabilities::from_declaration(&decl).is_empty());
    }

    #[test]
    fn test_non_array_declaration_is_empty() {
        assert!(Capabilities::from_declaration(&Value::from("secureCaller")).is_empty());
    }

    #[test]
    fn test_union() {
        let merged = Capabilities::NONE.union(Capabilities::secure_caller());
        assert!(merged.requires_secure_caller());
    }
}
