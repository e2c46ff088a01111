// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # lodestone-script
//!
//! The opaque script-value model shared by the Lodestone module runtime
//! and its host collaborators.
//!
//! The runtime treats module exports as values of an embedded scripting
//! language without committing to any particular engine. This crate
//! defines that boundary:
//!
//! - [`Value`]: the value enum (scalars, arrays, objects, functions)
//! - [`ScriptObject`]: the object interface, with [`DictObject`] as the
//!   standard dictionary-backed implementation
//! - [`Callable`]: a native function wrapper invokable with a value list
//! - [`Capabilities`]: the closed set of capability flags a value may
//!   declare, enforced by the runtime's capability gate
//!
//! Object accessors are fallible so that forwarding proxies (such as the
//! runtime's capability gate) can surface access-control errors from a
//! plain member read.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lodestone_script::{Callable, DictObject, Value};
//!
//! let exports = DictObject::new();
//! exports.set("greet", Value::Function(Callable::named("greet", |_args| {
//!     Ok(Value::String("hello".to_string()))
//! })))?;
//! let value = Value::Object(exports);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod caps;
pub mod error;
pub mod function;
pub mod object;
pub mod value;

// Re-exports for convenience
pub use caps::{Capabilities, CAPABILITIES_MEMBER, SECURE_CALLER_FLAG};
pub use error::{ScriptError, ScriptResult};
pub use function::Callable;
pub use object::{DictObject, ScriptObject};
pub use value::Value;
