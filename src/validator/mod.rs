//! # Validator Module
//!
//! Adapter around the `jsonschema` engine with the contract the rest of the crate
//! relies on: `compile(schema, reference document, options)` gives a reusable
//! [`SchemaValidator`]; `validate(&mut data)` coerces and defaults `data` in place,
//! then reports every failure as a [`ValidationIssue`].
//!
//! Validators are compiled once at route registration and shared by every request
//! to that route.

mod compile;
mod issue;

pub use compile::{CompileOptions, SchemaValidator};
pub use issue::ValidationIssue;
