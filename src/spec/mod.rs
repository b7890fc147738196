//! # API Description
//!
//! The shared [`Document`] every router node writes into, and the pure helpers
//! used to fill it:
//!
//! - [`uri`]: `join_uri` and `:name(regex)` template parsing
//! - [`refs`]: `$ref` pointer resolution with cycle detection
//! - [`build`]: operation synthesis (tags, parameters, request body, responses, security)
//! - [`metadata`]: package metadata for `info`
//! - [`serve`]: the conditional-GET stage serving the document

pub mod build;
mod document;
pub mod metadata;
pub mod refs;
pub mod serve;
mod types;
pub mod uri;

pub use build::{build_operation, merge_tags, OperationContext, NO_SCHEMA_DESCRIPTION};
pub use document::{Document, OPENAPI_VERSION};
pub use metadata::{parse_author, Author, InfoSource, PackageMetadata};
pub use refs::{reference, schema_ref, unfold};
pub use serve::{SpecServer, SPEC_CACHE_CONTROL};
pub use types::{ParameterDescriptor, ParameterLocation};
pub use uri::{join_uri, parse_path_template, PathPlaceholder, PathTemplate, Segment};
