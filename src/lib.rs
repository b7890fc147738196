//! # brrtgate
//!
//! **brrtgate** puts JSON Schema validation in front of HTTP handlers and assembles an
//! [OpenAPI 3.1.0](https://spec.openapis.org/oas/v3.1.0) document from the routes as they
//! are registered. The document is never written by hand: every [`Endpoint`] carries the
//! schemas it validates with, and every [`Router`] node writes the operations it mounts.
//!
//! ## Overview
//!
//! - An [`Endpoint`] declares per-facet request schemas (query, params, headers, cookies,
//!   signed cookies, body), per-status response schemas and a handler. Compiled into a
//!   middleware stage it validates the request, runs the handler, validates the result and
//!   sends it.
//! - A [`Router`] is a node in a route tree. Nodes nest with [`Router::group`], share one
//!   [`Document`], and accumulate tags, middleware and security down the tree.
//! - [`Router::mount`] produces an [`App`] that dispatches requests and turns every error
//!   into a structured `{code, message, details}` response.
//!
//! ## Architecture
//!
//! - **[`endpoint`]** - Endpoint declaration, options, handler results ([`Outcome`])
//! - **[`router`]** - Route tree, document registration and the mounted [`App`]
//! - **[`chain`]** - Ordered route/mount/catch layers and path matching
//! - **[`spec`]** - Document assembly, reference helpers, path templates, spec serving
//! - **[`validator`]** - Schema compilation with coercion and defaults
//! - **[`security`]** - Security providers (API key, bearer token, basic)
//! - **[`middleware`]** - Middleware and error-handler traits, tracing middleware
//! - **[`server`]** - Request and response values
//! - **[`config`]** / **[`logging`]** - YAML/env configuration and `tracing` setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant App
//!     participant Chain as HandlerChain
//!     participant MW as Node middleware
//!     participant EP as Endpoint stage
//!     participant Handler
//!     participant Term as Terminal error handler
//!
//!     Client->>App: http::Request
//!     App->>Chain: dispatch(path)
//!     Chain->>MW: handle(req, res)
//!     MW-->>Chain: Ok / Err(ApiError)
//!     Chain->>EP: handle(req, res)
//!     EP->>EP: validate request (coerce, defaults)
//!     EP->>Handler: handler(req)
//!     Handler-->>EP: Reply
//!     EP->>EP: validate response for status
//!     EP-->>Chain: sent
//!     Chain->>Term: pending error
//!     Term-->>Client: {code, message, details}
//!     App-->>Client: http::Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtgate::{Endpoint, Router};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut root = Router::new(json!({"title": "Users", "version": "1.0.0"}));
//! root.group("/users", &["users"], |users| {
//!     users.get(
//!         "/:id(\\d+)",
//!         Endpoint::new()
//!             .with_params_schema(json!({
//!                 "type": "object",
//!                 "properties": {"id": {"type": "integer"}},
//!                 "required": ["id"]
//!             }))
//!             .with_response("200", json!({"type": "object"}))
//!             .handler(|req| async move { Ok(json!({"id": req.params["id"]})) }),
//!     )?;
//!     Ok(())
//! })?;
//! root.serve_spec("/openapi.json")?;
//!
//! let app = root.mount(Vec::new());
//! let doc = app.document().snapshot();
//! assert!(doc["paths"]["/users/{id}"]["get"].is_object());
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;
pub mod spec;
pub mod validator;

pub use config::GateConfig;
pub use endpoint::{Endpoint, EndpointOptions, Outcome};
pub use error::{ApiError, SpecError};
pub use middleware::{ErrorHandler, Middleware};
pub use router::{App, Router};
pub use server::{Request, Response};
pub use spec::{reference, schema_ref, unfold, Document, InfoSource, PackageMetadata};
pub use validator::ValidationIssue;
