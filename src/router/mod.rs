//! # Router
//!
//! The route tree and its single shared API description.
//!
//! ```text
//! Router (root, uri "/")
//!  ├─ use(mw1)
//!  ├─ group("/users", ["users"])          ── mounted child chain
//!  │    ├─ secure(apiKey)
//!  │    └─ route("/:id(\d+)", E, "get")   ── stages: mw1, apiKey, E
//!  └─ serve_spec("/openapi.json")
//!
//!  every node ──writes──▶ Document (paths, components, securitySchemes)
//! ```
//!
//! Registration happens on [`Router`] nodes; [`Router::mount`] turns the root
//! into an [`App`] that serves requests.

mod app;
mod core;

pub use app::App;
pub use core::{IntoMethods, Router};
