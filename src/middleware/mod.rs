//! Middleware stages and error-handling layers.
//!
//! Both traits return boxed futures so async and sync implementations share one
//! shape. Use [`from_fn`] and [`error_handler_fn`] for plain closures.

mod core;
mod tracing;

pub use core::{error_handler_fn, from_fn, ErrorHandler, FnErrorHandler, FnMiddleware, Middleware};
pub use tracing::TracingMiddleware;
