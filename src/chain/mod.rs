//! The mountable handler chain.
//!
//! A small routing primitive: route layers keyed by method and `:name(regex)`
//! template, prefix-mounted child chains, and error-handling layers, dispatched
//! in registration order with a "pass the error to the next stage" convention.
//! [`crate::router::Router`] accumulates into one of these per node.

mod core;
mod matcher;

pub use core::HandlerChain;
pub use matcher::{PathMatch, PathMatcher};
