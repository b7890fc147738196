//! # Server Module
//!
//! Request and response values exchanged between the transport and the handler
//! chain. [`Request::from_http`] and [`Response::into_http`] convert at the edges;
//! everything in between works on these types.

pub mod request;
pub mod response;

pub use request::{parse_cookies, parse_query, Request};
pub use response::{status_reason, HeaderVec, Response, MAX_INLINE_HEADERS};
