//! # Endpoint
//!
//! An [`Endpoint`] declares what a route accepts and returns, and compiles that
//! declaration into a single middleware stage:
//!
//! ```text
//! request ──▶ validate facets ──▶ handler ──▶ normalize ──▶ validate response ──▶ send
//!                │ 400                 │ error            (Outcome)    │ 500
//!                ▼                     ▼                                ▼
//!             error layers ◀───────────┴────────────────────────────────┘
//! ```
//!
//! Exactly one of "send a response" or "forward an error" happens per request.

mod core;
mod outcome;

pub use core::{
    with_default_options, with_handler, Endpoint, EndpointOptions, Facet, HandlerFn,
    RequestSchemas, MEDIA_TYPE_KEY,
};
pub use outcome::{Outcome, Reply};
