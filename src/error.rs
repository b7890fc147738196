//! # Error Model
//!
//! Two families of failure live here:
//!
//! - [`ApiError`] is the structured, serializable failure that reaches clients as
//!   `{code, message, details}`. It travels through the handler chain inside an
//!   `anyhow::Error` and is recognised by the terminal stage with `downcast`.
//! - [`SpecError`] covers registration-time problems (bad schemas, dangling or
//!   cyclic references, unknown methods). These never reach a client; they fail
//!   `Router` setup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::validator::ValidationIssue;

/// Message used by request-validation failures.
pub const REQUEST_NOT_VALID: &str = "request not valid";
/// Message used by response-validation failures.
pub const RESPONSE_NOT_VALID: &str = "response not valid";
/// Message used when an unrecognised error reaches the terminal stage.
pub const INTERNAL_ERROR: &str = "internal error";

/// Structured failure value with an HTTP status code.
///
/// Wire format: `{"code": 400, "message": "request not valid", "details": [...]}`.
///
/// # Example
///
/// ```rust
/// use brrtgate::error::ApiError;
///
/// let err = ApiError::new(409, "pet already exists");
/// assert_eq!(err.code, 409);
/// assert!(err.details.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code sent with the error
    pub code: u16,
    /// Human readable summary
    pub message: String,
    /// Arbitrary payload (validator issues for validation failures)
    #[serde(default)]
    pub details: Value,
}

impl ApiError {
    /// Create an error with no details.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Value::Null,
        }
    }

    /// Attach a details payload.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Override the status code, keeping message and details.
    #[must_use]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Request validation failure: code 400, details = the validator's issue list.
    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        Self::new(400, REQUEST_NOT_VALID).with_details(issues_to_value(issues))
    }

    /// Response validation failure: a server-side contract violation, always 500.
    pub fn response_validation(issues: Vec<ValidationIssue>) -> Self {
        Self::new(500, RESPONSE_NOT_VALID).with_details(issues_to_value(issues))
    }

    /// Generic failure that hides internal detail from the client.
    pub fn internal() -> Self {
        Self::new(500, INTERNAL_ERROR)
    }

    pub fn not_found() -> Self {
        Self::new(404, "not found")
    }

    pub fn unauthorized() -> Self {
        Self::new(401, "unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(403, "forbidden")
    }

    /// Serialize into the wire body.
    #[must_use]
    pub fn to_body(&self) -> Value {
        serde_json::json!({
            "code": self.code,
            "message": self.message,
            "details": self.details,
        })
    }
}

fn issues_to_value(issues: Vec<ValidationIssue>) -> Value {
    serde_json::to_value(issues).unwrap_or(Value::Array(Vec::new()))
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for ApiError {}

/// Registration-time failure raised while building the route tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// A schema could not be compiled by the validation engine
    InvalidSchema {
        /// What was being compiled (e.g. `request`, `response 200`)
        context: String,
        /// Engine message
        message: String,
    },
    /// A `$ref` pointer names a location that does not exist
    UnresolvedReference(String),
    /// A chain of `$ref` pointers loops back on itself
    CyclicReference(String),
    /// An HTTP method name that `http::Method` rejects
    InvalidMethod(String),
    /// A path template that cannot be turned into a matcher
    InvalidPath {
        /// The offending template
        path: String,
        /// Why it was rejected
        reason: String,
    },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::InvalidSchema { context, message } => {
                write!(f, "Invalid {context} schema: {message}")
            }
            SpecError::UnresolvedReference(pointer) => {
                write!(f, "Unresolved schema reference '{pointer}'")
            }
            SpecError::CyclicReference(pointer) => {
                write!(
                    f,
                    "Cyclic schema reference '{pointer}': the pointer chain never reaches a concrete schema"
                )
            }
            SpecError::InvalidMethod(method) => write!(f, "Invalid HTTP method '{method}'"),
            SpecError::InvalidPath { path, reason } => {
                write!(f, "Invalid path template '{path}': {reason}")
            }
        }
    }
}

impl std::error::Error for SpecError {}
