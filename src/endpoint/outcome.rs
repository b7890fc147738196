use serde_json::Value;
use std::sync::Arc;

use crate::server::HeaderVec;

/// Body, status and headers emitted for a handled request.
///
/// Return one from a handler to override the endpoint's default status and
/// headers. Plain values are wrapped with the endpoint defaults instead.
///
/// ```rust
/// use brrtgate::endpoint::Outcome;
/// use serde_json::json;
///
/// let created = Outcome::new(json!({"id": 7}))
///     .with_status(201)
///     .with_header("location", "/pets/7");
/// assert_eq!(created.status, 201);
/// assert_eq!(created.header("Location"), Some("/pets/7"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub body: Value,
    pub status: u16,
    pub headers: HeaderVec,
}

impl Outcome {
    /// Outcome with status 200 and no headers.
    pub fn new(body: Value) -> Self {
        Self {
            body,
            status: 200,
            headers: HeaderVec::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a header; an existing header with the same name is replaced.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What a handler may resolve to: a bare value or an explicit [`Outcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(Value),
    Outcome(Outcome),
}

impl Reply {
    /// Keep an explicit outcome; wrap a bare value with the given defaults.
    pub fn into_outcome(self, default_status: u16, default_headers: &HeaderVec) -> Outcome {
        match self {
            Reply::Outcome(outcome) => outcome,
            Reply::Value(body) => Outcome {
                body,
                status: default_status,
                headers: default_headers.clone(),
            },
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<Outcome> for Reply {
    fn from(outcome: Outcome) -> Self {
        Reply::Outcome(outcome)
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Reply::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Reply::Value(Value::String(value))
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Value(Value::Null)
    }
}
