use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::error::ApiError;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for outcomes and responses.
///
/// Header names use `Arc<str>` so the names configured on an endpoint are shared
/// by every response it produces.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Reason phrase for a status code.
pub fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Outgoing response under construction.
///
/// A response is sent at most once: after [`Response::send`] (or
/// [`Response::send_empty`]) the `sent` flag is set and later sends fail. The
/// chain stops running stages once the response is sent.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderVec,
    body: Option<Value>,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: None,
            sent: false,
        }
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    /// Add or replace a header (case-insensitive name match).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Emit `body`. Fails when the response was already sent.
    pub fn send(&mut self, body: Value) -> anyhow::Result<()> {
        self.ensure_unsent()?;
        self.body = Some(body);
        self.sent = true;
        Ok(())
    }

    /// Emit a response with no body (e.g. `304 Not Modified`).
    pub fn send_empty(&mut self) -> anyhow::Result<()> {
        self.ensure_unsent()?;
        self.body = None;
        self.sent = true;
        Ok(())
    }

    /// Emit a structured error as `{code, message, details}`.
    pub fn send_error(&mut self, error: &ApiError) -> anyhow::Result<()> {
        self.set_status(error.code);
        self.set_header("content-type", "application/json");
        self.send(error.to_body())
    }

    fn ensure_unsent(&self) -> anyhow::Result<()> {
        if self.sent {
            anyhow::bail!("response already sent (status {})", self.status);
        }
        Ok(())
    }

    /// Serialize into an `http::Response`.
    ///
    /// String bodies are written raw unless the content type is JSON; every other
    /// body is JSON-encoded. A missing content type is inferred the same way.
    pub fn into_http(self) -> anyhow::Result<http::Response<Vec<u8>>> {
        let content_type = self.header("content-type").map(str::to_ascii_lowercase);
        let is_json = content_type
            .as_deref()
            .map(|ct| ct.starts_with("application/json") || ct.contains("+json"));

        let (bytes, inferred) = match self.body {
            None => (Vec::new(), None),
            Some(Value::String(s)) if is_json != Some(true) => (s.into_bytes(), Some("text/plain")),
            Some(other) => (serde_json::to_vec(&other)?, Some("application/json")),
        };

        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_ref(), value.as_str());
        }
        if content_type.is_none() {
            if let Some(ct) = inferred {
                builder = builder.header("content-type", ct);
            }
        }
        Ok(builder.body(bytes)?)
    }
}
