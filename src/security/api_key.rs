use serde_json::{json, Value};
use std::collections::HashSet;

use super::SecurityProvider;
use crate::error::ApiError;
use crate::server::Request;

/// Where an API key is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

impl ApiKeyLocation {
    fn as_str(self) -> &'static str {
        match self {
            ApiKeyLocation::Header => "header",
            ApiKeyLocation::Query => "query",
            ApiKeyLocation::Cookie => "cookie",
        }
    }
}

/// Static API keys read from a header, query parameter or cookie.
///
/// Scopes are not meaningful for API keys and are ignored.
#[derive(Debug, Clone)]
pub struct ApiKeyProvider {
    name: String,
    location: ApiKeyLocation,
    keys: HashSet<String>,
}

impl ApiKeyProvider {
    pub fn new(name: impl Into<String>, location: ApiKeyLocation) -> Self {
        let name = name.into();
        Self {
            // request headers are stored lower-cased
            name: if location == ApiKeyLocation::Header {
                name.to_ascii_lowercase()
            } else {
                name
            },
            location,
            keys: HashSet::new(),
        }
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, ApiKeyLocation::Header)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, ApiKeyLocation::Query)
    }

    pub fn cookie(name: impl Into<String>) -> Self {
        Self::new(name, ApiKeyLocation::Cookie)
    }

    /// Accept `key`.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    fn extract<'r>(&self, req: &'r Request) -> Option<&'r str> {
        match self.location {
            ApiKeyLocation::Header => req.header(&self.name),
            ApiKeyLocation::Query => req.query_param(&self.name).and_then(Value::as_str),
            ApiKeyLocation::Cookie => req.cookie(&self.name),
        }
    }
}

impl SecurityProvider for ApiKeyProvider {
    fn validate(&self, _scopes: &[String], req: &Request) -> Result<Option<Value>, ApiError> {
        match self.extract(req) {
            Some(key) if self.keys.contains(key) => Ok(None),
            _ => Err(ApiError::unauthorized()),
        }
    }

    fn scheme_definition(&self) -> Value {
        json!({"type": "apiKey", "name": self.name, "in": self.location.as_str()})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_header_key() {
        let p = ApiKeyProvider::header("X-Api-Key").key("k1");
        let ok = Request::new(Method::GET, "/").with_header("x-api-key", "k1");
        let bad = Request::new(Method::GET, "/").with_header("x-api-key", "k2");
        assert!(p.validate(&[], &ok).is_ok());
        assert_eq!(p.validate(&[], &bad).unwrap_err().code, 401);
        assert_eq!(p.validate(&[], &Request::new(Method::GET, "/")).unwrap_err().code, 401);
    }

    #[test]
    fn test_query_and_cookie_keys() {
        let q = ApiKeyProvider::query("api_key").key("k");
        assert!(q.validate(&[], &Request::new(Method::GET, "/?api_key=k")).is_ok());

        let c = ApiKeyProvider::cookie("sid").key("k");
        let req = Request::new(Method::GET, "/").with_header("cookie", "sid=k");
        assert!(c.validate(&[], &req).is_ok());
        assert_eq!(c.scheme_definition(), json!({"type": "apiKey", "name": "sid", "in": "cookie"}));
    }
}
