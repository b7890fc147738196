use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::error::ApiError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};

/// Incoming request as seen by middleware, validators and handlers.
///
/// Every validated facet is a JSON map so validation can coerce and default
/// values in place; a handler reading `req.query["limit"]` after validation sees
/// the integer, not the raw string.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation id (from `x-request-id` or freshly generated)
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Query parameters; repeated keys collapse into arrays
    pub query: Map<String, Value>,
    /// Path parameters captured by the matched route and its mount points
    pub params: Map<String, Value>,
    /// Headers with lower-cased names
    pub headers: Map<String, Value>,
    /// Cookies parsed from the `Cookie` header
    pub cookies: Map<String, Value>,
    /// Cookies whose signature an upstream stage verified
    pub signed_cookies: Map<String, Value>,
    /// Parsed body, absent when the request carried none
    pub body: Option<Value>,
    /// Scratch space for middleware (e.g. the authenticated principal)
    pub locals: Map<String, Value>,
}

impl Request {
    /// Create an empty request for `method` and `path`.
    ///
    /// `path` may carry a query string, which is parsed into [`Request::query`].
    pub fn new(method: Method, path: &str) -> Self {
        let (path_only, query) = match path.split_once('?') {
            Some((p, q)) => (p, parse_query(q)),
            None => (path, Map::new()),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path: if path_only.is_empty() { "/".to_string() } else { path_only.to_string() },
            query,
            params: Map::new(),
            headers: Map::new(),
            cookies: Map::new(),
            signed_cookies: Map::new(),
            body: None,
            locals: Map::new(),
        }
    }

    /// Builder-style header insert; also refreshes cookies when `name` is `cookie`.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name == "cookie" {
            self.cookies.extend(parse_cookies(value));
        }
        if name == REQUEST_ID_HEADER {
            self.request_id = RequestId::from_header_or_new(Some(value));
        }
        self.headers.insert(name, Value::String(value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(Value::as_str)
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Build a request from an `http::Request` with a buffered body.
    ///
    /// JSON bodies (`application/json` or `+json`) are parsed and rejected with a
    /// 400 [`ApiError`] when malformed; form bodies become objects; any other
    /// non-empty body is kept as a UTF-8 string.
    pub fn from_http(req: http::Request<Vec<u8>>) -> Result<Self, ApiError> {
        let (parts, bytes) = req.into_parts();
        let raw_path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let mut request = Request::new(parts.method, &raw_path);
        for (name, value) in &parts.headers {
            let Ok(value) = value.to_str() else {
                continue;
            };
            request = request.with_header(name.as_str(), value);
        }

        debug!(
            request_id = %request.request_id,
            header_count = request.headers.len(),
            cookie_count = request.cookies.len(),
            query_count = request.query.len(),
            "Headers, cookies and query extracted"
        );

        if !bytes.is_empty() {
            let content_type = request.header("content-type").unwrap_or("").to_ascii_lowercase();
            request.body = Some(parse_body(&content_type, &bytes)?);
        }
        Ok(request)
    }
}

fn parse_body(content_type: &str, bytes: &[u8]) -> Result<Value, ApiError> {
    let media_type = content_type.split(';').next().unwrap_or("").trim();
    if media_type == "application/json" || media_type.ends_with("+json") {
        return serde_json::from_slice(bytes).map_err(|e| {
            ApiError::new(400, "malformed JSON body")
                .with_details(Value::String(e.to_string()))
        });
    }
    if media_type == "application/x-www-form-urlencoded" {
        return Ok(Value::Object(parse_query(&String::from_utf8_lossy(bytes))));
    }
    Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Parse a `Cookie` header value into name/value pairs.
pub fn parse_cookies(header: &str) -> Map<String, Value> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().trim_matches('"');
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((name.to_string(), Value::String(value)))
        })
        .collect()
}

/// Parse a query string (without the leading `?`).
///
/// A key that appears more than once becomes an array of its values, in order.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        let k = k.into_owned();
        if !grouped.contains_key(&k) {
            order.push(k.clone());
        }
        grouped.entry(k).or_default().push(v.into_owned());
    }

    order
        .into_iter()
        .filter_map(|k| {
            let mut values = grouped.remove(&k)?;
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            Some((k, value))
        })
        .collect()
}
