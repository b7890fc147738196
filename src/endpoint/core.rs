use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::outcome::Reply;
use crate::error::{ApiError, SpecError};
use crate::middleware::Middleware;
use crate::server::{HeaderVec, Request, Response};
use crate::spec::refs;
use crate::validator::{CompileOptions, SchemaValidator};

/// Schema key carrying a non-default media type for a body or response schema.
pub const MEDIA_TYPE_KEY: &str = "x-media-type";

/// Type-erased async request handler.
pub type HandlerFn =
    Arc<dyn Fn(Request) -> BoxFuture<'static, anyhow::Result<Reply>> + Send + Sync>;

/// One validated part of an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Query,
    Params,
    Headers,
    Cookies,
    SignedCookies,
    Body,
}

impl Facet {
    /// Every facet, in composite-schema order.
    pub const ALL: [Facet; 6] = [
        Facet::Query,
        Facet::Params,
        Facet::Headers,
        Facet::Cookies,
        Facet::SignedCookies,
        Facet::Body,
    ];

    /// Property name of this facet in the composite request schema.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Facet::Query => "query",
            Facet::Params => "params",
            Facet::Headers => "headers",
            Facet::Cookies => "cookies",
            Facet::SignedCookies => "signedCookies",
            Facet::Body => "body",
        }
    }
}

/// Fixed slots for the request-side schemas of an endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSchemas {
    pub query: Option<Value>,
    pub params: Option<Value>,
    pub headers: Option<Value>,
    pub cookies: Option<Value>,
    pub signed_cookies: Option<Value>,
    pub body: Option<Value>,
}

impl RequestSchemas {
    #[must_use]
    pub fn get(&self, facet: Facet) -> Option<&Value> {
        self.slot(facet).as_ref().filter(|v| !v.is_null())
    }

    fn slot(&self, facet: Facet) -> &Option<Value> {
        match facet {
            Facet::Query => &self.query,
            Facet::Params => &self.params,
            Facet::Headers => &self.headers,
            Facet::Cookies => &self.cookies,
            Facet::SignedCookies => &self.signed_cookies,
            Facet::Body => &self.body,
        }
    }

    fn slot_mut(&mut self, facet: Facet) -> &mut Option<Value> {
        match facet {
            Facet::Query => &mut self.query,
            Facet::Params => &mut self.params,
            Facet::Headers => &mut self.headers,
            Facet::Cookies => &mut self.cookies,
            Facet::SignedCookies => &mut self.signed_cookies,
            Facet::Body => &mut self.body,
        }
    }
}

/// Per-endpoint switches and response defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointOptions {
    /// Validate the request facets before the handler runs
    pub validate_request: bool,
    /// Validate handler results against the declared response schemas
    pub validate_response: bool,
    /// Status used when the handler returns a bare value
    pub default_status: u16,
    /// Content type for bodies and responses without their own media type
    pub default_media_type: String,
    /// Headers used when the handler returns a bare value
    pub default_headers: HeaderVec,
    /// Whether a declared body schema makes the body mandatory
    pub body_required: bool,
    /// Which facets take part in request validation
    pub facets: Vec<Facet>,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            validate_request: true,
            validate_response: true,
            default_status: 200,
            default_media_type: "application/json".to_string(),
            default_headers: HeaderVec::new(),
            body_required: true,
            facets: Facet::ALL.to_vec(),
        }
    }
}

impl EndpointOptions {
    /// Builder-style default header.
    #[must_use]
    pub fn with_default_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.default_headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.default_headers.push((Arc::from(name), value.into()));
        self
    }
}

/// The unit of request handling.
///
/// An endpoint is plain configuration: optional schemas for each request facet,
/// a schema per documented response code, a partial operation record, options,
/// and the handler. [`Endpoint::create_middleware`] compiles it into the stage
/// that runs validate → handle → validate → respond for every request.
///
/// # Example
///
/// ```rust
/// use brrtgate::endpoint::{Endpoint, Outcome};
/// use serde_json::json;
///
/// let get_pet = Endpoint::new()
///     .with_params_schema(Endpoint::object_schema(
///         json!({"id": {"type": "integer"}}),
///         None,
///     ))
///     .with_response("200", json!({"type": "object"}))
///     .handler(|req| async move {
///         let id = req.params["id"].clone();
///         Ok(Outcome::new(json!({"id": id})))
///     });
/// assert!(get_pet.has_handler());
/// ```
#[derive(Clone, Default)]
pub struct Endpoint {
    options: EndpointOptions,
    request: RequestSchemas,
    responses: Map<String, Value>,
    response_headers: Map<String, Value>,
    operation: Map<String, Value>,
    handler: Option<HandlerFn>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("options", &self.options)
            .field("request", &self.request)
            .field("responses", &self.responses)
            .field("response_headers", &self.response_headers)
            .field("operation", &self.operation)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl Endpoint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---- request schemas -------------------------------------------------

    #[must_use]
    pub fn with_schema(mut self, facet: Facet, schema: Value) -> Self {
        *self.request.slot_mut(facet) = Some(schema);
        self
    }

    #[must_use]
    pub fn with_query_schema(self, schema: Value) -> Self {
        self.with_schema(Facet::Query, schema)
    }

    #[must_use]
    pub fn with_params_schema(self, schema: Value) -> Self {
        self.with_schema(Facet::Params, schema)
    }

    #[must_use]
    pub fn with_headers_schema(self, schema: Value) -> Self {
        self.with_schema(Facet::Headers, schema)
    }

    #[must_use]
    pub fn with_cookies_schema(self, schema: Value) -> Self {
        self.with_schema(Facet::Cookies, schema)
    }

    #[must_use]
    pub fn with_signed_cookies_schema(self, schema: Value) -> Self {
        self.with_schema(Facet::SignedCookies, schema)
    }

    #[must_use]
    pub fn with_body_schema(self, schema: Value) -> Self {
        self.with_schema(Facet::Body, schema)
    }

    #[must_use]
    pub fn schema(&self, facet: Facet) -> Option<&Value> {
        self.request.get(facet)
    }

    #[must_use]
    pub fn query_schema(&self) -> Option<&Value> {
        self.schema(Facet::Query)
    }

    #[must_use]
    pub fn params_schema(&self) -> Option<&Value> {
        self.schema(Facet::Params)
    }

    #[must_use]
    pub fn headers_schema(&self) -> Option<&Value> {
        self.schema(Facet::Headers)
    }

    #[must_use]
    pub fn cookies_schema(&self) -> Option<&Value> {
        self.schema(Facet::Cookies)
    }

    #[must_use]
    pub fn signed_cookies_schema(&self) -> Option<&Value> {
        self.schema(Facet::SignedCookies)
    }

    #[must_use]
    pub fn body_schema(&self) -> Option<&Value> {
        self.schema(Facet::Body)
    }

    // ---- responses -------------------------------------------------------

    /// Declare the schema for a response status code (e.g. `"200"`).
    #[must_use]
    pub fn with_response(mut self, code: impl ToString, schema: Value) -> Self {
        self.responses.insert(code.to_string(), schema);
        self
    }

    /// Declare OpenAPI response headers for a status code.
    #[must_use]
    pub fn with_response_headers(mut self, code: impl ToString, headers: Value) -> Self {
        self.response_headers.insert(code.to_string(), headers);
        self
    }

    /// Status code → schema, or `None` when no response schema was declared.
    #[must_use]
    pub fn response_code_schemas(&self) -> Option<&Map<String, Value>> {
        (!self.responses.is_empty()).then_some(&self.responses)
    }

    #[must_use]
    pub fn response_headers(&self, code: &str) -> Option<&Value> {
        self.response_headers.get(code)
    }

    // ---- operation -------------------------------------------------------

    /// Merge fields into the partial operation record (summary, tags, parameters…).
    #[must_use]
    pub fn with_operation(mut self, operation: Value) -> Self {
        if let Value::Object(fields) = operation {
            self.operation.extend(fields);
        }
        self
    }

    #[must_use]
    pub fn operation(&self) -> &Map<String, Value> {
        &self.operation
    }

    /// Tags declared through the operation record.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.operation
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---- options & handler -----------------------------------------------

    #[must_use]
    pub fn with_options(mut self, options: EndpointOptions) -> Self {
        self.options = options;
        self
    }

    /// Adjust options in place.
    #[must_use]
    pub fn configure(mut self, f: impl FnOnce(&mut EndpointOptions)) -> Self {
        f(&mut self.options);
        self
    }

    #[must_use]
    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    /// Set the request handler.
    ///
    /// The handler receives the validated request (coerced and defaulted) and
    /// resolves to a bare value or an [`Outcome`](super::Outcome). Errors are
    /// forwarded unchanged to the error-handling layers.
    #[must_use]
    pub fn handler<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<Reply> + 'static,
    {
        self.handler = Some(Arc::new(move |req| {
            let fut = f(req);
            Box::pin(async move { fut.await.map(Into::into) })
        }));
        self
    }

    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    // ---- helpers ---------------------------------------------------------

    /// Object schema over `properties`; `required` defaults to every property.
    ///
    /// ```rust
    /// use brrtgate::endpoint::Endpoint;
    /// use serde_json::json;
    ///
    /// let s = Endpoint::object_schema(json!({"a": {}, "b": {}}), Some(&["b"]));
    /// assert_eq!(s["required"], json!(["b"]));
    /// let s = Endpoint::object_schema(json!({"a": {}, "b": {}}), None);
    /// assert_eq!(s["required"], json!(["a", "b"]));
    /// ```
    #[must_use]
    pub fn object_schema(properties: Value, required: Option<&[&str]>) -> Value {
        let required: Vec<Value> = match required {
            Some(names) => names.iter().map(|n| Value::from(*n)).collect(),
            None => properties
                .as_object()
                .map(|p| p.keys().map(|k| Value::String(k.clone())).collect())
                .unwrap_or_default(),
        };
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Pointer into the caller-supplied reference document.
    #[must_use]
    pub fn reference(path: &str) -> Value {
        refs::reference(path)
    }

    /// Facets that take part in request validation.
    fn validated_facets(&self) -> Vec<Facet> {
        if !self.options.validate_request {
            return Vec::new();
        }
        self.options
            .facets
            .iter()
            .copied()
            .filter(|f| self.request.get(*f).is_some())
            .collect()
    }

    /// Whether requests to this endpoint are validated at all.
    #[must_use]
    pub fn validates_request(&self) -> bool {
        !self.validated_facets().is_empty()
    }

    /// Composite request schema: one property per validated facet.
    #[must_use]
    pub fn request_schema(&self) -> Option<Value> {
        let facets = self.validated_facets();
        if facets.is_empty() {
            return None;
        }
        let mut properties = Map::new();
        let mut required = Vec::new();
        for facet in facets {
            if let Some(schema) = self.request.get(facet) {
                properties.insert(facet.key().to_string(), schema.clone());
                if facet != Facet::Body || self.options.body_required {
                    required.push(Value::from(facet.key()));
                }
            }
        }
        Some(serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }))
    }

    /// Media type for a response code: the schema's own, else the default.
    #[must_use]
    pub fn media_type_for(&self, code: &str) -> &str {
        self.responses
            .get(code)
            .and_then(|s| s.get(MEDIA_TYPE_KEY))
            .and_then(Value::as_str)
            .unwrap_or(self.options.default_media_type.as_str())
    }

    /// Compile the validators and produce the request-handling stage.
    ///
    /// `components` is the reference document the schemas are compiled against
    /// (the API description's `components`).
    pub fn create_middleware(
        &self,
        components: &Value,
        engine: CompileOptions,
    ) -> Result<Arc<dyn Middleware>, SpecError> {
        let facets = self.validated_facets();
        let request_validator = match self.request_schema() {
            Some(schema) => Some(SchemaValidator::compile(&schema, components, engine, "request")?),
            None => None,
        };

        let mut response_validators = HashMap::new();
        let mut media_types = HashMap::new();
        for (code, schema) in &self.responses {
            media_types.insert(code.clone(), self.media_type_for(code).to_string());
            if self.options.validate_response {
                let context = format!("response {code}");
                let validator = SchemaValidator::compile(schema, components, engine, &context)?;
                response_validators.insert(code.clone(), validator);
            }
        }

        debug!(
            facets = ?facets,
            request_validation = request_validator.is_some(),
            response_validators = response_validators.len(),
            "Endpoint middleware created"
        );

        Ok(Arc::new(EndpointMiddleware {
            facets,
            request_validator,
            response_validators,
            media_types,
            default_status: self.options.default_status,
            default_headers: self.options.default_headers.clone(),
            default_media_type: self.options.default_media_type.clone(),
            handler: self.handler.clone(),
        }))
    }
}

/// Copy of `base` with adjusted default options.
#[must_use]
pub fn with_default_options(base: &Endpoint, f: impl FnOnce(&mut EndpointOptions)) -> Endpoint {
    base.clone().configure(f)
}

/// Copy of `base` that delegates to `f`.
#[must_use]
pub fn with_handler<F, Fut, R>(base: &Endpoint, f: F) -> Endpoint
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    base.clone().handler(f)
}

struct EndpointMiddleware {
    facets: Vec<Facet>,
    request_validator: Option<SchemaValidator>,
    response_validators: HashMap<String, SchemaValidator>,
    media_types: HashMap<String, String>,
    default_status: u16,
    default_headers: HeaderVec,
    default_media_type: String,
    handler: Option<HandlerFn>,
}

impl EndpointMiddleware {
    fn validate_request(&self, req: &mut Request) -> anyhow::Result<()> {
        let Some(validator) = &self.request_validator else {
            return Ok(());
        };

        let mut data = Map::new();
        for facet in &self.facets {
            let value = match facet {
                Facet::Query => Some(Value::Object(req.query.clone())),
                Facet::Params => Some(Value::Object(req.params.clone())),
                Facet::Headers => Some(Value::Object(req.headers.clone())),
                Facet::Cookies => Some(Value::Object(req.cookies.clone())),
                Facet::SignedCookies => Some(Value::Object(req.signed_cookies.clone())),
                Facet::Body => req.body.clone(),
            };
            if let Some(value) = value {
                data.insert(facet.key().to_string(), value);
            }
        }

        let mut data = Value::Object(data);
        if let Err(issues) = validator.validate(&mut data) {
            warn!(
                method = %req.method,
                path = %req.path,
                issue_count = issues.len(),
                first_issue = %issues.first().map(|i| i.message.as_str()).unwrap_or(""),
                "Request validation failed"
            );
            return Err(ApiError::validation(issues).into());
        }

        // write coerced and defaulted values back onto the live request
        let Value::Object(mut data) = data else {
            return Ok(());
        };
        for facet in &self.facets {
            let Some(value) = data.remove(facet.key()) else {
                continue;
            };
            match (facet, value) {
                (Facet::Body, value) => req.body = Some(value),
                (Facet::Query, Value::Object(m)) => req.query = m,
                (Facet::Params, Value::Object(m)) => req.params = m,
                (Facet::Headers, Value::Object(m)) => req.headers = m,
                (Facet::Cookies, Value::Object(m)) => req.cookies = m,
                (Facet::SignedCookies, Value::Object(m)) => req.signed_cookies = m,
                _ => {}
            }
        }
        debug!(path = %req.path, "Request validated");
        Ok(())
    }
}

impl Middleware for EndpointMiddleware {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.validate_request(req)?;

            let handler = self
                .handler
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("handler not implemented for {} {}", req.method, req.path))?;
            let reply = handler(req.clone()).await?;
            let mut outcome = reply.into_outcome(self.default_status, &self.default_headers);

            let code = outcome.status.to_string();
            if let Some(validator) = self.response_validators.get(&code) {
                if let Err(issues) = validator.validate(&mut outcome.body) {
                    error!(
                        method = %req.method,
                        path = %req.path,
                        status = outcome.status,
                        issue_count = issues.len(),
                        "Response validation failed"
                    );
                    return Err(ApiError::response_validation(issues).into());
                }
            }

            for (name, value) in &outcome.headers {
                res.set_header(name, value.clone());
            }
            if res.header("content-type").is_none() {
                let media_type = self
                    .media_types
                    .get(&code)
                    .unwrap_or(&self.default_media_type);
                res.set_header("content-type", media_type.clone());
            }
            res.set_status(outcome.status);
            res.send(outcome.body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Outcome;
    use http::Method;
    use serde_json::json;

    async fn call(endpoint: &Endpoint, mut req: Request) -> (Response, anyhow::Result<()>) {
        let mw = endpoint
            .create_middleware(&json!({}), CompileOptions::default())
            .unwrap();
        let mut res = Response::new();
        let result = mw.handle(&mut req, &mut res).await;
        (res, result)
    }

    fn api_code(result: &anyhow::Result<()>) -> Option<u16> {
        result
            .as_ref()
            .err()
            .and_then(|e| e.downcast_ref::<ApiError>())
            .map(|e| e.code)
    }

    #[test]
    fn test_composite_schema_lists_declared_facets() {
        let e = Endpoint::new()
            .with_query_schema(json!({"type": "object"}))
            .with_body_schema(json!({"type": "object"}));
        let schema = e.request_schema().unwrap();
        assert_eq!(schema["required"], json!(["query", "body"]));
        assert!(schema["properties"].get("params").is_none());

        let optional_body = e.configure(|o| o.body_required = false);
        assert_eq!(optional_body.request_schema().unwrap()["required"], json!(["query"]));
    }

    #[test]
    fn test_disabled_facets_are_not_validated() {
        let e = Endpoint::new()
            .with_headers_schema(json!({"type": "object"}))
            .configure(|o| o.facets = vec![Facet::Query]);
        assert!(e.request_schema().is_none());
        assert!(!e.validates_request());
    }

    #[tokio::test]
    async fn test_no_schema_reaches_handler_unmodified() {
        let e = Endpoint::new().handler(|req| async move { Ok(Value::Object(req.query)) });
        let (res, result) = call(&e, Request::new(Method::GET, "/?n=1")).await;
        assert!(result.is_ok());
        assert_eq!(res.body(), Some(&json!({"n": "1"})));
        assert_eq!(res.status(), 200);
        assert_eq!(res.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_handler() {
        let e = Endpoint::new()
            .with_query_schema(Endpoint::object_schema(json!({"n": {"type": "integer"}}), None))
            .handler(|_req| async move { Err::<Value, anyhow::Error>(anyhow::anyhow!("handler must not run")) });
        let (res, result) = call(&e, Request::new(Method::GET, "/?n=abc")).await;
        assert_eq!(api_code(&result), Some(400));
        assert!(!res.is_sent());
    }

    #[tokio::test]
    async fn test_handler_sees_coerced_values() {
        let e = Endpoint::new()
            .with_query_schema(Endpoint::object_schema(
                json!({"n": {"type": "integer"}, "page": {"type": "integer", "default": 1}}),
                Some(&["n"]),
            ))
            .handler(|req| async move { Ok(Value::Object(req.query)) });
        let (res, result) = call(&e, Request::new(Method::GET, "/?n=5")).await;
        assert!(result.is_ok());
        assert_eq!(res.body(), Some(&json!({"n": 5, "page": 1})));
    }

    #[tokio::test]
    async fn test_explicit_outcome_overrides_defaults() {
        let e = Endpoint::new()
            .configure(|o| {
                o.default_status = 202;
                o.default_headers.push((Arc::from("x-default"), "yes".into()));
            })
            .handler(|_req| async move {
                Ok(Outcome::new(json!("made")).with_status(201).with_header("x-id", "9"))
            });
        let (res, _) = call(&e, Request::new(Method::POST, "/")).await;
        assert_eq!(res.status(), 201);
        assert_eq!(res.header("x-id"), Some("9"));
        assert_eq!(res.header("x-default"), None);
    }

    #[tokio::test]
    async fn test_bare_value_uses_default_status_and_headers() {
        let e = Endpoint::new()
            .configure(|o| {
                o.default_status = 202;
                o.default_headers.push((Arc::from("x-default"), "yes".into()));
            })
            .handler(|_req| async move { Ok("queued") });
        let (res, _) = call(&e, Request::new(Method::POST, "/")).await;
        assert_eq!(res.status(), 202);
        assert_eq!(res.header("x-default"), Some("yes"));
        assert_eq!(res.body(), Some(&json!("queued")));
    }

    #[tokio::test]
    async fn test_response_validation_failure_is_500() {
        let base = Endpoint::new().with_response("200", json!({"type": "string", "const": "ok"}));
        let ok = with_handler(&base, |_req| async move { Ok("ok") });
        let (res, result) = call(&ok, Request::new(Method::GET, "/")).await;
        assert!(result.is_ok());
        assert_eq!(res.body(), Some(&json!("ok")));

        let no = with_handler(&base, |_req| async move { Ok("no") });
        let (res, result) = call(&no, Request::new(Method::GET, "/")).await;
        assert_eq!(api_code(&result), Some(500));
        assert!(!res.is_sent());

        let unchecked = with_default_options(&no, |o| o.validate_response = false);
        let (res, result) = call(&unchecked, Request::new(Method::GET, "/")).await;
        assert!(result.is_ok());
        assert_eq!(res.body(), Some(&json!("no")));
    }

    #[tokio::test]
    async fn test_missing_handler_is_not_structured() {
        let (_, result) = call(&Endpoint::new(), Request::new(Method::GET, "/")).await;
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<ApiError>().is_none());
        assert!(err.to_string().contains("not implemented"));
    }

    #[tokio::test]
    async fn test_handler_error_forwarded_verbatim() {
        let e = Endpoint::new()
            .handler(|_req| async move { Err::<Value, anyhow::Error>(ApiError::new(409, "conflict").into()) });
        let (_, result) = call(&e, Request::new(Method::GET, "/")).await;
        let err = result.unwrap_err();
        assert_eq!(err.downcast_ref::<ApiError>(), Some(&ApiError::new(409, "conflict")));
    }

    #[tokio::test]
    async fn test_response_media_type() {
        let e = Endpoint::new()
            .with_response("200", json!({"type": "string", "x-media-type": "text/plain"}))
            .handler(|_req| async move { Ok("hi") });
        let (res, _) = call(&e, Request::new(Method::GET, "/")).await;
        assert_eq!(res.header("content-type"), Some("text/plain"));
    }
}
