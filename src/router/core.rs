use http::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::app::App;
use crate::chain::HandlerChain;
use crate::config::{GateConfig, ValidationConfig};
use crate::endpoint::Endpoint;
use crate::error::SpecError;
use crate::middleware::{ErrorHandler, Middleware};
use crate::security::{SecurityMiddleware, SecurityProvider};
use crate::spec::{
    build_operation, join_uri, merge_tags, parse_path_template, Document, InfoSource,
    OperationContext, SpecServer,
};

/// One or several HTTP methods for [`Router::route`].
pub trait IntoMethods {
    fn into_methods(self) -> Result<Vec<Method>, SpecError>;
}

fn parse_method(name: &str) -> Result<Method, SpecError> {
    let upper = name.trim().to_ascii_uppercase();
    match upper.as_str() {
        "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS" | "TRACE" => {
            Method::from_bytes(upper.as_bytes()).map_err(|_| SpecError::InvalidMethod(name.to_string()))
        }
        _ => Err(SpecError::InvalidMethod(name.to_string())),
    }
}

impl IntoMethods for Method {
    fn into_methods(self) -> Result<Vec<Method>, SpecError> {
        Ok(vec![self])
    }
}

impl IntoMethods for &str {
    fn into_methods(self) -> Result<Vec<Method>, SpecError> {
        Ok(vec![parse_method(self)?])
    }
}

impl IntoMethods for &[&str] {
    fn into_methods(self) -> Result<Vec<Method>, SpecError> {
        self.iter().map(|m| parse_method(m)).collect()
    }
}

impl<const N: usize> IntoMethods for [&str; N] {
    fn into_methods(self) -> Result<Vec<Method>, SpecError> {
        self.iter().map(|m| parse_method(m)).collect()
    }
}

impl IntoMethods for Vec<&str> {
    fn into_methods(self) -> Result<Vec<Method>, SpecError> {
        self.iter().map(|m| parse_method(m)).collect()
    }
}

/// A node in the route tree.
///
/// Every node shares one [`Document`] with its ancestors and descendants and
/// keeps its own incremental view: the absolute URI prefix, the accumulated
/// tags, the middleware chain and the active security requirement. Groups are
/// snapshots: middleware added to a node after a group was created does not
/// reach that group.
///
/// # Example
///
/// ```rust
/// use brrtgate::endpoint::Endpoint;
/// use brrtgate::router::Router;
/// use serde_json::json;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut root = Router::new(json!({"title": "Pets", "version": "1.0.0"}));
/// root.group("/pets", &["pets"], |pets| {
///     pets.get("/:id(\\d+)", Endpoint::new().handler(|req| async move {
///         Ok(json!({"id": req.params["id"]}))
///     }))?;
///     Ok(())
/// })?;
/// root.serve_spec("/openapi.json")?;
///
/// let doc = root.get_spec().snapshot();
/// assert_eq!(doc["paths"]["/pets/{id}"]["get"]["tags"], json!(["pets"]));
/// let _app = root.mount(Vec::new());
/// # Ok(())
/// # }
/// ```
pub struct Router {
    document: Document,
    uri: String,
    tags: Vec<String>,
    middleware: Vec<Arc<dyn Middleware>>,
    security: Option<(String, Vec<String>)>,
    chain: HandlerChain,
    validation: ValidationConfig,
    spec_uri: String,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("uri", &self.uri)
            .field("tags", &self.tags)
            .field("middleware", &self.middleware.len())
            .field("security", &self.security)
            .field("chain", &self.chain)
            .field("validation", &self.validation)
            .finish()
    }
}

impl Router {
    /// Root router with a fresh document; `info` is a partial info object.
    #[must_use]
    pub fn new(info: Value) -> Self {
        Self::with_config(&GateConfig {
            info,
            ..GateConfig::default()
        })
    }

    /// Root router honouring `config`.
    #[must_use]
    pub fn with_config(config: &GateConfig) -> Self {
        let document = Document::new(config.info.clone());
        if config.references.as_object().is_some_and(|r| !r.is_empty()) {
            document.set_references(&config.references);
        }
        info!(
            validate_requests = config.validation.requests,
            validate_responses = config.validation.responses,
            spec_uri = %config.spec_uri,
            "Router created"
        );
        Self {
            document,
            uri: "/".to_string(),
            tags: Vec::new(),
            middleware: Vec::new(),
            security: None,
            chain: HandlerChain::new(),
            validation: config.validation,
            spec_uri: config.spec_uri.clone(),
        }
    }

    /// The shared document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Absolute URI prefix of this node.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// URI configured for the served document.
    #[must_use]
    pub fn spec_uri(&self) -> &str {
        &self.spec_uri
    }

    /// Create a child node under `uri`, run `setup` on it, then mount it here.
    ///
    /// The child starts with this node's tags (extended by `tags`), a copy of
    /// its middleware chain and its security requirement.
    pub fn group(
        &mut self,
        uri: &str,
        tags: &[&str],
        setup: impl FnOnce(&mut Router) -> anyhow::Result<()>,
    ) -> anyhow::Result<&mut Self> {
        let own: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let mut child = Router {
            document: self.document.clone(),
            uri: join_uri(&self.uri, uri),
            tags: merge_tags(&self.tags, &own),
            middleware: self.middleware.clone(),
            security: self.security.clone(),
            chain: HandlerChain::new(),
            validation: self.validation,
            spec_uri: self.spec_uri.clone(),
        };
        debug!(uri = %child.uri, tags = ?child.tags, "Group created");

        setup(&mut child)?;

        let routes = child.chain.len();
        self.chain.mount(uri, child.chain)?;
        info!(uri = %child.uri, layers = routes, "Group mounted");
        Ok(self)
    }

    /// Append a middleware stage for every route registered after this call.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append several shared stages, in order.
    pub fn use_all(&mut self, middleware: impl IntoIterator<Item = Arc<dyn Middleware>>) -> &mut Self {
        self.middleware.extend(middleware);
        self
    }

    /// Register a security scheme and enforce `middleware` below this node.
    ///
    /// Operations registered below this node get `security: [{scheme: requirement}]`
    /// unless they declare their own. Calling again replaces the active scheme.
    pub fn secure(
        &mut self,
        middleware: impl Middleware + 'static,
        scheme: &str,
        definition: Value,
        requirement: Vec<String>,
    ) -> &mut Self {
        self.document.register_security_scheme(scheme, definition);
        info!(scheme = %scheme, uri = %self.uri, scopes = ?requirement, "Security scheme registered");
        self.security = Some((scheme.to_string(), requirement));
        self.use_middleware(middleware)
    }

    /// [`Router::secure`] with the definition and middleware derived from `provider`.
    pub fn secure_with(
        &mut self,
        scheme: &str,
        provider: impl SecurityProvider + 'static,
        requirement: &[&str],
    ) -> &mut Self {
        let scopes: Vec<String> = requirement.iter().map(|s| s.to_string()).collect();
        let definition = provider.scheme_definition();
        let middleware = SecurityMiddleware::new(scheme, Arc::new(provider), scopes.clone());
        self.secure(middleware, scheme, definition, scopes)
    }

    /// Register `endpoint` on `uri` for `methods` and document it.
    ///
    /// `uri` is relative to this node and uses `:name` / `:name(regex)`
    /// placeholders.
    pub fn route(
        &mut self,
        uri: &str,
        endpoint: Endpoint,
        methods: impl IntoMethods,
    ) -> anyhow::Result<&mut Self> {
        let methods = methods.into_methods()?;
        let caps = self.validation;
        let endpoint = endpoint.configure(|o| {
            o.validate_request &= caps.requests;
            o.validate_response &= caps.responses;
        });

        let stage = endpoint.create_middleware(&self.document.components(), caps.compile_options())?;

        let full = join_uri(&self.uri, uri);
        let template = parse_path_template(&full)?;
        let path = template.normalized();
        let placeholders: Vec<_> = template.placeholders().into_iter().cloned().collect();

        let snapshot = self.document.snapshot();
        let operation = build_operation(
            &OperationContext {
                document: &snapshot,
                tags: &self.tags,
                security: self
                    .security
                    .as_ref()
                    .map(|(name, scopes)| (name.as_str(), scopes.as_slice())),
                placeholders: &placeholders,
            },
            &endpoint,
        )?;

        let mut stages = self.middleware.clone();
        stages.push(stage);

        for method in methods {
            let doc_method = method.as_str().to_ascii_lowercase();
            self.chain.route(method, uri, stages.clone())?;
            self.document.insert_operation(&path, &doc_method, operation.clone());
            info!(
                method = %doc_method,
                path = %path,
                stages = stages.len(),
                "Route registered"
            );
        }
        Ok(self)
    }

    pub fn get(&mut self, uri: &str, endpoint: Endpoint) -> anyhow::Result<&mut Self> {
        self.route(uri, endpoint, Method::GET)
    }

    pub fn post(&mut self, uri: &str, endpoint: Endpoint) -> anyhow::Result<&mut Self> {
        self.route(uri, endpoint, Method::POST)
    }

    pub fn put(&mut self, uri: &str, endpoint: Endpoint) -> anyhow::Result<&mut Self> {
        self.route(uri, endpoint, Method::PUT)
    }

    pub fn patch(&mut self, uri: &str, endpoint: Endpoint) -> anyhow::Result<&mut Self> {
        self.route(uri, endpoint, Method::PATCH)
    }

    pub fn delete(&mut self, uri: &str, endpoint: Endpoint) -> anyhow::Result<&mut Self> {
        self.route(uri, endpoint, Method::DELETE)
    }

    /// Merge a caller-supplied namespace into `components`.
    ///
    /// Pointers such as `#/components/<namespace>/Name` then resolve both when
    /// later routes compile and in the served document.
    pub fn extend_components(&mut self, namespace: &str, value: &Value) -> &mut Self {
        self.document.extend_components(namespace, value);
        debug!(namespace = %namespace, "Components extended");
        self
    }

    /// The live document.
    #[must_use]
    pub fn get_spec(&self) -> Document {
        self.document.clone()
    }

    /// Merge `info` into the document, then return it.
    pub fn get_spec_with(&self, info: impl Into<InfoSource>) -> Document {
        self.document.merge_info(&info.into().to_info());
        self.document.clone()
    }

    /// Serve the document on `uri` (relative to this node).
    ///
    /// The response is computed per request, so routes registered later show up.
    pub fn serve_spec(&mut self, uri: &str) -> anyhow::Result<&mut Self> {
        let server: Arc<dyn Middleware> = Arc::new(SpecServer::new(self.document.clone()));
        self.chain.route(Method::GET, uri, vec![server])?;
        info!(uri = %join_uri(&self.uri, uri), "Serving API description");
        Ok(self)
    }

    /// [`Router::serve_spec`] on the configured `spec_uri`.
    pub fn serve_default_spec(&mut self) -> anyhow::Result<&mut Self> {
        let uri = self.spec_uri.clone();
        self.serve_spec(&uri)
    }

    /// [`Router::serve_spec`] after merging `info` into the document.
    pub fn serve_spec_with(&mut self, uri: &str, info: impl Into<InfoSource>) -> anyhow::Result<&mut Self> {
        self.document.merge_info(&info.into().to_info());
        self.serve_spec(uri)
    }

    /// Produce the application entry point.
    ///
    /// `extra_error_handlers` run, in order, before the terminal stage that turns
    /// any remaining error into a structured response.
    #[must_use]
    pub fn mount(self, extra_error_handlers: Vec<Arc<dyn ErrorHandler>>) -> App {
        App::new(self.chain, extra_error_handlers, self.document)
    }
}
