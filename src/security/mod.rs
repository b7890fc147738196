//! # Security
//!
//! Providers that authenticate a request for a named OpenAPI security scheme.
//!
//! A [`SecurityProvider`] does two things: it checks a request's credentials
//! against the scopes an operation requires, and it describes itself as an
//! OpenAPI security-scheme object. `Router::secure_with` uses both: the
//! definition is registered under `components.securitySchemes`, and a
//! [`SecurityMiddleware`] enforcing the provider joins the node's chain.
//!
//! Failures are structured errors: `401` when credentials are missing or
//! unknown, `403` when they are valid but lack a required scope.
//!
//! ```rust
//! use brrtgate::security::{ApiKeyProvider, SecurityProvider};
//!
//! let provider = ApiKeyProvider::header("x-api-key").key("secret");
//! assert_eq!(provider.scheme_definition()["in"], "header");
//! ```

use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::middleware::Middleware;
use crate::server::{Request, Response};

mod api_key;
mod basic;
mod bearer;

pub use api_key::{ApiKeyLocation, ApiKeyProvider};
pub use basic::BasicAuthProvider;
pub use bearer::BearerTokenProvider;

/// Key under [`Request::locals`] holding what a provider learned about the caller.
pub const PRINCIPAL_LOCAL: &str = "principal";

/// Authentication and authorization for one security scheme.
pub trait SecurityProvider: Send + Sync {
    /// Check `req` for `scopes`.
    ///
    /// `Ok` carries an optional principal stored under [`PRINCIPAL_LOCAL`];
    /// `Err` is the structured error sent to the client.
    fn validate(&self, scopes: &[String], req: &Request) -> Result<Option<Value>, ApiError>;

    /// OpenAPI security-scheme object for this provider.
    fn scheme_definition(&self) -> Value;
}

/// Stage enforcing a provider for every route below the node that declared it.
pub struct SecurityMiddleware {
    scheme: String,
    provider: Arc<dyn SecurityProvider>,
    scopes: Vec<String>,
}

impl SecurityMiddleware {
    pub fn new(scheme: impl Into<String>, provider: Arc<dyn SecurityProvider>, scopes: Vec<String>) -> Self {
        Self {
            scheme: scheme.into(),
            provider,
            scopes,
        }
    }
}

impl Middleware for SecurityMiddleware {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            match self.provider.validate(&self.scopes, req) {
                Ok(principal) => {
                    debug!(scheme = %self.scheme, "Request authenticated");
                    if let Some(principal) = principal {
                        req.locals.insert(PRINCIPAL_LOCAL.to_string(), principal);
                    }
                    Ok(())
                }
                Err(e) => {
                    warn!(
                        scheme = %self.scheme,
                        status = e.code,
                        path = %req.path,
                        "Request rejected by security provider"
                    );
                    Err(e.into())
                }
            }
        })
    }
}

/// `403` unless every required scope is granted.
pub(crate) fn require_scopes(granted: &[String], required: &[String]) -> Result<(), ApiError> {
    let missing: Vec<&String> = required.iter().filter(|s| !granted.contains(s)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::forbidden().with_details(serde_json::json!({ "missingScopes": missing })))
    }
}
