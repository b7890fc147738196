use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

use crate::chain::HandlerChain;
use crate::error::ApiError;
use crate::ids::REQUEST_ID_HEADER;
use crate::middleware::ErrorHandler;
use crate::server::{Request, Response};
use crate::spec::Document;

/// Last error-handling layer: turns any error into a structured response.
///
/// An [`ApiError`] is sent as-is; anything else is logged and replaced by a
/// generic 500. When the response was already sent the error is forwarded.
struct TerminalErrorHandler;

impl ErrorHandler for TerminalErrorHandler {
    fn handle<'a>(
        &'a self,
        err: anyhow::Error,
        req: &'a Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), anyhow::Error>> {
        Box::pin(async move {
            if res.is_sent() {
                return Err(err);
            }
            let api_error = match err.downcast::<ApiError>() {
                Ok(api_error) => api_error,
                Err(other) => {
                    error!(
                        method = %req.method,
                        path = %req.path,
                        error = %other,
                        "Unhandled error"
                    );
                    ApiError::internal()
                }
            };
            res.send_error(&api_error)
        })
    }
}

/// The mounted application.
///
/// Produced by [`crate::router::Router::mount`]. Requests walk the root chain,
/// any extra error handlers, then the terminal normalizer. A request nothing
/// answered gets a structured 404.
pub struct App {
    chain: HandlerChain,
    document: Document,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").field("chain", &self.chain).finish()
    }
}

impl App {
    pub(crate) fn new(
        mut chain: HandlerChain,
        extra_error_handlers: Vec<Arc<dyn ErrorHandler>>,
        document: Document,
    ) -> Self {
        for handler in extra_error_handlers {
            chain.catch(handler);
        }
        chain.catch(Arc::new(TerminalErrorHandler));
        Self { chain, document }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Run `req` through the application.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let span = info_span!(
            "request",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path
        );
        async move {
            let started = Instant::now();
            let mut res = Response::new();
            let path = req.path.clone();

            if let Some(err) = self.chain.dispatch(&path, &mut req, &mut res, None).await {
                // only reachable once a response went out
                error!(error = %err, status = res.status(), "Error after response was sent");
            }
            if !res.is_sent() {
                warn!("No route matched");
                if let Err(e) = res.send_error(&ApiError::not_found()) {
                    error!(error = %e, "Failed to send 404");
                }
            }
            res.set_header(REQUEST_ID_HEADER, req.request_id.to_string());

            info!(
                status = res.status(),
                latency_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            );
            res
        }
        .instrument(span)
        .await
    }

    /// Serve a buffered `http::Request`.
    ///
    /// `HEAD` requests get the status and headers of the matching `GET` route
    /// with an empty body.
    pub async fn handle(&self, req: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        let head = req.method() == http::Method::HEAD;
        let res = match Request::from_http(req) {
            Ok(request) => self.dispatch(request).await,
            Err(api_error) => {
                warn!(status = api_error.code, message = %api_error.message, "Request rejected before routing");
                let mut res = Response::new();
                if let Err(e) = res.send_error(&api_error) {
                    error!(error = %e, "Failed to send parse error");
                }
                res
            }
        };
        match res.into_http() {
            Ok(mut http_res) => {
                if head {
                    http_res.body_mut().clear();
                }
                http_res
            }
            Err(e) => {
                error!(error = %e, "Failed to encode response");
                let mut fallback = http::Response::new(Vec::new());
                *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            }
        }
    }
}
