use futures::future::BoxFuture;
use tracing::{debug, info};

use super::Middleware;
use crate::server::{Request, Response};

/// Logs every request that reaches a route, with its captured path parameters.
///
/// The surrounding `request` span (opened by [`crate::router::App`]) carries the
/// request id, so these events correlate without repeating it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            info!(
                method = %req.method,
                path = %req.path,
                param_count = req.params.len(),
                has_body = req.body.is_some(),
                "Route matched"
            );
            debug!(params = ?req.params, query = ?req.query, "Route inputs");
            Ok(())
        })
    }
}
