use futures::future::BoxFuture;
use http::Method;
use std::sync::Arc;
use tracing::debug;

use super::matcher::PathMatcher;
use crate::error::SpecError;
use crate::middleware::{ErrorHandler, Middleware};
use crate::server::{Request, Response};

enum Layer {
    Route {
        method: Method,
        matcher: PathMatcher,
        stages: Vec<Arc<dyn Middleware>>,
    },
    Mount {
        matcher: PathMatcher,
        child: Arc<HandlerChain>,
    },
    Catch(Arc<dyn ErrorHandler>),
}

/// Ordered list of routes, mounted child chains and error-handling layers.
///
/// Dispatch walks the layers in registration order with a single error channel:
///
/// - while no error is pending, route and mount layers whose path matches run and
///   catch layers are skipped;
/// - once a stage fails, route and mount layers are skipped and catch layers see
///   the error until one of them handles it;
/// - the walk stops as soon as the response is sent with no error pending.
///
/// Whatever error is still pending at the end is returned to the caller.
#[derive(Default)]
pub struct HandlerChain {
    layers: Vec<Layer>,
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let summary: Vec<String> = self
            .layers
            .iter()
            .map(|layer| match layer {
                Layer::Route { method, matcher, stages } => {
                    format!("{method} {} ({} stages)", matcher.template(), stages.len())
                }
                Layer::Mount { matcher, child } => {
                    format!("mount {} ({} layers)", matcher.template(), child.len())
                }
                Layer::Catch(_) => "catch".to_string(),
            })
            .collect();
        f.debug_struct("HandlerChain").field("layers", &summary).finish()
    }
}

impl HandlerChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Register `stages` for `method` on the `:name(regex)` template `path`.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        stages: Vec<Arc<dyn Middleware>>,
    ) -> Result<&mut Self, SpecError> {
        let matcher = PathMatcher::exact(path)?;
        self.layers.push(Layer::Route {
            method,
            matcher,
            stages,
        });
        Ok(self)
    }

    /// Attach `child` under `prefix`; the child sees the path with the prefix removed.
    pub fn mount(&mut self, prefix: &str, child: HandlerChain) -> Result<&mut Self, SpecError> {
        let matcher = PathMatcher::prefix(prefix)?;
        self.layers.push(Layer::Mount {
            matcher,
            child: Arc::new(child),
        });
        Ok(self)
    }

    /// Append an error-handling layer.
    pub fn catch(&mut self, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        self.layers.push(Layer::Catch(handler));
        self
    }

    /// Walk the layers for `path`, starting with an optional pending error.
    pub fn dispatch<'a>(
        &'a self,
        path: &'a str,
        req: &'a mut Request,
        res: &'a mut Response,
        err: Option<anyhow::Error>,
    ) -> BoxFuture<'a, Option<anyhow::Error>> {
        Box::pin(async move {
            let mut pending = err;
            for layer in &self.layers {
                if pending.is_none() && res.is_sent() {
                    break;
                }
                match (layer, pending.take()) {
                    (Layer::Catch(handler), Some(error)) => {
                        pending = handler.handle(error, req, res).await.err();
                    }
                    (Layer::Catch(_), None) => {}
                    (Layer::Route { .. } | Layer::Mount { .. }, Some(error)) => {
                        pending = Some(error);
                    }
                    (Layer::Route { method, matcher, stages }, None) => {
                        if !method_matches(method, &req.method) {
                            continue;
                        }
                        let Some(hit) = matcher.matches(path) else {
                            continue;
                        };
                        debug!(route = %matcher.template(), method = %method, "Route layer matched");
                        let saved = req.params.clone();
                        req.params.extend(hit.params);
                        for stage in stages {
                            if res.is_sent() {
                                break;
                            }
                            if let Err(e) = stage.handle(req, res).await {
                                pending = Some(e);
                                break;
                            }
                        }
                        if pending.is_none() && !res.is_sent() {
                            req.params = saved;
                        }
                    }
                    (Layer::Mount { matcher, child }, None) => {
                        let Some(hit) = matcher.matches(path) else {
                            continue;
                        };
                        // captures only apply inside the mount; drop them if nothing answered
                        let saved = req.params.clone();
                        req.params.extend(hit.params);
                        pending = child.dispatch(&hit.rest, req, res, None).await;
                        if pending.is_none() && !res.is_sent() {
                            req.params = saved;
                        }
                    }
                }
            }
            pending
        })
    }
}

/// `HEAD` falls back to `GET` routes.
fn method_matches(route: &Method, request: &Method) -> bool {
    route == request || (*request == Method::HEAD && *route == Method::GET)
}
