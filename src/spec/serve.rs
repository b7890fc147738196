use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use super::Document;
use crate::middleware::Middleware;
use crate::server::{Request, Response};

/// `Cache-Control` sent with the served document.
pub const SPEC_CACHE_CONTROL: &str = "public, max-age=31536000, must-revalidate";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Served {
    etag: String,
    last_modified: DateTime<Utc>,
}

/// Stage that serves the live document with conditional-GET support.
///
/// The ETag is recomputed from the serialized document on every request, so
/// routes registered after the document route are never served stale.
/// `Last-Modified` only moves when the hash changes.
pub struct SpecServer {
    document: Document,
    served: ArcSwap<Served>,
}

impl SpecServer {
    #[must_use]
    pub fn new(document: Document) -> Self {
        let etag = document.to_json().map(|bytes| etag_of(&bytes)).unwrap_or_default();
        Self {
            document,
            served: ArcSwap::from_pointee(Served {
                etag,
                last_modified: Utc::now(),
            }),
        }
    }

    /// Current `(etag, last-modified)` pair, refreshed when the document changed.
    fn current(&self, bytes: &[u8]) -> Arc<Served> {
        let etag = etag_of(bytes);
        let served = self.served.load_full();
        if served.etag == etag {
            return served;
        }
        let fresh = Arc::new(Served {
            etag,
            last_modified: Utc::now(),
        });
        self.served.store(Arc::clone(&fresh));
        debug!(etag = %fresh.etag, "Served document changed");
        fresh
    }
}

impl Middleware for SpecServer {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let snapshot = self.document.snapshot();
            let bytes = serde_json::to_vec(&snapshot)?;
            let served = self.current(&bytes);

            res.set_header("etag", served.etag.clone())
                .set_header("last-modified", http_date(&served.last_modified))
                .set_header("cache-control", SPEC_CACHE_CONTROL);

            let not_modified = req
                .header("if-none-match")
                .is_some_and(|tags| tags.split(',').any(|t| t.trim() == served.etag || t.trim() == "*"));
            if not_modified {
                res.set_status(304);
                return res.send_empty();
            }

            res.set_header("content-type", "application/json");
            res.set_status(200);
            res.send(snapshot)
        })
    }
}

/// Quoted hex SHA-256 of `bytes`.
#[must_use]
pub fn etag_of(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("\"{hex}\"")
}

/// RFC 7231 IMF-fixdate.
#[must_use]
pub fn http_date(at: &DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
