use serde_json::{json, Value};
use std::collections::HashMap;

use super::{require_scopes, SecurityProvider};
use crate::error::ApiError;
use crate::server::Request;

/// Static bearer tokens, each granting a fixed set of scopes.
#[derive(Debug, Clone, Default)]
pub struct BearerTokenProvider {
    tokens: HashMap<String, Vec<String>>,
    bearer_format: Option<String>,
}

impl BearerTokenProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token`, granting `scopes`.
    #[must_use]
    pub fn token<I, S>(mut self, token: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens
            .insert(token.into(), scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Documented `bearerFormat` (e.g. `JWT`).
    #[must_use]
    pub fn bearer_format(mut self, format: impl Into<String>) -> Self {
        self.bearer_format = Some(format.into());
        self
    }
}

impl SecurityProvider for BearerTokenProvider {
    fn validate(&self, scopes: &[String], req: &Request) -> Result<Option<Value>, ApiError> {
        let token = req
            .header("authorization")
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .map(str::trim)
            .ok_or_else(ApiError::unauthorized)?;
        let granted = self.tokens.get(token).ok_or_else(ApiError::unauthorized)?;
        require_scopes(granted, scopes)?;
        Ok(Some(json!({ "scopes": granted })))
    }

    fn scheme_definition(&self) -> Value {
        let mut definition = json!({"type": "http", "scheme": "bearer"});
        if let Some(format) = &self.bearer_format {
            definition["bearerFormat"] = Value::String(format.clone());
        }
        definition
    }
}
