use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::SecurityProvider;
use crate::error::ApiError;
use crate::server::Request;

/// HTTP Basic credentials checked against a static user table.
#[derive(Debug, Clone, Default)]
pub struct BasicAuthProvider {
    users: HashMap<String, String>,
}

impl BasicAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    fn credentials(req: &Request) -> Option<(String, String)> {
        let encoded = req
            .header("authorization")?
            .strip_prefix("Basic ")?
            .trim();
        let decoded = general_purpose::STANDARD.decode(encoded).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }
}

impl SecurityProvider for BasicAuthProvider {
    fn validate(&self, _scopes: &[String], req: &Request) -> Result<Option<Value>, ApiError> {
        let (user, password) = Self::credentials(req).ok_or_else(ApiError::unauthorized)?;
        match self.users.get(&user) {
            Some(expected) if *expected == password => Ok(Some(json!({ "username": user }))),
            _ => Err(ApiError::unauthorized()),
        }
    }

    fn scheme_definition(&self) -> Value {
        json!({"type": "http", "scheme": "basic"})
    }
}
