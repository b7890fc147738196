//! # Configuration
//!
//! [`GateConfig`] is loaded from YAML and then adjusted from the environment:
//!
//! ```yaml
//! info:
//!   title: Pet Store
//!   version: 1.0.0
//! spec_uri: /openapi.json
//! validation:
//!   requests: true
//!   responses: false
//!   coerce_types: true
//!   use_defaults: true
//! references:
//!   PetId: { type: string, pattern: "^[0-9A-Z]{26}$" }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `BRRTGATE_VALIDATE_REQUESTS` | `validation.requests` |
//! | `BRRTGATE_VALIDATE_RESPONSES` | `validation.responses` |
//! | `BRRTGATE_COERCE_TYPES` | `validation.coerce_types` |
//! | `BRRTGATE_USE_DEFAULTS` | `validation.use_defaults` |
//! | `BRRTGATE_SPEC_URI` | `spec_uri` |
//!
//! Booleans accept `true/false`, `1/0`, `yes/no` and `on/off`; anything else
//! leaves the field unchanged.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::path::Path;
use tracing::{debug, warn};

use crate::validator::CompileOptions;

/// Default URI the document is served on.
pub const DEFAULT_SPEC_URI: &str = "/openapi.json";

/// Router-wide validation switches.
///
/// `requests` and `responses` cap the per-endpoint options: a validator runs
/// only when both the config and the endpoint enable it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub requests: bool,
    pub responses: bool,
    pub coerce_types: bool,
    pub use_defaults: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            requests: true,
            responses: true,
            coerce_types: true,
            use_defaults: true,
        }
    }
}

impl ValidationConfig {
    /// Engine options derived from these switches.
    #[must_use]
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            coerce_types: self.coerce_types,
            use_defaults: self.use_defaults,
        }
    }
}

/// Top-level gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Partial OpenAPI `info` object
    pub info: Value,
    /// Where `serve_spec` registers the document
    pub spec_uri: String,
    pub validation: ValidationConfig,
    /// External reference document, mounted at `components.x-references`
    pub references: Value,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            info: Value::Object(serde_json::Map::new()),
            spec_uri: DEFAULT_SPEC_URI.to_string(),
            validation: ValidationConfig::default(),
            references: Value::Object(serde_json::Map::new()),
        }
    }
}

impl GateConfig {
    /// Parse YAML text.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse gate config YAML")
    }

    /// Read and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read gate config {}", path.display()))?;
        let config = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), spec_uri = %config.spec_uri, "Gate config loaded");
        Ok(config)
    }

    /// Load from a file, then apply environment overrides.
    pub fn load_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply `BRRTGATE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the environment, a map in tests…).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let flags: [(&str, &mut bool); 4] = [
            ("BRRTGATE_VALIDATE_REQUESTS", &mut self.validation.requests),
            ("BRRTGATE_VALIDATE_RESPONSES", &mut self.validation.responses),
            ("BRRTGATE_COERCE_TYPES", &mut self.validation.coerce_types),
            ("BRRTGATE_USE_DEFAULTS", &mut self.validation.use_defaults),
        ];
        for (key, slot) in flags {
            let Some(raw) = lookup(key) else {
                continue;
            };
            match parse_flag(&raw) {
                Some(value) => *slot = value,
                None => warn!(key = %key, value = %raw, "Ignoring invalid boolean override"),
            }
        }
        if let Some(uri) = lookup("BRRTGATE_SPEC_URI").filter(|u| !u.trim().is_empty()) {
            self.spec_uri = uri;
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
