use serde_json::{Map, Value};
use std::fmt;

use crate::endpoint::Facet;

/// OpenAPI parameter location (`in`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }

    /// Location a request facet documents into; the body has none.
    #[must_use]
    pub fn of_facet(facet: Facet) -> Option<Self> {
        match facet {
            Facet::Query => Some(ParameterLocation::Query),
            Facet::Params => Some(ParameterLocation::Path),
            Facet::Headers => Some(ParameterLocation::Header),
            Facet::Cookies | Facet::SignedCookies => Some(ParameterLocation::Cookie),
            Facet::Body => None,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A documented operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub schema: Option<Value>,
}

impl ParameterDescriptor {
    /// OpenAPI parameter object: `{name, in, required, description?, schema?}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("name".into(), Value::String(self.name.clone()));
        out.insert("in".into(), Value::String(self.location.as_str().into()));
        out.insert("required".into(), Value::Bool(self.required));
        if let Some(description) = &self.description {
            out.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(schema) = &self.schema {
            out.insert("schema".into(), schema.clone());
        }
        Value::Object(out)
    }
}
