use jsonschema::error::ValidationErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One validator failure, in the order the engine reported it.
///
/// Serialized as `{path, keyword, message, params, schemaPath}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// JSON pointer into the validated instance (e.g. `/query/limit`)
    pub path: String,
    /// Schema keyword that failed (e.g. `type`, `required`)
    pub keyword: String,
    /// Engine message
    pub message: String,
    /// Keyword-specific parameters
    #[serde(default)]
    pub params: Value,
    /// JSON pointer into the schema (e.g. `/properties/query/properties/limit/type`)
    #[serde(default)]
    pub schema_path: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, keyword: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            keyword: keyword.into(),
            message: message.into(),
            params: Value::Object(Default::default()),
            schema_path: String::new(),
        }
    }

    #[must_use]
    pub fn with_schema_path(mut self, schema_path: impl Into<String>) -> Self {
        self.schema_path = schema_path.into();
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Keyword-specific parameters for a failure, `{}` when the keyword carries none.
pub(crate) fn params_of(kind: &ValidationErrorKind) -> Value {
    match kind {
        ValidationErrorKind::Required { property } => json!({ "missingProperty": property }),
        ValidationErrorKind::AdditionalProperties { unexpected }
        | ValidationErrorKind::UnevaluatedProperties { unexpected } => {
            json!({ "unexpectedProperties": unexpected })
        }
        ValidationErrorKind::Maximum { limit }
        | ValidationErrorKind::Minimum { limit }
        | ValidationErrorKind::ExclusiveMaximum { limit }
        | ValidationErrorKind::ExclusiveMinimum { limit } => json!({ "limit": limit }),
        ValidationErrorKind::MaxLength { limit }
        | ValidationErrorKind::MinLength { limit }
        | ValidationErrorKind::MaxItems { limit }
        | ValidationErrorKind::MinItems { limit }
        | ValidationErrorKind::MaxProperties { limit }
        | ValidationErrorKind::MinProperties { limit } => json!({ "limit": limit }),
        ValidationErrorKind::Enum { options } => json!({ "allowedValues": options }),
        ValidationErrorKind::Constant { expected_value } => json!({ "allowedValue": expected_value }),
        ValidationErrorKind::Pattern { pattern } => json!({ "pattern": pattern }),
        ValidationErrorKind::Format { format } => json!({ "format": format }),
        _ => Value::Object(Default::default()),
    }
}

/// Last token of a schema pointer, which names the failing keyword.
pub(crate) fn keyword_from_schema_path(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty() && segment.parse::<usize>().is_err())
        .unwrap_or("schema")
        .to_string()
}
