use jsonschema::Validator;
use serde_json::{Number, Value};
use tracing::debug;

use super::issue::{keyword_from_schema_path, params_of, ValidationIssue};
use crate::error::SpecError;
use crate::spec::refs::{lookup, REFERENCES_NAMESPACE};

/// Maximum schema nesting followed by the coercion/default pass.
const MAX_PREPARE_DEPTH: usize = 64;

/// Engine switches applied when a schema is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Convert scalar strings into the declared `type` before validating
    pub coerce_types: bool,
    /// Insert `default` values for absent properties before validating
    pub use_defaults: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            coerce_types: true,
            use_defaults: true,
        }
    }
}

/// A schema compiled against a reference document.
///
/// The reference document (the API description's `components`) is embedded into the
/// compiled root so `#/components/...` pointers resolve inside the engine exactly as
/// they do in the served document.
///
/// # Example
///
/// ```rust
/// use brrtgate::validator::{CompileOptions, SchemaValidator};
/// use serde_json::json;
///
/// let components = json!({"schemas": {"Limit": {"type": "integer", "maximum": 50}}});
/// let schema = json!({
///     "type": "object",
///     "properties": {"limit": {"$ref": "#/components/schemas/Limit"}}
/// });
/// let validator = SchemaValidator::compile(&schema, &components, CompileOptions::default(), "query").unwrap();
///
/// let mut data = json!({"limit": "20"});
/// assert!(validator.validate(&mut data).is_ok());
/// assert_eq!(data["limit"], json!(20));
/// ```
pub struct SchemaValidator {
    validator: Validator,
    root: Value,
    options: CompileOptions,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("root", &self.root)
            .field("options", &self.options)
            .finish()
    }
}

impl SchemaValidator {
    /// Compile `schema` with `components` as its reference document.
    ///
    /// `context` names what is being compiled and only appears in errors.
    pub fn compile(
        schema: &Value,
        components: &Value,
        options: CompileOptions,
        context: &str,
    ) -> Result<Self, SpecError> {
        let mut root = match schema {
            Value::Object(_) => schema.clone(),
            other => serde_json::json!({ "allOf": [other] }),
        };
        if let Value::Object(map) = &mut root {
            map.insert("components".to_string(), components.clone());
        }

        let validator = jsonschema::options()
            .build(&root)
            .map_err(|e| SpecError::InvalidSchema {
                context: context.to_string(),
                message: e.to_string(),
            })?;

        debug!(context = %context, "Schema compiled");
        Ok(Self {
            validator,
            root,
            options,
        })
    }

    /// Validate `data`, coercing and defaulting it in place first.
    ///
    /// On failure returns every issue the engine reports, in engine order. The
    /// in-place changes are kept either way.
    pub fn validate(&self, data: &mut Value) -> Result<(), Vec<ValidationIssue>> {
        if self.options.coerce_types || self.options.use_defaults {
            self.prepare(&self.root, data, 0);
        }

        let issues: Vec<ValidationIssue> = self
            .validator
            .iter_errors(data)
            .map(|error| {
                let schema_path = error.schema_path().to_string();
                ValidationIssue::new(
                    error.instance_path().to_string(),
                    keyword_from_schema_path(&schema_path),
                    error.to_string(),
                )
                .with_schema_path(schema_path)
                .with_params(params_of(error.kind()))
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Follow `$ref` keywords until a schema without one is reached.
    fn resolve<'s>(&'s self, schema: &'s Value) -> Option<&'s Value> {
        let references = &self.root["components"][REFERENCES_NAMESPACE];
        let mut current = schema;
        let mut hops = 0;
        while let Some(pointer) = current.get("$ref").and_then(Value::as_str) {
            if hops >= MAX_PREPARE_DEPTH {
                return None;
            }
            current = lookup(&self.root, references, pointer).ok()?;
            hops += 1;
        }
        Some(current)
    }

    fn prepare(&self, schema: &Value, instance: &mut Value, depth: usize) {
        if depth > MAX_PREPARE_DEPTH {
            return;
        }
        let Some(Value::Object(keywords)) = self.resolve(schema) else {
            return;
        };

        if self.options.coerce_types {
            if let Some(ty) = keywords.get("type") {
                coerce(ty, instance);
            }
        }

        if let Some(Value::Array(all_of)) = keywords.get("allOf") {
            for sub in all_of {
                self.prepare(sub, instance, depth + 1);
            }
        }

        match instance {
            Value::Object(map) => {
                if let Some(Value::Object(properties)) = keywords.get("properties") {
                    for (name, property) in properties {
                        if self.options.use_defaults && !map.contains_key(name) {
                            if let Some(default) = self.resolve(property).and_then(|p| p.get("default")) {
                                map.insert(name.clone(), default.clone());
                            }
                        }
                        if let Some(child) = map.get_mut(name) {
                            self.prepare(property, child, depth + 1);
                        }
                    }
                }
            }
            Value::Array(items) => {
                if let Some(item_schema) = keywords.get("items") {
                    for item in items.iter_mut() {
                        self.prepare(item_schema, item, depth + 1);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Convert `instance` to one of the declared types when it matches none of them.
fn coerce(ty: &Value, instance: &mut Value) {
    let types: Vec<&str> = match ty {
        Value::String(t) => vec![t.as_str()],
        Value::Array(list) => list.iter().filter_map(Value::as_str).collect(),
        _ => return,
    };
    if types.iter().any(|t| matches_type(t, instance)) {
        return;
    }
    for t in types {
        if let Some(converted) = coerce_to(t, instance) {
            *instance = converted;
            return;
        }
    }
}

fn matches_type(ty: &str, value: &Value) -> bool {
    match ty {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn coerce_to(ty: &str, value: &Value) -> Option<Value> {
    match (ty, value) {
        ("integer", Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        ("number", Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .map(Value::from)
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .map(Value::Number)
                })
        }
        ("integer" | "number", Value::Bool(b)) => Some(Value::from(i64::from(*b))),
        ("integer" | "number", Value::Null) => Some(Value::from(0)),
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        ("string", Value::Null) => Some(Value::String(String::new())),
        ("boolean", Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ("boolean", Value::Number(n)) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        ("boolean", Value::Null) => Some(Value::Bool(false)),
        ("null", Value::String(s)) if s.is_empty() => Some(Value::Null),
        ("null", Value::Bool(false)) => Some(Value::Null),
        ("null", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Null),
        // form style: `a,b,c` -> ["a","b","c"]; items are coerced afterwards
        ("array", Value::String(s)) => Some(Value::Array(
            s.split(',')
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.trim().to_string()))
                .collect(),
        )),
        ("array", scalar @ (Value::Number(_) | Value::Bool(_))) => {
            Some(Value::Array(vec![scalar.clone()]))
        }
        _ => None,
    }
}
