//! Operation-record synthesis.
//!
//! Turns an [`Endpoint`] declaration plus the registering router node's state
//! into the OpenAPI operation written to `paths[path][method]`.

use serde_json::{json, Map, Value};

use super::refs::{unfold, REFERENCES_NAMESPACE};
use super::types::{ParameterDescriptor, ParameterLocation};
use super::uri::PathPlaceholder;
use crate::endpoint::{Endpoint, Facet, MEDIA_TYPE_KEY};
use crate::error::SpecError;
use crate::server::status_reason;

/// Description used when an endpoint documents no response schema at all.
pub const NO_SCHEMA_DESCRIPTION: &str = "no schema given";

/// Router-node state an operation is built against.
#[derive(Debug, Clone, Copy)]
pub struct OperationContext<'a> {
    /// Document snapshot used to resolve pointers
    pub document: &'a Value,
    /// Tags accumulated from the enclosing groups
    pub tags: &'a [String],
    /// Active security scheme name and its required scopes
    pub security: Option<(&'a str, &'a [String])>,
    /// Placeholders parsed from the route template
    pub placeholders: &'a [PathPlaceholder],
}

/// Build the operation record for `endpoint`.
pub fn build_operation(ctx: &OperationContext<'_>, endpoint: &Endpoint) -> Result<Value, SpecError> {
    let references = &ctx.document["components"][REFERENCES_NAMESPACE];
    let declared = endpoint.operation();
    let mut operation = Map::new();

    let tags = merge_tags(ctx.tags, &endpoint.tags());
    if !tags.is_empty() {
        operation.insert(
            "tags".into(),
            Value::Array(tags.into_iter().map(Value::String).collect()),
        );
    }

    // parameters: facets in fixed order, explicit ones, then path placeholders
    let mut parameters: Vec<Value> = Vec::new();
    for facet in Facet::ALL {
        let Some(location) = ParameterLocation::of_facet(facet) else {
            continue;
        };
        let resolved = unfold(ctx.document, references, endpoint.schema(facet))?;
        for descriptor in expand_parameters(resolved.as_ref(), location) {
            upsert_parameter(&mut parameters, descriptor.to_value());
        }
    }
    if let Some(Value::Array(explicit)) = declared.get("parameters") {
        for parameter in explicit {
            upsert_parameter(&mut parameters, parameter.clone());
        }
    }
    for placeholder in ctx.placeholders {
        merge_path_placeholder(&mut parameters, placeholder);
    }
    if !parameters.is_empty() {
        operation.insert("parameters".into(), Value::Array(parameters));
    }

    if let Some(body) = unfold(ctx.document, references, endpoint.body_schema())? {
        let (media_type, schema) = split_media_type(body, &endpoint.options().default_media_type);
        operation.insert(
            "requestBody".into(),
            json!({
                "required": endpoint.options().body_required,
                "content": single(&media_type, json!({ "schema": schema })),
            }),
        );
    }

    operation.insert("responses".into(), build_responses(ctx, endpoint)?);

    if !declared.contains_key("security") {
        if let Some((name, scopes)) = ctx.security {
            operation.insert("security".into(), json!([single(name, json!(scopes))]));
        }
    }

    for (key, value) in declared {
        match key.as_str() {
            "tags" | "parameters" => {}
            "responses" => {
                if let (Some(Value::Object(target)), Value::Object(extra)) =
                    (operation.get_mut("responses"), value)
                {
                    for (code, response) in extra {
                        target.insert(code.clone(), response.clone());
                    }
                }
            }
            _ => {
                operation.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(Value::Object(operation))
}

fn build_responses(ctx: &OperationContext<'_>, endpoint: &Endpoint) -> Result<Value, SpecError> {
    let references = &ctx.document["components"][REFERENCES_NAMESPACE];
    let options = endpoint.options();
    let mut responses = Map::new();

    match endpoint.response_code_schemas() {
        Some(schemas) => {
            for (code, schema) in schemas {
                let resolved = unfold(ctx.document, references, Some(schema))?.unwrap_or(json!({}));
                let description = resolved
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| fallback_description(code));
                let (media_type, schema) = split_media_type(resolved, endpoint.media_type_for(code));

                let mut response = Map::new();
                response.insert("description".into(), Value::String(description));
                response.insert("content".into(), single(&media_type, json!({ "schema": schema })));
                if let Some(headers) = endpoint.response_headers(code) {
                    response.insert("headers".into(), headers.clone());
                }
                responses.insert(code.clone(), Value::Object(response));
            }
            if options.validate_response && !responses.contains_key("500") {
                responses.insert("500".into(), json!({"$ref": "#/components/responses/InternalError"}));
            }
        }
        None => {
            responses.insert(
                options.default_status.to_string(),
                json!({ "description": NO_SCHEMA_DESCRIPTION }),
            );
        }
    }

    if endpoint.validates_request() && !responses.contains_key("400") {
        responses.insert("400".into(), json!({"$ref": "#/components/responses/ValidationError"}));
    }
    Ok(Value::Object(responses))
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn fallback_description(code: &str) -> String {
    match code.parse::<u16>() {
        Ok(status) => status_reason(status).to_string(),
        Err(_) => "Response".to_string(),
    }
}

/// Pull a schema's own media type out, falling back to `default`.
fn split_media_type(mut schema: Value, default: &str) -> (String, Value) {
    let own = schema
        .as_object_mut()
        .and_then(|m| m.remove(MEDIA_TYPE_KEY))
        .and_then(|v| v.as_str().map(str::to_string));
    (own.unwrap_or_else(|| default.to_string()), schema)
}

/// Ordered union, `first` wins ordering, duplicates dropped.
#[must_use]
pub fn merge_tags(first: &[String], second: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(first.len() + second.len());
    for tag in first.iter().chain(second) {
        if !out.contains(tag) {
            out.push(tag.clone());
        }
    }
    out
}

/// Expand the top-level properties of an object schema into parameters.
fn expand_parameters(schema: Option<&Value>, location: ParameterLocation) -> Vec<ParameterDescriptor> {
    let Some(schema) = schema else {
        return Vec::new();
    };
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| {
            let mut property = property.clone();
            let description = property
                .as_object_mut()
                .and_then(|p| p.remove("description"))
                .and_then(|d| d.as_str().map(str::to_string));
            ParameterDescriptor {
                name: name.clone(),
                location,
                required: required.contains(&name.as_str()),
                description,
                schema: Some(property),
            }
        })
        .collect()
}

fn parameter_key(parameter: &Value) -> Option<(&str, &str)> {
    Some((parameter.get("name")?.as_str()?, parameter.get("in")?.as_str()?))
}

/// Insert `parameter`, merging over an existing one with the same (name, in).
fn upsert_parameter(parameters: &mut Vec<Value>, parameter: Value) {
    let existing = parameter_key(&parameter).and_then(|key| {
        parameters
            .iter()
            .position(|p| parameter_key(p) == Some(key))
    });
    match (existing, parameter) {
        (Some(index), Value::Object(fields)) => {
            if let Some(Value::Object(target)) = parameters.get_mut(index) {
                target.extend(fields);
            }
        }
        (_, parameter) => parameters.push(parameter),
    }
}

fn merge_path_placeholder(parameters: &mut Vec<Value>, placeholder: &PathPlaceholder) {
    let location = ParameterLocation::Path.as_str();
    let existing = parameters.iter_mut().find(|p| {
        parameter_key(p) == Some((placeholder.name.as_str(), location))
    });

    let Some(Value::Object(parameter)) = existing else {
        let mut schema = json!({"type": "string"});
        if let Some(pattern) = &placeholder.pattern {
            schema["pattern"] = Value::String(pattern.clone());
        }
        parameters.push(
            ParameterDescriptor {
                name: placeholder.name.clone(),
                location: ParameterLocation::Path,
                required: true,
                description: None,
                schema: Some(schema),
            }
            .to_value(),
        );
        return;
    };

    parameter.insert("required".into(), Value::Bool(true));
    if let Some(pattern) = &placeholder.pattern {
        let schema = parameter
            .entry("schema")
            .or_insert_with(|| json!({}));
        if let Value::Object(schema) = schema {
            schema
                .entry("type")
                .or_insert_with(|| Value::String("string".into()));
            schema
                .entry("pattern")
                .or_insert_with(|| Value::String(pattern.clone()));
        }
    }
}
