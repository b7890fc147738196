//! `$ref` pointer resolution across the shared document.
//!
//! Two prefixes are understood:
//!
//! - [`REFERENCES_PREFIX`] (`#/components/x-references/`) walks the caller-supplied
//!   reference document, which the router mounts under `components.x-references`.
//! - [`DOCUMENT_PREFIX`] (`#/`) walks the whole API description document.
//!
//! Because the reference document is mounted inside the API description, both kinds
//! of pointer also resolve for external tooling reading the served document.

use serde_json::Value;

use crate::error::SpecError;

/// Prefix of in-document pointers.
pub const DOCUMENT_PREFIX: &str = "#/";
/// Name of the components namespace holding the caller's reference document.
pub const REFERENCES_NAMESPACE: &str = "x-references";
/// Prefix of pointers into the caller's reference document.
pub const REFERENCES_PREFIX: &str = "#/components/x-references/";

/// Upper bound on pointer-to-pointer hops, guarding pathological documents.
const MAX_REF_DEPTH: usize = 64;

/// Returns the reference string when `value` is a pure pointer object.
///
/// Only `{"$ref": "..."}` with no sibling keys counts; schemas that carry a `$ref`
/// next to other keywords are concrete schemas.
#[must_use]
pub fn pointer_of(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get("$ref").and_then(Value::as_str),
        _ => None,
    }
}

/// Build a pointer object into the caller's reference document.
///
/// ```rust
/// use brrtgate::spec::reference;
///
/// assert_eq!(
///     reference("Pet"),
///     serde_json::json!({"$ref": "#/components/x-references/Pet"})
/// );
/// ```
#[must_use]
pub fn reference(path: &str) -> Value {
    serde_json::json!({ "$ref": format!("{REFERENCES_PREFIX}{}", path.trim_start_matches('/')) })
}

/// Build a pointer object into `components.schemas`.
#[must_use]
pub fn schema_ref(name: &str) -> Value {
    serde_json::json!({ "$ref": format!("#/components/schemas/{name}") })
}

/// Resolve `schema` until it is no longer a pointer.
///
/// `document` is the API description; `references` is the caller's reference
/// document. Non-pointer values pass through unchanged and an absent schema
/// resolves to `None`. A pointer chain that revisits a pointer fails with
/// [`SpecError::CyclicReference`].
pub fn unfold<'a>(
    document: &'a Value,
    references: &'a Value,
    schema: Option<&'a Value>,
) -> Result<Option<Value>, SpecError> {
    let Some(mut current) = schema else {
        return Ok(None);
    };
    if current.is_null() {
        return Ok(None);
    }

    let mut seen: Vec<&str> = Vec::new();
    while let Some(pointer) = pointer_of(current) {
        if seen.contains(&pointer) || seen.len() >= MAX_REF_DEPTH {
            return Err(SpecError::CyclicReference(pointer.to_string()));
        }
        seen.push(pointer);
        current = lookup(document, references, pointer)?;
    }
    Ok(Some(current.clone()))
}

/// Resolve a single pointer string to the value it names.
pub fn lookup<'a>(
    document: &'a Value,
    references: &'a Value,
    pointer: &str,
) -> Result<&'a Value, SpecError> {
    let (root, rest) = if let Some(rest) = pointer.strip_prefix(REFERENCES_PREFIX) {
        (references, rest)
    } else if let Some(rest) = pointer.strip_prefix(DOCUMENT_PREFIX) {
        (document, rest)
    } else {
        return Err(SpecError::UnresolvedReference(pointer.to_string()));
    };

    rest.split('/')
        .filter(|token| !token.is_empty())
        .try_fold(root, |node, token| {
            let token = token.replace("~1", "/").replace("~0", "~");
            match node {
                Value::Object(map) => map.get(&token),
                Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
        })
        .ok_or_else(|| SpecError::UnresolvedReference(pointer.to_string()))
}
