use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::refs::REFERENCES_NAMESPACE;
use crate::error::{INTERNAL_ERROR, REQUEST_NOT_VALID};

/// OpenAPI version written into every document.
pub const OPENAPI_VERSION: &str = "3.1.0";

/// The shared API description.
///
/// Cloning a `Document` clones the handle, not the tree: a router and every
/// group derived from it hold the same document, and any mutation is visible to
/// all of them.
///
/// ```rust
/// use brrtgate::spec::Document;
/// use serde_json::json;
///
/// let doc = Document::new(json!({"title": "Pets"}));
/// let handle = doc.clone();
/// handle.insert_operation("/pets", "get", json!({"responses": {}}));
/// assert!(doc.snapshot()["paths"]["/pets"]["get"].is_object());
/// assert!(doc.ptr_eq(&handle));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    inner: Arc<RwLock<Value>>,
}

impl Document {
    /// New document with `info` merged over a minimal title/version.
    #[must_use]
    pub fn new(info: Value) -> Self {
        let mut doc = json!({
            "openapi": OPENAPI_VERSION,
            "info": {"title": "API", "version": "0.0.0"},
            "paths": {},
            "components": default_components(),
        });
        merge_object(&mut doc["info"], &info);
        Self {
            inner: Arc::new(RwLock::new(doc)),
        }
    }

    /// Whether both handles point at the same document.
    #[must_use]
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Deep copy of the current tree.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.inner.read().clone()
    }

    /// Deep copy of `components`, the reference document schemas compile against.
    #[must_use]
    pub fn components(&self) -> Value {
        self.inner.read()["components"].clone()
    }

    #[must_use]
    pub fn info(&self) -> Value {
        self.inner.read()["info"].clone()
    }

    /// Merge a partial info object; nested objects such as `contact` merge too.
    pub fn merge_info(&self, info: &Value) {
        let mut doc = self.inner.write();
        merge_object(&mut doc["info"], info);
    }

    /// Write (or merge over) the operation at `paths[path][method]`.
    pub fn insert_operation(&self, path: &str, method: &str, operation: Value) {
        let mut doc = self.inner.write();
        let slot = &mut doc["paths"][path][method];
        if slot.is_object() {
            merge_object(slot, &operation);
        } else {
            *slot = operation;
        }
        debug!(path = %path, method = %method, "Operation documented");
    }

    #[must_use]
    pub fn operation(&self, path: &str, method: &str) -> Option<Value> {
        self.inner
            .read()
            .get("paths")
            .and_then(|p| p.get(path))
            .and_then(|p| p.get(method))
            .cloned()
    }

    /// Add `components.securitySchemes[name]`.
    pub fn register_security_scheme(&self, name: &str, definition: Value) {
        let mut doc = self.inner.write();
        doc["components"]["securitySchemes"][name] = definition;
    }

    /// Merge `value` into `components[namespace]`.
    pub fn extend_components(&self, namespace: &str, value: &Value) {
        let mut doc = self.inner.write();
        let slot = &mut doc["components"][namespace];
        if slot.is_null() {
            *slot = json!({});
        }
        merge_object(slot, value);
    }

    /// Mount the caller's reference document under `components.x-references`.
    pub fn set_references(&self, references: &Value) {
        self.extend_components(REFERENCES_NAMESPACE, references);
    }

    /// Serialize the current tree.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&*self.inner.read())
    }
}

/// Recursively merge object `patch` into `target`; non-objects overwrite.
pub(crate) fn merge_object(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_object(existing, value);
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) if !patch.is_null() => *target = patch.clone(),
        _ => {}
    }
}

fn default_components() -> Value {
    let error_content = json!({
        "application/json": {"schema": {"$ref": "#/components/schemas/Error"}}
    });
    let mut components = Map::new();
    components.insert(
        "schemas".into(),
        json!({
            "Error": {
                "type": "object",
                "properties": {
                    "code": {"type": "integer"},
                    "message": {"type": "string"},
                    "details": {}
                },
                "required": ["code", "message"]
            }
        }),
    );
    components.insert(
        "responses".into(),
        json!({
            "ValidationError": {"description": REQUEST_NOT_VALID, "content": error_content},
            "InternalError": {"description": INTERNAL_ERROR, "content": error_content},
        }),
    );
    Value::Object(components)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_shape() {
        let doc = Document::new(json!({"title": "Pets", "version": "1.2.0"}));
        let v = doc.snapshot();
        assert_eq!(v["openapi"], json!(OPENAPI_VERSION));
        assert_eq!(v["info"], json!({"title": "Pets", "version": "1.2.0"}));
        assert!(v["components"]["schemas"]["Error"].is_object());
        assert!(v["components"]["responses"]["ValidationError"].is_object());
    }

    #[test]
    fn test_merge_info_is_deep() {
        let doc = Document::new(json!({"contact": {"name": "A"}}));
        doc.merge_info(&json!({"contact": {"email": "a@example.com"}, "title": "T"}));
        let info = doc.info();
        assert_eq!(info["contact"], json!({"name": "A", "email": "a@example.com"}));
        assert_eq!(info["title"], json!("T"));
    }

    #[test]
    fn test_insert_operation_merges() {
        let doc = Document::new(json!({}));
        doc.insert_operation("/a", "get", json!({"tags": ["x"], "summary": "one"}));
        doc.insert_operation("/a", "get", json!({"summary": "two"}));
        doc.insert_operation("/a", "post", json!({"summary": "three"}));
        assert_eq!(doc.operation("/a", "get"), Some(json!({"tags": ["x"], "summary": "two"})));
        assert!(doc.operation("/a", "post").is_some());
        assert!(doc.operation("/b", "get").is_none());
    }

    #[test]
    fn test_extend_components_and_references() {
        let doc = Document::new(json!({}));
        doc.extend_components("x-shared", &json!({"Id": {"type": "string"}}));
        doc.set_references(&json!({"Pet": {"type": "object"}}));
        let components = doc.components();
        assert_eq!(components["x-shared"]["Id"], json!({"type": "string"}));
        assert_eq!(components[REFERENCES_NAMESPACE]["Pet"], json!({"type": "object"}));
    }
}
