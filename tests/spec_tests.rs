mod common;

use brrtgate::endpoint::Endpoint;
use brrtgate::spec::{unfold, SPEC_CACHE_CONTROL};
use brrtgate::{schema_ref, PackageMetadata, Router};
use common::{call, get};
use serde_json::{json, Value};

fn pets_router() -> Router {
    let mut root = Router::new(json!({"title": "Pets", "version": "2.0.0"}));
    root.extend_components(
        "schemas",
        &json!({
            "Pet": {
                "type": "object",
                "properties": {"name": {"type": "string"}, "age": {"type": "integer"}},
                "required": ["name"]
            }
        }),
    );
    root.serve_spec("/openapi.json").unwrap();
    root.group("/pets", &["pets"], |pets| {
        pets.post(
            "/",
            Endpoint::new()
                .with_body_schema(schema_ref("Pet"))
                .with_response("201", schema_ref("Pet"))
                .configure(|o| o.default_status = 201)
                .handler(|req| async move { Ok(req.body.unwrap_or(Value::Null)) }),
        )?;
        pets.get(
            r"/:id(\d+)",
            Endpoint::new()
                .with_response("200", schema_ref("Pet"))
                .handler(|_req| async { Ok(json!({"name": "Rex", "age": 3})) }),
        )?;
        Ok(())
    })
    .unwrap();
    root
}

#[test]
fn test_assembled_document_is_valid_openapi() {
    let root = pets_router();
    let doc = root.get_spec().snapshot();

    let spec: oas3::OpenApiV3Spec = serde_json::from_value(doc.clone()).unwrap();
    assert_eq!(spec.openapi, "3.1.0");
    assert_eq!(spec.info.title, "Pets");
    assert_eq!(spec.info.version, "2.0.0");

    let paths = spec.paths.as_ref().unwrap();
    assert!(paths.contains_key("/pets"));
    assert!(paths.contains_key("/pets/{id}"));

    let post = &doc["paths"]["/pets"]["post"];
    assert_eq!(post["tags"], json!(["pets"]));
    // top-level pointers are unfolded into the operation
    assert_eq!(
        post["requestBody"]["content"]["application/json"]["schema"]["required"],
        json!(["name"])
    );
    assert_eq!(
        post["responses"]["400"],
        json!({"$ref": "#/components/responses/ValidationError"})
    );
    assert_eq!(
        post["responses"]["500"],
        json!({"$ref": "#/components/responses/InternalError"})
    );
}

#[test]
fn test_pointers_in_document_resolve() {
    let root = pets_router();
    let doc = root.get_spec().snapshot();
    let pointer = schema_ref("Pet");
    let resolved = unfold(&doc, &doc["components"]["x-references"], Some(&pointer))
        .unwrap()
        .unwrap();
    assert_eq!(resolved["required"], json!(["name"]));
    assert_eq!(
        doc["paths"]["/pets/{id}"]["get"]["responses"]["200"]["content"]["application/json"]["schema"],
        resolved
    );
}

#[tokio::test]
async fn test_component_schemas_drive_validation() {
    let app = pets_router().mount(Vec::new());

    let res = call(&app, "POST", "/pets", Some(json!({"name": "Tom", "age": "4"})), &[]).await;
    assert_eq!(res.status, 201);
    assert_eq!(res.body, json!({"name": "Tom", "age": 4}));

    let res = call(&app, "POST", "/pets", Some(json!({"age": 4})), &[]).await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn test_served_document_supports_conditional_get() {
    let app = pets_router().mount(Vec::new());

    let res = get(&app, "/openapi.json").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.header("cache-control"), Some(SPEC_CACHE_CONTROL));
    assert!(res.header("last-modified").is_some());
    assert_eq!(res.body, app.document().snapshot());
    let etag = res.header("etag").unwrap().to_string();

    let res = call(&app, "GET", "/openapi.json", None, &[("if-none-match", etag.as_str())]).await;
    assert_eq!(res.status, 304);
    assert_eq!(res.body, Value::Null);
    assert_eq!(res.header("etag"), Some(etag.as_str()));

    let res = call(&app, "GET", "/openapi.json", None, &[("if-none-match", "\"stale\"")]).await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn test_routes_registered_after_serving_are_listed() {
    // serve_spec is called before the /pets group in pets_router
    let app = pets_router().mount(Vec::new());
    let res = get(&app, "/openapi.json").await;
    assert!(res.body["paths"]["/pets/{id}"]["get"].is_object());
    assert!(res.body["paths"].get("/openapi.json").is_none());
}

#[test]
fn test_info_from_package_metadata() {
    let root = Router::new(json!({}));
    let meta = PackageMetadata {
        name: "petstore".into(),
        version: "3.1.4".into(),
        description: Some("Pets as a service".into()),
        author: Some(brrtgate::spec::Author::Text("Pat <pat@example.com> (https://pets.io)".into())),
        license: Some("MIT".into()),
    };
    let info = root.get_spec_with(meta).info();
    assert_eq!(info["title"], json!("petstore"));
    assert_eq!(info["version"], json!("3.1.4"));
    assert_eq!(
        info["contact"],
        json!({"name": "Pat", "email": "pat@example.com", "url": "https://pets.io"})
    );
    assert_eq!(info["license"], json!({"name": "MIT"}));

    let info = root.get_spec_with(json!({"title": "Renamed"})).info();
    assert_eq!(info["title"], json!("Renamed"));
    assert_eq!(info["version"], json!("3.1.4"));
}

#[test]
fn test_dangling_reference_fails_registration() {
    let mut root = Router::new(json!({}));
    assert!(root
        .get("/x", Endpoint::new().with_query_schema(schema_ref("Missing")))
        .is_err());
    assert!(root.get_spec().operation("/x", "get").is_none());
}
