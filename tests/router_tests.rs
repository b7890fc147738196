mod common;

use brrtgate::endpoint::Endpoint;
use brrtgate::error::{INTERNAL_ERROR, REQUEST_NOT_VALID, RESPONSE_NOT_VALID};
use brrtgate::middleware::{error_handler_fn, from_fn, ErrorHandler, Middleware};
use brrtgate::security::{ApiKeyProvider, BearerTokenProvider, PRINCIPAL_LOCAL};
use brrtgate::{ApiError, Outcome, Router};
use common::{call, get};
use serde_json::{json, Value};
use std::sync::Arc;

/// Middleware appending `name` to the `trail` local.
fn mark(name: &'static str) -> impl Middleware {
    from_fn(move |req, _res| {
        let trail = req.locals.entry("trail").or_insert_with(|| json!([]));
        if let Some(items) = trail.as_array_mut() {
            items.push(json!(name));
        }
        Ok(())
    })
}

fn trail_endpoint() -> Endpoint {
    Endpoint::new().handler(|req| async move {
        Ok(req.locals.get("trail").cloned().unwrap_or_else(|| json!([])))
    })
}

#[tokio::test]
async fn test_constrained_path_param_routes_and_documents() {
    let mut root = Router::new(json!({"title": "Users", "version": "1.0.0"}));
    root.route(
        r"/users/:id(\d+)",
        Endpoint::new()
            .with_params_schema(json!({
                "properties": {"id": {"type": "string", "description": "user id"}},
                "required": ["id"]
            }))
            .handler(|req| async move { Ok(json!({"id": req.params["id"]})) }),
        "get",
    )
    .unwrap();
    let app = root.mount(Vec::new());

    let res = get(&app, "/users/42").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"id": "42"}));
    assert!(res.header("x-request-id").is_some());

    // the constraint is part of the route
    assert_eq!(get(&app, "/users/abc").await.status, 404);

    let op = app.document().operation("/users/{id}", "get").unwrap();
    assert_eq!(
        op["parameters"],
        json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "description": "user id",
            "schema": {"type": "string", "pattern": "\\d+"}
        }])
    );
}

#[tokio::test]
async fn test_response_schema_enforced() {
    let ok_only = Endpoint::new().with_response("200", json!({"type": "string", "const": "ok"}));
    let mut root = Router::new(json!({}));
    root.get("/ok", ok_only.clone().handler(|_req| async { Ok("ok") }))
        .unwrap();
    root.get("/no", ok_only.handler(|_req| async { Ok("no") }))
        .unwrap();
    let app = root.mount(Vec::new());

    let res = get(&app, "/ok").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!("ok"));

    let res = get(&app, "/no").await;
    assert_eq!(res.status, 500);
    assert_eq!(res.body["code"], json!(500));
    assert_eq!(res.body["message"], json!(RESPONSE_NOT_VALID));
    assert!(res.body["details"].as_array().is_some_and(|d| !d.is_empty()));
}

#[tokio::test]
async fn test_undeclared_status_is_not_validated() {
    let mut root = Router::new(json!({}));
    root.get(
        "/teapot",
        Endpoint::new()
            .with_response("200", json!({"type": "integer"}))
            .handler(|_req| async { Ok(Outcome::new(json!("short and stout")).with_status(418)) }),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    let res = get(&app, "/teapot").await;
    assert_eq!(res.status, 418);
    assert_eq!(res.body, json!("short and stout"));
}

#[tokio::test]
async fn test_request_validation_details() {
    let mut root = Router::new(json!({}));
    root.post(
        "/pets",
        Endpoint::new()
            .with_body_schema(json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }))
            .handler(|req| async move { Ok(Outcome::new(req.body.unwrap_or(Value::Null)).with_status(201)) }),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    let res = call(&app, "POST", "/pets", Some(json!({})), &[]).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["message"], json!(REQUEST_NOT_VALID));
    let details = res.body["details"].as_array().unwrap();
    let missing = details.iter().find(|issue| issue["keyword"] == json!("required")).unwrap();
    assert_eq!(missing["params"], json!({"missingProperty": "name"}));

    let res = call(&app, "POST", "/pets", Some(json!({"name": "Rex"})), &[]).await;
    assert_eq!(res.status, 201);
    assert_eq!(res.body, json!({"name": "Rex"}));

    // body is required by default
    let res = call(&app, "POST", "/pets", None, &[]).await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn test_query_coercion_and_defaults_reach_handler() {
    let mut root = Router::new(json!({}));
    root.get(
        "/search",
        Endpoint::new()
            .with_query_schema(json!({
                "type": "object",
                "properties": {"limit": {"type": "integer", "default": 10}}
            }))
            .handler(|req| async move { Ok(Value::Object(req.query)) }),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    assert_eq!(get(&app, "/search?limit=5").await.body, json!({"limit": 5}));
    assert_eq!(get(&app, "/search").await.body, json!({"limit": 10}));
    assert_eq!(get(&app, "/search?limit=many").await.status, 400);
}

#[tokio::test]
async fn test_group_tags_and_middleware_follow_the_tree() {
    let mut root = Router::new(json!({}));
    root.use_middleware(mark("root"));
    root.group("/a", &["foo"], |a| {
        a.use_middleware(mark("a"));
        a.group("/b", &["bar", "foo"], |b| {
            b.get("/x", trail_endpoint())?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    root.group("/c", &["baz"], |c| {
        c.use_middleware(mark("c"));
        c.get("/y", trail_endpoint())?;
        Ok(())
    })
    .unwrap();
    // registered after the groups: not inherited by them
    root.use_middleware(mark("late"));
    root.get("/z", trail_endpoint()).unwrap();
    let app = root.mount(Vec::new());

    assert_eq!(get(&app, "/a/b/x").await.body, json!(["root", "a"]));
    assert_eq!(get(&app, "/c/y").await.body, json!(["root", "c"]));
    assert_eq!(get(&app, "/z").await.body, json!(["root", "late"]));

    let doc = app.document().snapshot();
    assert_eq!(doc["paths"]["/a/b/x"]["get"]["tags"], json!(["foo", "bar"]));
    assert_eq!(doc["paths"]["/c/y"]["get"]["tags"], json!(["baz"]));
    assert!(doc["paths"]["/z"]["get"].get("tags").is_none());
}

#[tokio::test]
async fn test_multiple_methods_share_one_path_item() {
    let mut root = Router::new(json!({}));
    root.route("/items", trail_endpoint(), ["get", "put"]).unwrap();
    let app = root.mount(Vec::new());

    assert_eq!(get(&app, "/items").await.status, 200);
    assert_eq!(call(&app, "PUT", "/items", None, &[]).await.status, 200);
    assert_eq!(call(&app, "DELETE", "/items", None, &[]).await.status, 404);

    let doc = app.document().snapshot();
    let item = doc["paths"]["/items"].as_object().unwrap();
    assert!(item.contains_key("get") && item.contains_key("put"));
}

#[tokio::test]
async fn test_unmatched_path_is_structured_404() {
    let app = Router::new(json!({})).mount(Vec::new());
    let res = get(&app, "/nowhere").await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body, json!({"code": 404, "message": "not found", "details": null}));
}

#[tokio::test]
async fn test_unrecognised_error_becomes_generic_500() {
    let mut root = Router::new(json!({}));
    root.get(
        "/boom",
        Endpoint::new().handler(|_req| async {
            Err::<Value, anyhow::Error>(anyhow::anyhow!("connection string: postgres://secret"))
        }),
    )
    .unwrap();
    root.get("/missing", Endpoint::new()).unwrap();
    let app = root.mount(Vec::new());

    for uri in ["/boom", "/missing"] {
        let res = get(&app, uri).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body, json!({"code": 500, "message": INTERNAL_ERROR, "details": null}));
    }
}

#[tokio::test]
async fn test_handler_api_error_passes_through() {
    let mut root = Router::new(json!({}));
    root.get(
        "/conflict",
        Endpoint::new().handler(|_req| async {
            Err::<Value, anyhow::Error>(ApiError::new(409, "pet already exists").into())
        }),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    let res = get(&app, "/conflict").await;
    assert_eq!(res.status, 409);
    assert_eq!(res.body["message"], json!("pet already exists"));
}

#[tokio::test]
async fn test_extra_error_handlers_run_before_terminal() {
    let mut root = Router::new(json!({}));
    root.get(
        "/boom",
        Endpoint::new().handler(|_req| async { Err::<Value, anyhow::Error>(anyhow::anyhow!("boom")) }),
    )
    .unwrap();
    root.get(
        "/conflict",
        Endpoint::new().handler(|_req| async {
            Err::<Value, anyhow::Error>(ApiError::new(409, "taken").into())
        }),
    )
    .unwrap();

    let rewrite: Arc<dyn ErrorHandler> = Arc::new(error_handler_fn(|err, _req, res| {
        if err.downcast_ref::<ApiError>().is_some() {
            return Err(err);
        }
        res.set_status(503);
        res.send(json!({"retry": true}))
    }));
    let app = root.mount(vec![rewrite]);

    let res = get(&app, "/boom").await;
    assert_eq!(res.status, 503);
    assert_eq!(res.body, json!({"retry": true}));

    // forwarded to the terminal stage
    assert_eq!(get(&app, "/conflict").await.status, 409);
}

#[tokio::test]
async fn test_bearer_scopes_enforced_below_group() {
    let mut root = Router::new(json!({}));
    root.get("/public", trail_endpoint()).unwrap();
    root.group("/admin", &["admin"], |admin| {
        admin.secure_with(
            "bearer",
            BearerTokenProvider::new()
                .token("reader", ["read"])
                .token("boss", ["read", "admin"]),
            &["admin"],
        );
        admin.get(
            "/stats",
            Endpoint::new().handler(|req| async move {
                Ok(req.locals.get(PRINCIPAL_LOCAL).cloned().unwrap_or(Value::Null))
            }),
        )?;
        Ok(())
    })
    .unwrap();
    let app = root.mount(Vec::new());

    assert_eq!(get(&app, "/public").await.status, 200);
    assert_eq!(get(&app, "/admin/stats").await.status, 401);

    let res = call(&app, "GET", "/admin/stats", None, &[("authorization", "Bearer reader")]).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["details"]["missingScopes"], json!(["admin"]));

    let res = call(&app, "GET", "/admin/stats", None, &[("authorization", "Bearer boss")]).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"scopes": ["read", "admin"]}));

    let doc = app.document().snapshot();
    assert_eq!(doc["components"]["securitySchemes"]["bearer"], json!({"type": "http", "scheme": "bearer"}));
    assert_eq!(doc["paths"]["/admin/stats"]["get"]["security"], json!([{"bearer": ["admin"]}]));
    assert!(doc["paths"]["/public"]["get"].get("security").is_none());
}

#[tokio::test]
async fn test_declared_security_is_kept() {
    let mut root = Router::new(json!({}));
    root.secure_with("apiKey", ApiKeyProvider::header("x-api-key").key("k"), &[]);
    root.get(
        "/open-doc",
        trail_endpoint().with_operation(json!({"security": []})),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    let doc = app.document().snapshot();
    assert_eq!(doc["paths"]["/open-doc"]["get"]["security"], json!([]));
    // documentation only: the middleware still runs
    assert_eq!(get(&app, "/open-doc").await.status, 401);
    let res = call(&app, "GET", "/open-doc", None, &[("x-api-key", "k")]).await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let mut root = Router::new(json!({}));
    root.get("/ping", trail_endpoint()).unwrap();
    let app = root.mount(Vec::new());

    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let res = call(&app, "GET", "/ping", None, &[("x-request-id", id)]).await;
    assert_eq!(res.header("x-request-id"), Some(id));
}

#[tokio::test]
async fn test_malformed_json_body_rejected() {
    let mut root = Router::new(json!({}));
    root.post("/echo", trail_endpoint()).unwrap();
    let app = root.mount(Vec::new());

    let req = http::Request::builder()
        .method("POST")
        .uri("/echo")
        .header("content-type", "application/json")
        .body(b"{not json".to_vec())
        .unwrap();
    let res = app.handle(req).await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_shared_stages_and_spec_info_override() {
    // a subscriber may already be installed by another test
    brrtgate::logging::init_logging_with_config(&brrtgate::logging::LogConfig::default_dev()).ok();

    let traced: Arc<dyn Middleware> = Arc::new(brrtgate::middleware::TracingMiddleware);
    let marked: Arc<dyn Middleware> = Arc::new(mark("shared"));
    let shared = vec![traced, marked];
    let mut root = Router::new(json!({"title": "Traced"}));
    root.use_all(shared);
    root.get("/t/:n", trail_endpoint()).unwrap();
    root.serve_spec_with("/spec.json", json!({"version": "9.9.9"}))
        .unwrap();
    let app = root.mount(Vec::new());

    assert_eq!(get(&app, "/t/1").await.body, json!(["shared"]));
    let spec = get(&app, "/spec.json").await;
    assert_eq!(spec.body["info"], json!({"title": "Traced", "version": "9.9.9"}));
}

#[tokio::test]
async fn test_unanswered_group_does_not_leak_params() {
    let mut root = Router::new(json!({}));
    root.group("/a/:x", &[], |a| {
        a.get("/only", Endpoint::new().handler(|_req| async { Ok("only") }))?;
        Ok(())
    })
    .unwrap();
    root.get(
        "/a/:y/other",
        Endpoint::new().handler(|req| async move { Ok(Value::Object(req.params)) }),
    )
    .unwrap();
    root.get(
        "/a/:y/strict",
        Endpoint::new()
            .with_params_schema(json!({
                "type": "object",
                "properties": {"y": {"type": "string"}},
                "additionalProperties": false
            }))
            .handler(|_req| async { Ok("strict") }),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    assert_eq!(get(&app, "/a/1/only").await.body, json!("only"));

    let res = get(&app, "/a/1/other").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"y": "1"}));

    let res = get(&app, "/a/1/strict").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!("strict"));
}

#[tokio::test]
async fn test_head_gets_headers_without_body() {
    let mut root = Router::new(json!({}));
    root.get(
        "/p",
        Endpoint::new().handler(|_req| async { Ok(json!({"big": "payload"})) }),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    let res = call(&app, "HEAD", "/p", None, &[]).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, Value::Null);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert!(res.header("x-request-id").is_some());

    assert_eq!(get(&app, "/p").await.body, json!({"big": "payload"}));
}

#[tokio::test]
async fn test_header_facet_validated_and_coerced() {
    let mut root = Router::new(json!({}));
    root.get(
        "/h",
        Endpoint::new()
            .with_headers_schema(json!({
                "type": "object",
                "properties": {"x-count": {"type": "integer"}},
                "required": ["x-count"]
            }))
            .handler(|req| async move { Ok(req.headers["x-count"].clone()) }),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    let res = call(&app, "GET", "/h", None, &[("X-Count", "3")]).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!(3));

    let res = call(&app, "GET", "/h", None, &[("x-count", "three")]).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["message"], json!(REQUEST_NOT_VALID));

    let res = call(&app, "GET", "/h", None, &[]).await;
    assert_eq!(res.status, 400);
    let details = res.body["details"].as_array().unwrap();
    assert!(details.iter().any(|issue| issue["keyword"] == json!("required")));

    let op = app.document().operation("/h", "get").unwrap();
    assert_eq!(
        op["parameters"],
        json!([{"name": "x-count", "in": "header", "required": true, "schema": {"type": "integer"}}])
    );
}

#[tokio::test]
async fn test_cookie_facets_validated_and_coerced() {
    // stands in for a cookie-signing layer
    let unsign = from_fn(|req, _res| {
        if let Some(value) = req.cookies.remove("session") {
            req.signed_cookies.insert("session".into(), value);
        }
        Ok(())
    });
    let mut root = Router::new(json!({}));
    root.use_middleware(unsign);
    root.get(
        "/c",
        Endpoint::new()
            .with_cookies_schema(json!({
                "type": "object",
                "properties": {"theme": {"type": "string", "enum": ["dark", "light"]}, "visits": {"type": "integer"}},
                "required": ["theme"]
            }))
            .with_signed_cookies_schema(json!({
                "type": "object",
                "properties": {"session": {"type": "string", "minLength": 4}},
                "required": ["session"]
            }))
            .handler(|req| async move {
                Ok(json!({"visits": req.cookies.get("visits"), "session": req.signed_cookies["session"]}))
            }),
    )
    .unwrap();
    let app = root.mount(Vec::new());

    let res = call(&app, "GET", "/c", None, &[("cookie", "theme=dark; visits=7; session=abcdef")]).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"visits": 7, "session": "abcdef"}));

    let res = call(&app, "GET", "/c", None, &[("cookie", "theme=neon; session=abcdef")]).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["message"], json!(REQUEST_NOT_VALID));

    let res = call(&app, "GET", "/c", None, &[("cookie", "theme=dark; session=ab")]).await;
    assert_eq!(res.status, 400);
    let details = res.body["details"].as_array().unwrap();
    assert!(details.iter().any(|issue| issue["keyword"] == json!("minLength")));
}
