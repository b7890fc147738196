#![allow(dead_code)]

use brrtgate::App;
use serde_json::Value;

/// Decoded response as seen by a client.
pub struct TestResponse {
    pub status: u16,
    pub headers: http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Send one request through `app` and decode the JSON body (`Null` when empty).
pub async fn call(
    app: &App,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let bytes = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            serde_json::to_vec(&body).unwrap()
        }
        None => Vec::new(),
    };
    let res = app.handle(builder.body(bytes).unwrap()).await;

    let status = res.status().as_u16();
    let headers = res.headers().clone();
    let raw = res.into_body();
    let body = if raw.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&raw)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&raw).into_owned()))
    };
    TestResponse { status, headers, body }
}

pub async fn get(app: &App, uri: &str) -> TestResponse {
    call(app, "GET", uri, None, &[]).await
}

pub mod temp_files {
    use std::io::Write;

    /// Write `content` into a named temporary file that lives as long as the handle.
    pub fn create_temp_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}
