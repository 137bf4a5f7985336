use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use gridlite::{server::router, GridConfig, GridService, TableSeed};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn demo_router() -> (TempDir, Router) {
    let dir = tempdir().unwrap();
    let config = GridConfig::default().with_db_path(dir.path().join("grid.db"));
    let service = GridService::new(config).unwrap();
    service.lifecycle(vec![TableSeed::demo()]).setup().unwrap();
    (dir, router(service))
}

/// Percent-encodes everything but unreserved characters
fn encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

async fn call(app: Router, request: Request<Body>) -> Value {
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_form(uri: &str, request: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("request={}", encode(&request.to_string()))))
        .unwrap()
}

fn get_query(uri: &str, request: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(format!("{}?request={}", uri, encode(&request.to_string())))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_list_via_form_post() {
    let (_dir, app) = demo_router();
    let request = json!({
        "cmd": "get",
        "table_name": "test",
        "limit": 2,
        "offset": 0,
        "search": [{"field": "fname", "operator": "begins", "value": "Jo"}],
        "searchLogic": "AND"
    });
    let body = call(app, post_form("/get_table_data_all", &request)).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["total"], 1);
    assert_eq!(body["records"][0]["fname"], "John");
    assert_eq!(body["records"][0]["recid"], 3);
}

#[tokio::test]
async fn test_list_via_query_string() {
    let (_dir, app) = demo_router();
    let request = json!({"table_name": "test", "limit": 2});
    let body = call(app, get_query("/get_table_data_all", &request)).await;
    assert_eq!(body["total"], 4);
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_default_table() {
    let (_dir, app) = demo_router();
    let request = Request::builder()
        .uri("/get_table_data")
        .body(Body::empty())
        .unwrap();
    let body = call(app, request).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn test_missing_request_parameter() {
    let (_dir, app) = demo_router();
    let request = Request::builder()
        .uri("/get_table_data_all")
        .body(Body::empty())
        .unwrap();
    let body = call(app, request).await;
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("MalformedRequest"));
}

#[tokio::test]
async fn test_unknown_table_over_http() {
    let (_dir, app) = demo_router();
    let request = json!({"table_name": "sqlite_master", "limit": 10});
    let body = call(app, post_form("/get_table_data_all", &request)).await;
    assert_eq!(
        body,
        json!({
            "status": "error",
            "message": "UnknownTable: table 'sqlite_master' is not available"
        })
    );
}

#[tokio::test]
async fn test_delete_then_list() {
    let (_dir, app) = demo_router();
    let request = json!({"table_name": "test", "recid": [2]});
    let body = call(app.clone(), post_form("/delete_table_data", &request)).await;
    assert_eq!(body, json!({"status": "success"}));

    let request = json!({"table_name": "test", "limit": 10});
    let body = call(app, get_query("/get_table_data_all", &request)).await;
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_save_via_query_string() {
    let (_dir, app) = demo_router();
    let request = json!({
        "table_name": "test",
        "changes": [{"recid": 1, "email": "t.rukwid@example.com"}]
    });
    let body = call(app.clone(), get_query("/save_table_data", &request)).await;
    assert_eq!(body["status"], "success");

    let request = json!({
        "table_name": "test",
        "limit": 1,
        "search": [{"field": "email", "operator": "ends", "value": "@example.com"}]
    });
    let body = call(app, post_form("/get_table_data_all", &request)).await;
    assert_eq!(body["records"][0]["fname"], "Thomas");
}

fn post_raw(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn assert_malformed(body: &Value) {
    assert_eq!(body["status"], "error");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("MalformedRequest"), "{}", message);
}

#[tokio::test]
async fn test_list_via_json_body() {
    let (_dir, app) = demo_router();
    let request = json!({"table_name": "test", "limit": 1, "offset": 3});
    let post = post_raw("/get_table_data_all", "application/json", &request.to_string());
    let body = call(app, post).await;
    assert_eq!(body["total"], 4);
    assert_eq!(body["records"][0]["fname"], "Jane");
}

#[tokio::test]
async fn test_undecodable_json_body() {
    let (_dir, app) = demo_router();
    let post = post_raw("/get_table_data_all", "application/json", "{\"table_name\":");
    assert_malformed(&call(app, post).await);
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let (_dir, app) = demo_router();
    let post = post_raw("/delete_table_data", "text/plain", "request={}");
    assert_malformed(&call(app.clone(), post).await);

    // Nothing was deleted
    let request = json!({"table_name": "test", "limit": 10});
    let body = call(app, get_query("/get_table_data_all", &request)).await;
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn test_write_routes_require_request_parameter() {
    let (_dir, app) = demo_router();
    for uri in ["/delete_table_data", "/save_table_data"] {
        let get = Request::builder().uri(uri).body(Body::empty()).unwrap();
        assert_malformed(&call(app.clone(), get).await);

        let post = post_raw(uri, "application/x-www-form-urlencoded", "cmd=delete");
        assert_malformed(&call(app.clone(), post).await);
    }
}
