//! HTTP routes driven through the router without a listener.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use stockroom::{app, builtin, resolve, AppState, Settings};
use tower::ServiceExt;

const TOOLS: &str = "Part Name,Brand,Detail Specification,Total,UOM\nDrill,Bosch,18V,3,Pcs\nSaw,,,1,Pcs\n";

fn router(dir: &Path) -> Router {
    fs::write(dir.join("stock_detail.csv"), TOOLS).unwrap();
    fs::write(dir.join("alamat_fsl.csv"), "FSL Name,Address,City,Latitude,Longitude\nFSL Jakarta,Jl. A,Jakarta,,\n").unwrap();
    let model = resolve(&builtin().unwrap(), dir).unwrap();
    let settings = Settings {
        data_dir: dir.to_path_buf(),
        ..Settings::default()
    };
    app(AppState::new(model), &settings)
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let r = router(dir.path());
    let (status, body) = call(&r, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["collections"].as_array().unwrap().len(), 6);
    let (_, body) = call(&r, Method::GET, "/version", None).await;
    assert_eq!(body["name"], json!("stockroom"));
}

#[tokio::test]
async fn list_search_and_paginate() {
    let dir = tempfile::tempdir().unwrap();
    let r = router(dir.path());
    let (status, body) = call(&r, Method::GET, "/api/tools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], json!(2));
    assert_eq!(body["data"][0]["id"], json!("Drill"));
    assert_eq!(body["data"][0]["total"], json!(3));

    let (_, body) = call(&r, Method::GET, "/api/tools?search=18v", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = call(&r, Method::GET, "/api/tools?page=2&per_page=1", None).await;
    assert_eq!(body["data"][0]["id"], json!("Saw"));
    assert_eq!(body["meta"], json!({ "count": 1, "page": 2, "per_page": 1, "total": 2 }));

    let (_, body) = call(&r, Method::GET, "/api/tools?page=9&per_page=5", None).await;
    assert_eq!(body["data"], json!([]));

    let (_, body) = call(&r, Method::GET, "/api/tools?brand=Bosch", None).await;
    assert_eq!(body["meta"]["count"], json!(1));
}

#[tokio::test]
async fn crud_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let r = router(dir.path());

    let (status, body) = call(&r, Method::POST, "/api/tools", Some(json!({ "partName": "Hammer", "Total": "2" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["uom"], json!("Pcs"));

    let (status, body) = call(&r, Method::GET, "/api/tools/hammer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(2));

    let (status, body) = call(&r, Method::PUT, "/api/tools/Hammer", Some(json!({ "total": 2.0 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["no_changes"], json!(true));

    let (_, body) = call(&r, Method::PUT, "/api/tools/Hammer", Some(json!({ "total": 5 }))).await;
    assert_eq!(body["no_changes"], json!(false));
    assert_eq!(body["outcome"], json!("updated"));

    let (status, _) = call(&r, Method::DELETE, "/api/tools/Hammer", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&r, Method::GET, "/api/tools/Hammer", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn keys_are_percent_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let r = router(dir.path());
    let (status, body) = call(&r, Method::GET, "/api/locations/fsl%20jakarta", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["city"], json!("Jakarta"));
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let dir = tempfile::tempdir().unwrap();
    let r = router(dir.path());

    let (status, body) = call(&r, Method::POST, "/api/tools", Some(json!({ "part_name": "Vise", "total": "many" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation_error"));

    let (status, body) = call(&r, Method::POST, "/api/tools", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], json!("bad request: No data provided"));

    let (status, _) = call(&r, Method::POST, "/api/locations", Some(json!({ "fsl_name": "New" }))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = call(&r, Method::GET, "/api/gadgets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&r, Method::PUT, "/api/stock-parts/P-404", Some(json!({ "qty": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[cfg(unix)]
#[tokio::test]
async fn read_only_file_is_forbidden_with_guidance() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let r = router(dir.path());
    let path = dir.path().join("stock_detail.csv");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

    let (status, body) = call(&r, Method::PUT, "/api/tools/Drill", Some(json!({ "total": 9 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("permission_denied"));
    assert!(body["error"]["message"].as_str().unwrap().contains("read-only"));
    assert_eq!(fs::read_to_string(&path).unwrap(), TOOLS);
}

#[tokio::test]
async fn bulk_upsert_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let r = router(dir.path());

    let payload = json!([
        { "part_name": "Drill", "total": 4 },
        { "part_name": "Clamp", "total": 1 },
        { "brand": "no key" }
    ]);
    let (status, body) = call(&r, Method::POST, "/api/tools/bulk-upsert", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counts"], json!({ "inserted": 1, "updated": 1, "skipped": 1 }));

    let (status, _) = call(&r, Method::POST, "/api/tools/bulk-upsert", Some(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&r, Method::GET, "/api/export", None).await;
    assert_eq!(status, StatusCode::OK);
    let tools = body["collections"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[2]["Part Name"], json!("Clamp"));
    assert_eq!(tools[2]["Brand"], Value::Null);
}
