//! End-to-end tests for the dashboard HTTP API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`.
//! Scripts are run with `sh` so the tests do not depend on Python.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use dashboard::config::DashboardConfig;
use dashboard::state::AppState;
use monitor_common::FileKind;
use test_utils::fixtures::{CTD_CAST_CSV, ECHO_ENV_SCRIPT, FAILING_SCRIPT, SITE_METADATA_CSV};
use test_utils::{temp_test_dir, write_fixture};

const BOUNDARY: &str = "dashboard-test-boundary";
const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

// ============================================================================
// Helpers
// ============================================================================

async fn test_app_with(root: &Path, configure: impl FnOnce(&mut DashboardConfig)) -> (Router, Arc<AppState>) {
    let mut config = DashboardConfig::default();
    config.storage.root = root.to_path_buf();
    config.runner.interpreter = "sh".to_string();
    config.runner.script_extensions = vec!["sh".to_string()];
    config.runner.timeout_secs = 10;
    configure(&mut config);

    let state = Arc::new(AppState::new(config, None).await.unwrap());
    (dashboard::build_router(Arc::clone(&state)), state)
}

async fn test_app(root: &Path) -> (Router, Arc<AppState>) {
    test_app_with(root, |_| {}).await
}

fn multipart_body(field: &str, file_name: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(uri: &str, field: &str, file_name: &str, contents: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, file_name, contents)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("not JSON ({}): {}", e, String::from_utf8_lossy(&bytes)));
    (status, value)
}

async fn upload(app: &Router, uri: &str, file_name: &str, contents: &str) -> Value {
    let (status, body) = send_json(app, upload_request(uri, "file", file_name, contents.as_bytes())).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
    body
}

// ============================================================================
// Health, page, metrics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "dashboard");
}

#[tokio::test]
async fn test_page_lists_uploads() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let (status, html) = send(&app, get("/")).await;
    let html = String::from_utf8(html).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No data files uploaded yet."));
    assert!(html.contains("No scripts uploaded yet."));

    upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;
    let (_, html) = send(&app, get("/")).await;
    let html = String::from_utf8(html).unwrap();
    assert!(html.contains("/api/data/cast.csv/table"));
    assert!(html.contains("No scripts uploaded yet."));
}

#[tokio::test]
async fn test_page_links_reach_reserved_names() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "cast#2.csv", CTD_CAST_CSV).await;

    let (_, html) = send(&app, get("/")).await;
    let html = String::from_utf8(html).unwrap();
    assert!(html.contains("href=\"/api/data/cast%232.csv/table\""));

    let (status, body) = send_json(&app, get("/api/data/cast%232.csv/table")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "cast#2.csv");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let (status, _) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// Uploads
// ============================================================================

#[tokio::test]
async fn test_upload_and_list_data() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let body = upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Uploaded data file: cast.csv");
    assert_eq!(body["file"]["format"], "csv");

    upload(&app, "/api/data", "sites.csv", SITE_METADATA_CSV).await;

    let (status, body) = send_json(&app, get("/api/data")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["cast.csv", "sites.csv"]);
}

#[tokio::test]
async fn test_upload_rejections() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let (status, body) =
        send_json(&app, upload_request("/api/data", "file", "notes.docx", b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unsupported_extension");

    let (status, body) =
        send_json(&app, upload_request("/api/data", "file", ".hidden.csv", b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_file_name");

    let (status, body) =
        send_json(&app, upload_request("/api/scripts", "file", "analysis.py", b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unsupported_extension");

    let (status, body) =
        send_json(&app, upload_request("/api/data", "attachment", "cast.csv", b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_field");
}

#[tokio::test]
async fn test_upload_too_large() {
    let tmp = temp_test_dir();
    let (app, _) = test_app_with(tmp.path(), |c| c.storage.max_upload_bytes = 1024).await;

    let big = vec![b'7'; 2048];
    let (status, body) = send_json(&app, upload_request("/api/data", "file", "big.csv", &big)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "upload_too_large");

    // beyond the request body limit as well
    let huge = vec![b'7'; 200 * 1024];
    let (status, _) = send(&app, upload_request("/api/data", "file", "huge.csv", &huge)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_delete_script() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/scripts", "qc.sh", "echo ok\n").await;

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri("/api/scripts/qc.sh")
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send_json(&app, delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted script: qc.sh");

    let (status, body) = send_json(&app, delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Script qc.sh not found.");
    assert_eq!(body["code"], "not_found");
}

// ============================================================================
// Views
// ============================================================================

#[tokio::test]
async fn test_table_preview_limit() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;

    let (status, body) = send_json(&app, get("/api/data/cast.csv/table?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["headers"], json!(["Depth", "Temperature", "Salinity", "Oxygen"]));
    assert_eq!(body["rows"].as_array().unwrap().len(), 2);
    assert_eq!(body["total_rows"], 5);
    assert_eq!(body["truncated"], true);

    let (_, body) = send_json(&app, get("/api/data/cast.csv/table")).await;
    assert_eq!(body["rows"].as_array().unwrap().len(), 5);
    assert_eq!(body["truncated"], false);
}

#[tokio::test]
async fn test_malformed_view_query() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;

    let (status, body) = send_json(&app, get("/api/data/cast.csv/table?limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) =
        send_json(&app, get("/api/data/cast.csv/chart.png?profile=maybe")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn test_summary() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;

    let (status, body) = send_json(&app, get("/api/data/cast.csv/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], 5);

    let oxygen = &body["columns"][3];
    assert_eq!(oxygen["name"], "Oxygen");
    assert_eq!(oxygen["missing"], 1);
    assert_eq!(oxygen["max"], 7.9);
}

#[tokio::test]
async fn test_chart_png() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;

    let response = app
        .clone()
        .oneshot(get("/api/data/cast.csv/chart.png?y=Temperature,Salinity&profile=true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let png = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&png[0..8], &PNG_SIGNATURE);
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    assert_eq!(width, 800);
}

#[tokio::test]
async fn test_chart_unknown_column() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;

    let (status, body) =
        send_json(&app, get("/api/data/cast.csv/chart.png?y=Turbidity")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "column_not_found");
}

#[tokio::test]
async fn test_sites_geojson() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "sites.csv", SITE_METADATA_CSV).await;

    let (status, body) = send_json(&app, get("/api/data/sites.csv/sites")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"].as_array().unwrap().len(), 3);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["features"][0]["geometry"]["coordinates"], json!([151.2153, -33.8568]));
}

#[tokio::test]
async fn test_excel_stored_but_not_displayed() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "survey.xlsx", "PK\u{3}\u{4}").await;

    let (status, body) = send_json(&app, get("/api/data/survey.xlsx/table")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unsupported_format");
}

#[tokio::test]
async fn test_view_missing_file() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let (status, body) = send_json(&app, get("/api/data/nothing.csv/summary")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Data file nothing.csv not found.");
}

// ============================================================================
// Script runs
// ============================================================================

#[tokio::test]
async fn test_run_script_with_uploaded_data() {
    let tmp = temp_test_dir();
    let (app, state) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;
    upload(&app, "/api/scripts", "echo_env.sh", ECHO_ENV_SCRIPT).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/scripts/echo_env.sh/run")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["message"], "Script executed successfully!");

    let data_dir = state.store.dir(FileKind::Data);
    let stdout = body["stdout"].as_str().unwrap();
    assert!(stdout.contains(&format!("DATA_DIR={}", data_dir.display())));
    assert!(stdout.contains(&format!("DATA_FILE={}", data_dir.join("cast.csv").display())));

    let (_, runs) = send_json(&app, get("/api/runs")).await;
    assert_eq!(runs["total_completed"], 1);
    assert_eq!(runs["recent"][0]["script"], "echo_env.sh");
}

#[tokio::test]
async fn test_run_script_with_named_inputs() {
    let tmp = temp_test_dir();
    let (app, state) = test_app(tmp.path()).await;
    upload(&app, "/api/data", "cast.csv", CTD_CAST_CSV).await;
    upload(&app, "/api/data", "sites.csv", SITE_METADATA_CSV).await;
    upload(&app, "/api/scripts", "echo_env.sh", ECHO_ENV_SCRIPT).await;

    let (status, body) = send_json(
        &app,
        post_json(
            "/api/scripts/echo_env.sh/run",
            json!({"ctd_file": "cast.csv", "site_file": "sites.csv", "args": ["--plot"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let data_dir = state.store.dir(FileKind::Data);
    let stdout = body["stdout"].as_str().unwrap();
    assert!(stdout.contains(&format!("CTD_FILE={}", data_dir.join("cast.csv").display())));
    assert!(stdout.contains(&format!("SITE_FILE={}", data_dir.join("sites.csv").display())));
    assert!(stdout.contains("ARGS=--plot"));

    let (status, body) = send_json(
        &app,
        post_json("/api/scripts/echo_env.sh/run", json!({"ctd_file": "missing.cnv"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_run_script_from_directory() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/scripts", "echo_env.sh", ECHO_ENV_SCRIPT).await;

    let survey = tmp.path().join("survey");
    std::fs::create_dir(&survey).unwrap();
    write_fixture(&survey, "cast01.csv", CTD_CAST_CSV);
    let survey = std::fs::canonicalize(&survey).unwrap();

    let (status, body) = send_json(
        &app,
        post_json(
            "/api/scripts/echo_env.sh/run",
            json!({"data_dir": survey, "data_files": ["cast01.csv"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stdout = body["stdout"].as_str().unwrap();
    assert!(stdout.contains(&format!("DATA_DIR={}", survey.display())));
    assert!(stdout.contains(&format!("DATA_FILE={}", survey.join("cast01.csv").display())));
}

#[tokio::test]
async fn test_failed_script_is_not_an_http_error() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;
    upload(&app, "/api/scripts", "fail.sh", FAILING_SCRIPT).await;

    let (status, body) =
        send_json(&app, post_json("/api/scripts/fail.sh/run", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["exit_code"], 3);
    assert!(body["stderr"].as_str().unwrap().contains("column 'Depth' missing"));
}

#[tokio::test]
async fn test_missing_interpreter() {
    let tmp = temp_test_dir();
    let (app, _) = test_app_with(tmp.path(), |c| {
        c.runner.interpreter = "no-such-interpreter-for-tests".to_string()
    })
    .await;
    upload(&app, "/api/scripts", "qc.sh", "echo ok\n").await;

    let (status, body) = send_json(&app, post_json("/api/scripts/qc.sh/run", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "interpreter_not_found");

    let (_, runs) = send_json(&app, get("/api/runs")).await;
    assert_eq!(runs["recent"][0]["status"], "error");
}

#[tokio::test]
async fn test_run_unknown_script_and_bad_body() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let (status, _) = send_json(&app, post_json("/api/scripts/nope.sh/run", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    upload(&app, "/api/scripts", "qc.sh", "echo ok\n").await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/scripts/qc.sh/run")
        .body(Body::from("{oops"))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

// ============================================================================
// Directory validation
// ============================================================================

#[tokio::test]
async fn test_validate_directory() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let survey = tmp.path().join("survey");
    std::fs::create_dir(&survey).unwrap();
    write_fixture(&survey, "cast01.cnv", "*END*\n");
    write_fixture(&survey, "notes.md", "# notes");

    let (status, body) = send_json(
        &app,
        post_json("/api/directories/validate", json!({"path": survey})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
    assert_eq!(body["files"][0]["format"], "cnv");

    let (status, _) = send_json(
        &app,
        post_json("/api/directories/validate", json!({"path": tmp.path().join("absent")})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let file = write_fixture(tmp.path(), "loose.csv", "a\n1\n");
    let (status, body) = send_json(
        &app,
        post_json("/api/directories/validate", json!({"path": file})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "not_a_directory");
}

#[tokio::test]
async fn test_validate_directory_malformed_body() {
    let tmp = temp_test_dir();
    let (app, _) = test_app(tmp.path()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/directories/validate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{oops"))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send_json(
        &app,
        post_json("/api/directories/validate", json!({"dir": "/tmp"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}
