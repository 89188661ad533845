//! Integration tests for lcx-export API endpoints
//!
//! Each test drives the router with `oneshot` against an in-memory
//! database holding the sample upload.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use lcx_common::config::ExportConfig;
use lcx_common::db::fixtures::{sample_pool, SAMPLE_GROUP};
use lcx_common::db::software_heritage::{set_software_heritage_details, SWH_STATUS_OK};
use lcx_common::db::sysconfig::{set_sysconfig, LIST_ROW_LIMIT_KEY};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method
use lcx_export::{build_router, AppState};

/// Test helper: app over `pool` with the default group set to the sample group
fn setup_app(pool: SqlitePool, export: ExportConfig) -> axum::Router {
    let export = ExportConfig {
        default_group_id: SAMPLE_GROUP,
        ..export
    };
    build_router(AppState::new(pool, export))
}

async fn default_app() -> axum::Router {
    setup_app(sample_pool().await, ExportConfig::default())
}

fn test_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

const LICENSE_QUERY: &str =
    "/api/export-list?upload=1&item=1&agentToInclude_nomos=1&agentToInclude_monk=1";

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = default_app().await;

    let response = app.oneshot(test_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lcx-export");
    assert!(body["version"].is_string());
}

// =============================================================================
// Export list
// =============================================================================

#[tokio::test]
async fn test_missing_ids_return_no_content() {
    for uri in [
        "/api/export-list",
        "/api/export-list?upload=1",
        "/api/export-list?item=1",
        "/api/export-list?upload=abc&item=1",
    ] {
        let app = default_app().await;
        let response = app.oneshot(test_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT, "{}", uri);
    }
}

#[tokio::test]
async fn test_permission_denied() {
    let app = default_app().await;
    let request = Request::builder()
        .uri(LICENSE_QUERY)
        .header("X-Group-Id", "42")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["message"], "Permission Denied");
}

#[tokio::test]
async fn test_license_display() {
    let app = default_app().await;

    let response = app.oneshot(test_request(LICENSE_QUERY)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["warnings"], Value::Array(vec![]));
    assert_eq!(
        body["list_output"],
        "sample.tar/src/a.c: MIT\nsample.tar/src/b.c: , GPL-2.0\nsample.tar/README: No_license_found\n"
    );
    assert_eq!(body["form"]["agents_included"][0], "nomos");
    assert_eq!(body["form"]["include_subfolder"], true);
}

#[tokio::test]
async fn test_show_containers_lists_unknown_files() {
    let app = default_app().await;

    let uri = format!("{}&showContainers=yes", LICENSE_QUERY);
    let response = app.oneshot(test_request(&uri)).await.unwrap();
    let body = extract_json(response.into_body()).await;

    let output = body["list_output"].as_str().unwrap();
    assert!(output.starts_with("sample.tar\nsample.tar/src\n"));
    assert!(output.contains("sample.tar/src/c.c\n"));
}

#[tokio::test]
async fn test_top_folder_only_on_upload_root() {
    let app = default_app().await;

    let uri = format!("{}&doNotIncludeSubfolder=yes", LICENSE_QUERY);
    let response = app.oneshot(test_request(&uri)).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["list_output"], "sample.tar/README: No_license_found\n");
    assert_eq!(body["form"]["include_subfolder"], false);
}

#[tokio::test]
async fn test_row_limit_from_database() {
    let pool = sample_pool().await;
    set_sysconfig(&pool, LIST_ROW_LIMIT_KEY, "2").await.unwrap();
    let app = setup_app(pool, ExportConfig::default());

    let response = app.oneshot(test_request(LICENSE_QUERY)).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(
        body["list_output"],
        "sample.tar/src/a.c: MIT\nsample.tar/src/b.c: , GPL-2.0\n"
    );
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("first 2 lines"));
}

#[tokio::test]
async fn test_unknown_agent_run_warns() {
    let app = default_app().await;

    let response = app
        .oneshot(test_request("/api/export-list?upload=1&item=1&agentToInclude_ninka=1"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    let warnings: Vec<&str> = body["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(warnings[0], "No information for agent: ninka");
}

#[tokio::test]
async fn test_empty_item_reports_empty_result() {
    let app = default_app().await;

    let response = app
        .oneshot(test_request(
            "/api/export-list?upload=1&item=8&agentToInclude_nomos=1",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["list_output"], "");
    assert_eq!(body["warnings"][0], "Result empty");
}

#[tokio::test]
async fn test_copyright_display() {
    let app = default_app().await;

    let response = app
        .oneshot(test_request(
            "/api/export-list?upload=1&item=1&export_copy=yes&copyright_type=all",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(
        body["list_output"],
        "sample.tar/src/a.c: Copyright (c) 2020 Alice\n\
         sample.tar/src/b.c: Copyright Carol &amp; Co\n\
         sample.tar/README: Copyright (C) Bob &lt;bob@example.com&gt;\n\
         sample.tar/src/c.c: Copyright Dave\n"
    );
    assert_eq!(body["form"]["copyright_type"], "all");
}

#[tokio::test]
async fn test_license_download() {
    let app = default_app().await;

    let uri = format!("{}&output=dltext", LICENSE_QUERY);
    let response = app.oneshot(test_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=UTF-8");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"sample.tar-"));
    assert!(disposition.ends_with("-licenses.csv\""));
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "no-cache, must-revalidate, maxage=1, post-check=0, pre-check=0"
    );

    let csv = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert_eq!(
        csv,
        "\"file path\",\"scan results\",\"concluded results\"\n\
         \"sample.tar/src/a.c\",\"MIT\",\"\"\n\
         \"sample.tar/src/b.c\",\"\",\"GPL-2.0\"\n\
         \"sample.tar/README\",\"No_license_found\",\"\"\n"
    );
}

#[tokio::test]
async fn test_copyright_download_with_custom_csv_format() {
    let export = ExportConfig {
        delimiter: ";".to_string(),
        enclosure: "'".to_string(),
        ..ExportConfig::default()
    };
    let app = setup_app(sample_pool().await, export);

    let response = app
        .oneshot(test_request(
            "/api/export-list?upload=1&item=3&export_copy=yes&copyright_type=nolic&output=dltext",
        ))
        .await
        .unwrap();
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.ends_with("-copyrights.csv\""));
    assert!(disposition.starts_with("attachment; filename=\"src-"));

    let csv = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert_eq!(
        csv,
        "'file path';'copyright'\n'sample.tar/src/c.c';'Copyright Dave'\n"
    );
}

// =============================================================================
// Licenses and Software Heritage
// =============================================================================

#[tokio::test]
async fn test_license_listing() {
    let app = default_app().await;

    let response = app.oneshot(test_request("/api/licenses")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|license| license["short_name"].as_str())
        .collect();
    assert_eq!(names, vec!["Apache-2.0", "GPL-2.0", "MIT", "No_license_found", "Void"]);
}

#[tokio::test]
async fn test_software_heritage_record() {
    let pool = sample_pool().await;
    set_software_heritage_details(&pool, 1, "MIT", SWH_STATUS_OK)
        .await
        .unwrap();
    let app = setup_app(pool, ExportConfig::default());

    let response = app
        .clone()
        .oneshot(test_request("/api/software-heritage/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["license"], "MIT");
    assert_eq!(body["status"], 200);
    assert_eq!(body["ok"], true);

    let response = app
        .oneshot(test_request("/api/software-heritage/2"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["license"], Value::Null);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_software_heritage_unknown_file() {
    let app = default_app().await;

    let response = app
        .oneshot(test_request("/api/software-heritage/999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_software_heritage_rejects_bad_id() {
    let app = default_app().await;

    let response = app
        .oneshot(test_request("/api/software-heritage/0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
