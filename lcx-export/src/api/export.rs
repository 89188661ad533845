//! Export list endpoint

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use lcx_common::config::{row_limit_from, ExportConfig};
use lcx_common::db::sysconfig;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::export::{ExportContext, ExportForm, ExportOutcome, ExportRequest};
use crate::AppState;

/// Header carrying the caller's group id
pub const GROUP_HEADER: &str = "x-group-id";

/// Display response body
#[derive(Debug, Serialize)]
pub struct ExportListResponse {
    pub warnings: Vec<String>,
    pub list_output: String,
    pub form: ExportForm,
}

/// GET /api/export-list
///
/// Query parameters: `upload`, `item`, `agentToInclude_<agent>`,
/// `export_copy`, `copyright_type`, `doNotIncludeSubfolder`,
/// `showContainers`, `exclude`, `output`.
pub async fn export_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let request = ExportRequest::from_query(&params);
    if request.upload_id.is_none() || request.item_id.is_none() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let group_id = group_id(&headers, state.export.default_group_id);
    let context = ExportContext {
        group_id,
        row_limit: resolve_row_limit(&state.db, &state.export).await?,
        today: Local::now().date_naive(),
    };

    match state.service.run(&request, context).await? {
        ExportOutcome::NoContent => Ok(StatusCode::NO_CONTENT.into_response()),
        ExportOutcome::PermissionDenied => Err(ApiError::Forbidden("Permission Denied".to_string())),
        ExportOutcome::Display {
            warnings,
            list_output,
            form,
        } => Ok(Json(ExportListResponse {
            warnings,
            list_output,
            form,
        })
        .into_response()),
        ExportOutcome::Download {
            warnings,
            file_name,
            csv,
        } => {
            debug!(file_name = %file_name, ?warnings, "Sending CSV export");
            csv_response(&file_name, csv)
        }
    }
}

/// Group id from the request header, else the configured default
fn group_id(headers: &HeaderMap, default_group_id: i64) -> i64 {
    headers
        .get(GROUP_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default_group_id)
}

/// Row limit from the database, falling back to the configuration
pub async fn resolve_row_limit(
    pool: &SqlitePool,
    config: &ExportConfig,
) -> lcx_common::Result<Option<usize>> {
    Ok(match sysconfig::list_row_limit(pool).await? {
        Some(limit) => row_limit_from(limit),
        None => config.row_limit(),
    })
}

/// `attachment` disposition with a quoted file name
///
/// Control characters, quotes and backslashes in item names become `_`.
fn content_disposition(file_name: &str) -> String {
    let file_name: String = file_name
        .chars()
        .map(|c| if c.is_control() || c == '"' || c == '\\' { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{}\"", file_name)
}

fn csv_response(file_name: &str, csv: Vec<u8>) -> ApiResult<Response> {
    let disposition = HeaderValue::from_str(&content_disposition(file_name))
        .map_err(|e| ApiError::Internal(format!("Invalid download file name: {}", e)))?;

    let mut response = (StatusCode::OK, csv).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=UTF-8"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, must-revalidate, maxage=1, post-check=0, pre-check=0"),
    );
    headers.insert(
        header::EXPIRES,
        HeaderValue::from_static("Thu, 19 Nov 1981 08:52:00 GMT"),
    );
    Ok(response)
}
