//! Cached Software Heritage lookups

use axum::{
    extract::{Path, State},
    Json,
};
use lcx_common::db::software_heritage;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SoftwareHeritageResponse {
    pub pfile_id: i64,
    /// License short names reported by Software Heritage
    pub license: Option<String>,
    /// HTTP status of the lookup; `None` when never looked up
    pub status: Option<i64>,
    pub ok: bool,
}

/// GET /api/software-heritage/:pfile_id
///
/// Unknown file contents are 404; known ones without a lookup have no
/// license and no status.
pub async fn software_heritage_record(
    State(state): State<AppState>,
    Path(pfile_id): Path<i64>,
) -> ApiResult<Json<SoftwareHeritageResponse>> {
    if pfile_id <= 0 {
        return Err(ApiError::BadRequest(format!("Invalid file id: {}", pfile_id)));
    }

    if !software_heritage::pfile_exists(&state.db, pfile_id).await? {
        return Err(ApiError::NotFound(format!("File {}", pfile_id)));
    }

    let record = software_heritage::software_heritage_record(&state.db, pfile_id).await?;
    Ok(Json(SoftwareHeritageResponse {
        pfile_id,
        ok: record.is_ok(),
        license: record.license,
        status: record.status,
    }))
}
