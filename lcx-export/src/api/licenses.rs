//! License reference listing

use axum::{extract::State, Json};
use lcx_common::db::license::license_refs;
use lcx_common::db::LicenseRef;

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/licenses
///
/// All known licenses ordered by short name.
pub async fn list_licenses(State(state): State<AppState>) -> ApiResult<Json<Vec<LicenseRef>>> {
    let refs = license_refs(&state.db).await?;
    Ok(Json(refs))
}
