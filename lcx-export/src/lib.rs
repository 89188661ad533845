//! lcx-export library - license and copyright export lists
//!
//! Serves per-file license findings and copyright statements of an upload
//! as browser text or CSV downloads.

use axum::Router;
use lcx_common::config::ExportConfig;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod decision_filter;
pub mod error;
pub mod export;
pub mod row_cap;
pub mod sources;

use export::format::CsvFormat;
use export::ExportService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// `[export]` settings from config.toml
    pub export: ExportConfig,
    pub service: ExportService,
}

impl AppState {
    /// Create new application state backed by `db`
    pub fn new(db: SqlitePool, export: ExportConfig) -> Self {
        let csv_format = CsvFormat {
            delimiter: export.delimiter_byte(),
            enclosure: export.enclosure_byte(),
        };
        let service = ExportService::sqlite(db.clone(), csv_format);
        Self {
            db,
            export,
            service,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/api/export-list", get(api::export_list))
        .route("/api/licenses", get(api::list_licenses))
        .route("/api/software-heritage/:pfile_id", get(api::software_heritage_record))
        .merge(api::health_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
