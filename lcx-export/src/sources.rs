//! Data sources the export pipeline reads from
//!
//! The aggregators only see these traits; `SqliteSources` backs them with
//! the lcx-common queries and tests substitute in-memory fakes.

use async_trait::async_trait;
use lcx_common::db::license::LicenseListOptions;
use lcx_common::db::{
    agent, clearing, copyright, license, upload, AgentId, ClearingDecision, ConcludedLicenses,
    CopyrightEntry, ItemTreeBounds, LicensesPerFile,
};
use lcx_common::Result;
use sqlx::SqlitePool;

/// Upload tree navigation and access checks
#[async_trait]
pub trait TreeLookup: Send + Sync {
    async fn item_bounds(&self, upload_id: i64, item_id: i64) -> Result<Option<ItemTreeBounds>>;

    /// Path from the upload root, artifacts left out
    async fn full_path(&self, item_id: i64) -> Result<Option<String>>;

    async fn item_name(&self, item_id: i64) -> Result<Option<String>>;

    async fn is_accessible(&self, upload_id: i64, group_id: i64) -> Result<bool>;
}

/// Scanner results and reviewer decisions
#[async_trait]
pub trait FindingsSource: Send + Sync {
    /// Agent id of the latest successful run of a scanner on the upload
    async fn latest_agent_run(&self, agent_name: &str, upload_id: i64) -> Result<Option<AgentId>>;

    async fn clearing_decisions(
        &self,
        bounds: &ItemTreeBounds,
        group_id: i64,
    ) -> Result<Vec<ClearingDecision>>;

    async fn licenses_per_file(
        &self,
        bounds: &ItemTreeBounds,
        agent_ids: &[AgentId],
        options: &LicenseListOptions<'_>,
        concluded: &ConcludedLicenses,
    ) -> Result<LicensesPerFile>;

    async fn copyright_scanner_entries(
        &self,
        bounds: &ItemTreeBounds,
        agent_id: AgentId,
        exclude: &str,
    ) -> Result<Vec<CopyrightEntry>>;

    async fn copyright_edited_entries(
        &self,
        bounds: &ItemTreeBounds,
        exclude: &str,
    ) -> Result<Vec<CopyrightEntry>>;
}

/// Both sources over one SQLite pool
#[derive(Clone)]
pub struct SqliteSources {
    pool: SqlitePool,
}

impl SqliteSources {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TreeLookup for SqliteSources {
    async fn item_bounds(&self, upload_id: i64, item_id: i64) -> Result<Option<ItemTreeBounds>> {
        upload::item_tree_bounds(&self.pool, upload_id, item_id).await
    }

    async fn full_path(&self, item_id: i64) -> Result<Option<String>> {
        upload::full_path(&self.pool, item_id).await
    }

    async fn item_name(&self, item_id: i64) -> Result<Option<String>> {
        upload::item_name(&self.pool, item_id).await
    }

    async fn is_accessible(&self, upload_id: i64, group_id: i64) -> Result<bool> {
        upload::is_accessible(&self.pool, upload_id, group_id).await
    }
}

#[async_trait]
impl FindingsSource for SqliteSources {
    async fn latest_agent_run(&self, agent_name: &str, upload_id: i64) -> Result<Option<AgentId>> {
        agent::latest_successful_agent(&self.pool, agent_name, upload_id).await
    }

    async fn clearing_decisions(
        &self,
        bounds: &ItemTreeBounds,
        group_id: i64,
    ) -> Result<Vec<ClearingDecision>> {
        clearing::file_clearings_folder(&self.pool, bounds, group_id).await
    }

    async fn licenses_per_file(
        &self,
        bounds: &ItemTreeBounds,
        agent_ids: &[AgentId],
        options: &LicenseListOptions<'_>,
        concluded: &ConcludedLicenses,
    ) -> Result<LicensesPerFile> {
        license::licenses_per_file_name(&self.pool, bounds, agent_ids, options, concluded).await
    }

    async fn copyright_scanner_entries(
        &self,
        bounds: &ItemTreeBounds,
        agent_id: AgentId,
        exclude: &str,
    ) -> Result<Vec<CopyrightEntry>> {
        copyright::scanner_entries(&self.pool, bounds, agent_id, exclude).await
    }

    async fn copyright_edited_entries(
        &self,
        bounds: &ItemTreeBounds,
        exclude: &str,
    ) -> Result<Vec<CopyrightEntry>> {
        copyright::edited_entries(&self.pool, bounds, exclude).await
    }
}
