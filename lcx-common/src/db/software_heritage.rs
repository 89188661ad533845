//! Software Heritage lookup cache
//!
//! One row per file content (`pfile`) holding the license short names
//! Software Heritage reported and the HTTP status of the lookup.

use crate::Result;
use sqlx::SqlitePool;
use tracing::debug;

use super::models::SoftwareHeritageRecord;

pub const SWH_STATUS_OK: i64 = 200;
pub const SWH_BAD_REQUEST: i64 = 400;
pub const SWH_NOT_FOUND: i64 = 404;
pub const SWH_RATELIMIT_EXCEED: i64 = 429;

impl SoftwareHeritageRecord {
    /// Lookup succeeded
    pub fn is_ok(&self) -> bool {
        self.status == Some(SWH_STATUS_OK)
    }
}

/// File contents of an upload that already have a cached lookup
pub async fn software_heritage_pfiles(pool: &SqlitePool, upload_id: i64) -> Result<Vec<i64>> {
    let pfiles = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT DISTINCT SWH.pfile_fk
        FROM upload_tree UT
        INNER JOIN software_heritage SWH ON SWH.pfile_fk = UT.pfile_fk
        WHERE UT.upload_fk = ?
        ORDER BY SWH.pfile_fk
        "#,
    )
    .bind(upload_id)
    .fetch_all(pool)
    .await?;

    Ok(pfiles)
}

/// Store the lookup result for a file content
///
/// A newer lookup replaces the cached one. Returns whether a row was written.
pub async fn set_software_heritage_details(
    pool: &SqlitePool,
    pfile_id: i64,
    shortnames: &str,
    status: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO software_heritage (pfile_fk, swh_shortnames, swh_status)
        VALUES (?, ?, ?)
        ON CONFLICT(pfile_fk) DO UPDATE SET
            swh_shortnames = excluded.swh_shortnames,
            swh_status = excluded.swh_status
        "#,
    )
    .bind(pfile_id)
    .bind(shortnames)
    .bind(status)
    .execute(pool)
    .await?;

    debug!(pfile_id, status, "Stored Software Heritage details");
    Ok(result.rows_affected() > 0)
}

/// Whether a file content with this id is known
pub async fn pfile_exists(pool: &SqlitePool, pfile_id: i64) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM pfile WHERE pfile_pk = ?")
        .bind(pfile_id)
        .fetch_optional(pool)
        .await?;

    Ok(found.is_some())
}

/// Cached lookup for a file content; both fields are `None` when never looked up
pub async fn software_heritage_record(
    pool: &SqlitePool,
    pfile_id: i64,
) -> Result<SoftwareHeritageRecord> {
    let row = sqlx::query_as::<_, (Option<String>, Option<i64>)>(
        "SELECT swh_shortnames, swh_status FROM software_heritage WHERE pfile_fk = ?",
    )
    .bind(pfile_id)
    .fetch_optional(pool)
    .await?;

    Ok(row
        .map(|(license, status)| SoftwareHeritageRecord { license, status })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::*;

    #[tokio::test]
    async fn test_missing_record_is_empty() {
        let pool = sample_pool().await;

        let record = software_heritage_record(&pool, 1).await.unwrap();
        assert_eq!(record, SoftwareHeritageRecord::default());
        assert!(!record.is_ok());
    }

    #[tokio::test]
    async fn test_pfile_exists() {
        let pool = sample_pool().await;

        assert!(pfile_exists(&pool, 1).await.unwrap());
        assert!(!pfile_exists(&pool, 999).await.unwrap());
    }

    #[tokio::test]
    async fn test_store_and_replace() {
        let pool = sample_pool().await;

        set_software_heritage_details(&pool, 1, "", SWH_BAD_REQUEST).await.unwrap();
        assert!(!software_heritage_record(&pool, 1).await.unwrap().is_ok());

        assert!(set_software_heritage_details(&pool, 1, "MIT", SWH_RATELIMIT_EXCEED).await.unwrap());
        let record = software_heritage_record(&pool, 1).await.unwrap();
        assert_eq!(record.status, Some(SWH_RATELIMIT_EXCEED));
        assert!(!record.is_ok());

        assert!(set_software_heritage_details(&pool, 1, "MIT, BSD-3-Clause", SWH_STATUS_OK).await.unwrap());
        let record = software_heritage_record(&pool, 1).await.unwrap();
        assert_eq!(record.license.as_deref(), Some("MIT, BSD-3-Clause"));
        assert!(record.is_ok());
    }

    #[tokio::test]
    async fn test_pfiles_of_upload() {
        let pool = sample_pool().await;
        assert!(software_heritage_pfiles(&pool, SAMPLE_UPLOAD).await.unwrap().is_empty());

        set_software_heritage_details(&pool, 2, "GPL-2.0", SWH_STATUS_OK).await.unwrap();
        set_software_heritage_details(&pool, 1, "", SWH_NOT_FOUND).await.unwrap();
        // Content not in the sample upload
        sqlx::query("INSERT INTO pfile (pfile_pk, pfile_sha1) VALUES (900, 'zz')")
            .execute(&pool)
            .await
            .unwrap();
        set_software_heritage_details(&pool, 900, "MIT", SWH_STATUS_OK).await.unwrap();

        assert_eq!(software_heritage_pfiles(&pool, SAMPLE_UPLOAD).await.unwrap(), vec![1, 2]);
    }
}
