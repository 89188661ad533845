//! Copyright finding queries
//!
//! Two sources feed the copyright export: statements found by the
//! copyright scanner and statements edited by reviewers
//! (`copyright_decision`). Both are returned in upload tree order.

use crate::Result;
use sqlx::SqlitePool;

use super::models::{AgentId, CopyrightEntry, ItemTreeBounds};

/// Enabled scanner statements of one copyright agent run under `bounds`
///
/// Rows whose file name contains a non-empty `exclude` are skipped.
pub async fn scanner_entries(
    pool: &SqlitePool,
    bounds: &ItemTreeBounds,
    agent_id: AgentId,
    exclude: &str,
) -> Result<Vec<CopyrightEntry>> {
    let entries = sqlx::query_as::<_, CopyrightEntry>(
        r#"
        SELECT UT.uploadtree_pk AS item_id, C.content AS text
        FROM copyright C
        INNER JOIN upload_tree UT ON UT.pfile_fk = C.pfile_fk
        WHERE UT.upload_fk = ?
          AND UT.lft BETWEEN ? AND ?
          AND C.agent_fk = ?
          AND C.is_enabled = 1
          AND C.content IS NOT NULL AND C.content != ''
          AND (? = '' OR instr(UT.ufile_name, ?) = 0)
        ORDER BY UT.lft ASC, C.ct_pk ASC
        "#,
    )
    .bind(bounds.upload_id)
    .bind(bounds.left)
    .bind(bounds.right)
    .bind(agent_id)
    .bind(exclude)
    .bind(exclude)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Enabled reviewer-edited statements under `bounds`
pub async fn edited_entries(
    pool: &SqlitePool,
    bounds: &ItemTreeBounds,
    exclude: &str,
) -> Result<Vec<CopyrightEntry>> {
    let entries = sqlx::query_as::<_, CopyrightEntry>(
        r#"
        SELECT UT.uploadtree_pk AS item_id, CD.textfinding AS text
        FROM copyright_decision CD
        INNER JOIN upload_tree UT ON UT.pfile_fk = CD.pfile_fk
        WHERE UT.upload_fk = ?
          AND UT.lft BETWEEN ? AND ?
          AND CD.is_enabled = 1
          AND (? = '' OR instr(UT.ufile_name, ?) = 0)
        ORDER BY UT.lft ASC, CD.copyright_decision_pk ASC
        "#,
    )
    .bind(bounds.upload_id)
    .bind(bounds.left)
    .bind(bounds.right)
    .bind(exclude)
    .bind(exclude)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
