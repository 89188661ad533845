//! Upload and upload tree queries
//!
//! The upload tree is stored as a nested set: every node carries `lft`/`rgt`
//! bounds and all descendants lie strictly inside them.

use crate::Result;
use sqlx::{Row, SqlitePool};

use super::models::{ItemTreeBounds, Permission, MODE_ARTIFACT};

/// Bounds of an item, or `None` when the item is not part of the upload
pub async fn item_tree_bounds(
    pool: &SqlitePool,
    upload_id: i64,
    item_id: i64,
) -> Result<Option<ItemTreeBounds>> {
    let row = sqlx::query(
        r#"
        SELECT uploadtree_pk, upload_fk, lft, rgt
        FROM upload_tree
        WHERE uploadtree_pk = ? AND upload_fk = ?
        "#,
    )
    .bind(item_id)
    .bind(upload_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ItemTreeBounds {
        item_id: row.get("uploadtree_pk"),
        upload_id: row.get("upload_fk"),
        left: row.get("lft"),
        right: row.get("rgt"),
    }))
}

/// Names of the visible (non-artifact) strict ancestors of a node, root first
pub async fn ancestor_names(
    pool: &SqlitePool,
    upload_id: i64,
    left: i64,
    right: i64,
) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT ufile_name
        FROM upload_tree
        WHERE upload_fk = ? AND lft < ? AND rgt > ? AND (ufile_mode & ?) = 0
        ORDER BY lft ASC
        "#,
    )
    .bind(upload_id)
    .bind(left)
    .bind(right)
    .bind(MODE_ARTIFACT)
    .fetch_all(pool)
    .await?;

    Ok(names)
}

/// Full path of an item from the upload root, artifacts left out
///
/// Returns `None` when the item does not exist.
pub async fn full_path(pool: &SqlitePool, item_id: i64) -> Result<Option<String>> {
    let row = sqlx::query(
        "SELECT upload_fk, lft, rgt, ufile_mode, ufile_name FROM upload_tree WHERE uploadtree_pk = ?",
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut parts = ancestor_names(pool, row.get("upload_fk"), row.get("lft"), row.get("rgt")).await?;
    let mode: i64 = row.get("ufile_mode");
    let name: String = row.get("ufile_name");
    if mode & MODE_ARTIFACT == 0 || parts.is_empty() {
        parts.push(name);
    }

    Ok(Some(parts.join("/")))
}

/// File name of a single item
pub async fn item_name(pool: &SqlitePool, item_id: i64) -> Result<Option<String>> {
    let name = sqlx::query_scalar::<_, String>(
        "SELECT ufile_name FROM upload_tree WHERE uploadtree_pk = ?",
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    Ok(name)
}

/// Whether the group may read the upload
///
/// Access is granted by the upload's public permission or by a
/// `perm_upload` row for the group, whichever is higher.
pub async fn is_accessible(pool: &SqlitePool, upload_id: i64, group_id: i64) -> Result<bool> {
    let perm: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(U.public_perm, COALESCE(P.perm, 0))
        FROM upload U
        LEFT JOIN perm_upload P ON P.upload_fk = U.upload_pk AND P.group_fk = ?
        WHERE U.upload_pk = ?
        "#,
    )
    .bind(group_id)
    .bind(upload_id)
    .fetch_optional(pool)
    .await?;

    Ok(perm.is_some_and(|perm| perm >= Permission::Read as i64))
}
