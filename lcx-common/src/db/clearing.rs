//! Clearing decision queries

use std::collections::HashMap;

use crate::Result;
use sqlx::{Row, SqlitePool};

use super::models::{ClearingDecision, ClearingLicense, DecisionScope, DecisionType, ItemTreeBounds};

/// All clearing decisions of a group that apply to items under `bounds`
///
/// Item-scoped decisions attach to the item they were made on; repository
/// scoped decisions attach to every item sharing the decided file content.
/// Decisions are returned newest first.
pub async fn file_clearings_folder(
    pool: &SqlitePool,
    bounds: &ItemTreeBounds,
    group_id: i64,
) -> Result<Vec<ClearingDecision>> {
    let rows = sqlx::query(
        r#"
        SELECT UT.uploadtree_pk AS item_id,
               CD.clearing_decision_pk,
               CD.pfile_fk,
               CD.decision_type,
               CD.scope
        FROM upload_tree UT
        INNER JOIN clearing_decision CD
            ON (CD.scope = 0 AND CD.uploadtree_fk = UT.uploadtree_pk)
            OR (CD.scope = 1 AND CD.pfile_fk = UT.pfile_fk)
        WHERE UT.upload_fk = ? AND UT.lft BETWEEN ? AND ? AND CD.group_fk = ?
        ORDER BY CD.date_added DESC, CD.clearing_decision_pk DESC
        "#,
    )
    .bind(bounds.upload_id)
    .bind(bounds.left)
    .bind(bounds.right)
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    let mut decisions = Vec::with_capacity(rows.len());
    for row in rows {
        let raw_type: i64 = row.get("decision_type");
        // Unknown decision types are not meaningful for exports
        let Some(decision_type) = DecisionType::from_i64(raw_type) else {
            continue;
        };
        decisions.push(ClearingDecision {
            decision_id: row.get("clearing_decision_pk"),
            item_id: row.get("item_id"),
            pfile_id: row.get("pfile_fk"),
            decision_type,
            scope: DecisionScope::from_i64(row.get("scope")),
            licenses: Vec::new(),
        });
    }

    if decisions.is_empty() {
        return Ok(decisions);
    }

    // A repository decision yields one row per matching item
    let events = decision_licenses(pool, bounds, group_id).await?;
    for decision in &mut decisions {
        if let Some(licenses) = events.get(&decision.decision_id) {
            decision.licenses = licenses.clone();
        }
    }

    Ok(decisions)
}

/// License events of the decisions `file_clearings_folder` selects
///
/// The decisions are matched again in SQL, so the number of decisions is
/// not limited by the bound parameter count.
async fn decision_licenses(
    pool: &SqlitePool,
    bounds: &ItemTreeBounds,
    group_id: i64,
) -> Result<HashMap<i64, Vec<ClearingLicense>>> {
    let rows = sqlx::query(
        r#"
        SELECT CE.clearing_decision_fk, LR.rf_shortname, CE.removed
        FROM clearing_event CE
        INNER JOIN license_ref LR ON LR.rf_pk = CE.rf_fk
        WHERE CE.clearing_decision_fk IN (
            SELECT CD.clearing_decision_pk
            FROM upload_tree UT
            INNER JOIN clearing_decision CD
                ON (CD.scope = 0 AND CD.uploadtree_fk = UT.uploadtree_pk)
                OR (CD.scope = 1 AND CD.pfile_fk = UT.pfile_fk)
            WHERE UT.upload_fk = ? AND UT.lft BETWEEN ? AND ? AND CD.group_fk = ?
        )
        ORDER BY CE.clearing_event_pk ASC
        "#,
    )
    .bind(bounds.upload_id)
    .bind(bounds.left)
    .bind(bounds.right)
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    let mut licenses: HashMap<i64, Vec<ClearingLicense>> = HashMap::new();
    for row in rows {
        let decision_id: i64 = row.get("clearing_decision_fk");
        let removed: i64 = row.get("removed");
        licenses.entry(decision_id).or_default().push(ClearingLicense {
            short_name: row.get("rf_shortname"),
            removed: removed != 0,
        });
    }

    Ok(licenses)
}
