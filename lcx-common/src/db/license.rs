//! License findings per file
//!
//! Joins the upload tree with scanner license rows of the selected agents
//! and the clearing conclusions computed by the caller, producing one
//! [`LicenseFindings`] per visible file path.

use std::collections::HashMap;

use crate::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use super::models::{
    AgentId, ConcludedLicenses, ItemTreeBounds, LicenseFindings, LicenseRef, LicensesPerFile,
    MODE_ARTIFACT, MODE_CONTAINER, MODE_DIRECTORY,
};
use super::upload::ancestor_names;

/// Options narrowing which items are listed
#[derive(Debug, Clone, Default)]
pub struct LicenseListOptions<'a> {
    /// Descend below the direct children of the item. Children of
    /// artifacts count as direct children of the artifact's parent.
    pub include_subfolders: bool,
    /// Skip items whose path contains this string (empty = no exclusion)
    pub exclude: &'a str,
    /// Leave out directories and containers that carry no result
    pub ignore_empty_containers: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct TreeLicenseRow {
    uploadtree_pk: i64,
    ufile_name: String,
    ufile_mode: i64,
    lft: i64,
    rgt: i64,
    fl_pk: Option<i64>,
    rf_shortname: Option<String>,
}

/// One upload tree item with its scanner rows folded together
#[derive(Debug)]
struct TreeItem {
    item_id: i64,
    name: String,
    mode: i64,
    lft: i64,
    rgt: i64,
    scanned: bool,
    short_names: Vec<String>,
}

/// License findings for every item under `bounds`, keyed by path
///
/// Paths start at the upload root and leave artifact entries out. Entries
/// keep upload tree order; an item whose path is already listed is merged
/// into the existing entry.
pub async fn licenses_per_file_name(
    pool: &SqlitePool,
    bounds: &ItemTreeBounds,
    agent_ids: &[AgentId],
    options: &LicenseListOptions<'_>,
    concluded: &ConcludedLicenses,
) -> Result<LicensesPerFile> {
    let rows = fetch_tree_license_rows(pool, bounds, agent_ids).await?;
    let items = fold_rows(rows);
    let prefix = ancestor_names(pool, bounds.upload_id, bounds.left, bounds.right).await?;

    let mut result: LicensesPerFile = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    // Open ancestors: (rgt, item id, visible name)
    let mut stack: Vec<(i64, i64, Option<String>)> = Vec::new();

    for item in items {
        while stack.last().is_some_and(|(rgt, _, _)| *rgt < item.lft) {
            stack.pop();
        }

        // Nearest ancestor inside the subtree that is not an artifact
        let visible_parent = stack
            .iter()
            .rev()
            .find_map(|(_, id, name)| name.as_ref().map(|_| *id));

        let is_artifact = item.mode & MODE_ARTIFACT != 0;
        stack.push((item.rgt, item.item_id, (!is_artifact).then(|| item.name.clone())));
        if is_artifact {
            continue;
        }

        let top_level = item.item_id == bounds.item_id
            || visible_parent.map_or(true, |parent| parent == bounds.item_id);
        if !options.include_subfolders && !top_level {
            continue;
        }

        let path = prefix
            .iter()
            .map(String::as_str)
            .chain(stack.iter().filter_map(|(_, _, name)| name.as_deref()))
            .collect::<Vec<_>>()
            .join("/");

        if !options.exclude.is_empty() && format!("/{}", path).contains(options.exclude) {
            continue;
        }

        let findings = classify(&item, concluded.get(&item.item_id));
        let is_folder = item.mode & (MODE_DIRECTORY | MODE_CONTAINER) != 0;
        if options.ignore_empty_containers && is_folder && findings == LicenseFindings::NoResult {
            continue;
        }

        match positions.get(&path) {
            Some(&index) => merge(&mut result[index].1, findings),
            None => {
                positions.insert(path.clone(), result.len());
                result.push((path, findings));
            }
        }
    }

    debug!(
        item_id = bounds.item_id,
        agents = agent_ids.len(),
        entries = result.len(),
        "Collected license findings per file"
    );

    Ok(result)
}

async fn fetch_tree_license_rows(
    pool: &SqlitePool,
    bounds: &ItemTreeBounds,
    agent_ids: &[AgentId],
) -> Result<Vec<TreeLicenseRow>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT UT.uploadtree_pk, UT.ufile_name, UT.ufile_mode, UT.lft, UT.rgt, \
         LF.fl_pk, LR.rf_shortname \
         FROM upload_tree UT \
         LEFT JOIN license_file LF ON LF.pfile_fk = UT.pfile_fk AND ",
    );

    if agent_ids.is_empty() {
        query.push("0");
    } else {
        query.push("LF.agent_fk IN (");
        let mut separated = query.separated(", ");
        for agent_id in agent_ids {
            separated.push_bind(*agent_id);
        }
        separated.push_unseparated(")");
    }

    query.push(" LEFT JOIN license_ref LR ON LR.rf_pk = LF.rf_fk WHERE UT.upload_fk = ");
    query.push_bind(bounds.upload_id);
    query.push(" AND UT.lft BETWEEN ");
    query.push_bind(bounds.left);
    query.push(" AND ");
    query.push_bind(bounds.right);


    query.push(" ORDER BY UT.lft ASC, LR.rf_shortname ASC");

    let rows = query
        .build_query_as::<TreeLicenseRow>()
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Fold consecutive rows of the same item (one row per scanner finding)
fn fold_rows(rows: Vec<TreeLicenseRow>) -> Vec<TreeItem> {
    let mut items: Vec<TreeItem> = Vec::new();

    for row in rows {
        let starts_item = items
            .last()
            .map_or(true, |last| last.item_id != row.uploadtree_pk);
        if starts_item {
            items.push(TreeItem {
                item_id: row.uploadtree_pk,
                name: row.ufile_name,
                mode: row.ufile_mode,
                lft: row.lft,
                rgt: row.rgt,
                scanned: false,
                short_names: Vec::new(),
            });
        }
        let Some(item) = items.last_mut() else {
            continue;
        };

        if row.fl_pk.is_some() {
            item.scanned = true;
        }
        if let Some(short_name) = row.rf_shortname {
            if !item.short_names.contains(&short_name) {
                item.short_names.push(short_name);
            }
        }
    }

    items
}

fn classify(item: &TreeItem, concluded: Option<&Vec<Vec<String>>>) -> LicenseFindings {
    if !item.short_names.is_empty() || concluded.is_some() {
        LicenseFindings::Present {
            scan_results: item.short_names.clone(),
            concluded_results: concluded.cloned(),
        }
    } else if item.scanned {
        LicenseFindings::Empty
    } else {
        LicenseFindings::NoResult
    }
}

fn merge(existing: &mut LicenseFindings, incoming: LicenseFindings) {
    match incoming {
        LicenseFindings::NoResult => {}
        LicenseFindings::Empty => {
            if *existing == LicenseFindings::NoResult {
                *existing = LicenseFindings::Empty;
            }
        }
        LicenseFindings::Present {
            scan_results: more_results,
            concluded_results: more_concluded,
        } => {
            if let LicenseFindings::Present {
                scan_results,
                concluded_results,
            } = existing
            {
                for name in more_results {
                    if !scan_results.contains(&name) {
                        scan_results.push(name);
                    }
                }
                if let Some(more) = more_concluded {
                    concluded_results.get_or_insert_with(Vec::new).extend(more);
                }
            } else {
                *existing = LicenseFindings::Present {
                    scan_results: more_results,
                    concluded_results: more_concluded,
                };
            }
        }
    }
}

/// All license references ordered by short name
pub async fn license_refs(pool: &SqlitePool) -> Result<Vec<LicenseRef>> {
    let refs = sqlx::query_as::<_, LicenseRef>(
        r#"
        SELECT rf_pk AS id, rf_shortname AS short_name, rf_fullname AS full_name
        FROM license_ref
        ORDER BY rf_shortname ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(refs)
}
