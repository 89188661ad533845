//! License list: scanner findings and conclusions per file path

use lcx_common::db::license::LicenseListOptions;
use lcx_common::db::{AgentId, ItemTreeBounds, LicenseFindings, LicensesPerFile};
use lcx_common::Result;
use tracing::debug;

use super::LicenseLine;
use crate::decision_filter::DecisionFilter;
use crate::row_cap::TakeWithWarning;
use crate::sources::FindingsSource;

/// License lines for an item and whether the row limit cut them short
pub async fn create_list_of_lines(
    findings: &dyn FindingsSource,
    filter: &dyn DecisionFilter,
    bounds: &ItemTreeBounds,
    group_id: i64,
    agent_ids: &[AgentId],
    options: &LicenseListOptions<'_>,
    row_limit: Option<usize>,
) -> Result<(Vec<LicenseLine>, bool)> {
    let decisions = findings.clearing_decisions(bounds, group_id).await?;
    let concluded = filter.for_license_list(&decisions);
    let per_file = findings
        .licenses_per_file(bounds, agent_ids, options, &concluded)
        .await?;

    debug!(
        item_id = bounds.item_id,
        paths = per_file.len(),
        decisions = decisions.len(),
        "Collected license findings"
    );

    Ok(build_lines(per_file, options.ignore_empty_containers, row_limit))
}

/// Turn findings into output lines
///
/// Only files with findings count against the limit. Files nothing is
/// known about are listed without findings unless `ignore` is set; files a
/// scanner processed without result are not listed.
pub fn build_lines(
    per_file: LicensesPerFile,
    ignore: bool,
    row_limit: Option<usize>,
) -> (Vec<LicenseLine>, bool) {
    let mut take = TakeWithWarning::new(row_limit);

    for (file_path, licenses) in per_file {
        match licenses {
            LicenseFindings::Present {
                scan_results,
                concluded_results,
            } => {
                let conclusions = concluded_results
                    .map(|layers| consolidate_conclusions(&layers))
                    .filter(|conclusions| !conclusions.is_empty());
                let line = LicenseLine {
                    file_path,
                    agent_findings: Some(scan_results),
                    conclusions,
                };
                if !take.push(line) {
                    break;
                }
            }
            LicenseFindings::NoResult if !ignore => take.push_uncounted(LicenseLine {
                file_path,
                agent_findings: None,
                conclusions: None,
            }),
            LicenseFindings::NoResult | LicenseFindings::Empty => {}
        }
    }

    take.into_inner()
}

/// Flatten conclusion layers into unique names, first occurrence first
pub fn consolidate_conclusions(layers: &[Vec<String>]) -> Vec<String> {
    let mut consolidated: Vec<String> = Vec::new();
    for name in layers.iter().flatten() {
        if !consolidated.contains(name) {
            consolidated.push(name.clone());
        }
    }
    consolidated
}
