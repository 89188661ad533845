//! Export list pipeline
//!
//! A request names an upload and an item inside it. Depending on
//! `export_copy` the license aggregator or the copyright aggregator builds
//! the lines, which are rendered as browser text or as a CSV download.

pub mod copyright;
pub mod format;
pub mod license;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use lcx_common::db::license::LicenseListOptions;
use lcx_common::db::LICENSE_AGENTS;
use lcx_common::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::decision_filter::{CurrentDecisionFilter, DecisionFilter};
use crate::row_cap::truncation_warning;
use crate::sources::{FindingsSource, SqliteSources, TreeLookup};
use copyright::{CopyrightAggregator, CopyrightType, KeyMatchPolicy};
use format::CsvFormat;

/// Warning shown when nothing is left to export
pub const RESULT_EMPTY: &str = "Result empty";

/// One file of the license list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseLine {
    pub file_path: String,
    /// Scanner findings; `None` for files nothing is known about
    pub agent_findings: Option<Vec<String>>,
    /// Concluded licenses, unique
    pub conclusions: Option<Vec<String>>,
}

/// One copyright statement of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyrightLine {
    pub file_path: String,
    pub content: String,
}

/// Lines of either export mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportLines {
    Licenses(Vec<LicenseLine>),
    Copyrights(Vec<CopyrightLine>),
}

impl ExportLines {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Licenses(lines) => lines.is_empty(),
            Self::Copyrights(lines) => lines.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Licenses(lines) => lines.len(),
            Self::Copyrights(lines) => lines.len(),
        }
    }
}

/// Parsed export parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub upload_id: Option<i64>,
    pub item_id: Option<i64>,
    /// License agents the caller opted into
    pub agents: Vec<String>,
    /// Copyright list instead of license list
    pub export_copyright: bool,
    pub copyright_type: CopyrightType,
    pub include_subfolders: bool,
    pub show_containers: bool,
    pub exclude: String,
    /// CSV download instead of browser text
    pub download: bool,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            upload_id: None,
            item_id: None,
            agents: Vec::new(),
            export_copyright: false,
            copyright_type: CopyrightType::All,
            include_subfolders: true,
            show_containers: false,
            exclude: String::new(),
            download: false,
        }
    }
}

impl ExportRequest {
    /// Read the request from query parameters
    ///
    /// Identifiers that are missing, not numeric, or zero are treated as
    /// absent.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let param = |name: &str| params.get(name).map(String::as_str);
        let id = |name: &str| {
            param(name)
                .and_then(|value| value.trim().parse::<i64>().ok())
                .filter(|id| *id != 0)
        };

        let agents = LICENSE_AGENTS
            .iter()
            .filter(|agent| {
                param(&format!("agentToInclude_{}", agent)).is_some_and(|value| !value.is_empty())
            })
            .map(|agent| agent.to_string())
            .collect();

        Self {
            upload_id: id("upload"),
            item_id: id("item"),
            agents,
            export_copyright: param("export_copy") == Some("yes"),
            copyright_type: CopyrightType::from_param(param("copyright_type")),
            include_subfolders: param("doNotIncludeSubfolder") != Some("yes"),
            show_containers: param("showContainers") == Some("yes"),
            exclude: param("exclude").unwrap_or_default().to_string(),
            download: param("output") == Some("dltext"),
        }
    }
}

/// Form state echoed back so the front end can redisplay its choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportForm {
    /// Agents that were selected and have a successful run
    pub agents_included: Vec<String>,
    pub export_copyright: bool,
    /// `all` or `nolic`
    pub copyright_type: &'static str,
    pub download: bool,
    pub list_row_limit: Option<usize>,
    pub include_subfolder: bool,
    pub show_containers: bool,
    pub exclude: String,
}

/// Per-request context supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportContext {
    pub group_id: i64,
    /// Counted rows shown before the list is cut short (`None` = unlimited)
    pub row_limit: Option<usize>,
    /// Date used in download file names
    pub today: NaiveDate,
}

/// Result of an export request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Upload or item missing; nothing was done
    NoContent,
    /// The group may not read the upload
    PermissionDenied,
    Display {
        warnings: Vec<String>,
        list_output: String,
        form: ExportForm,
    },
    Download {
        warnings: Vec<String>,
        file_name: String,
        csv: Vec<u8>,
    },
}

/// Runs export requests against injected sources
#[derive(Clone)]
pub struct ExportService {
    tree: Arc<dyn TreeLookup>,
    findings: Arc<dyn FindingsSource>,
    filter: Arc<dyn DecisionFilter>,
    csv_format: CsvFormat,
}

impl ExportService {
    pub fn new(
        tree: Arc<dyn TreeLookup>,
        findings: Arc<dyn FindingsSource>,
        filter: Arc<dyn DecisionFilter>,
        csv_format: CsvFormat,
    ) -> Self {
        Self {
            tree,
            findings,
            filter,
            csv_format,
        }
    }

    /// Service reading from one SQLite pool with the current-decision filter
    pub fn sqlite(pool: sqlx::SqlitePool, csv_format: CsvFormat) -> Self {
        let sources = Arc::new(SqliteSources::new(pool));
        Self::new(sources.clone(), sources, Arc::new(CurrentDecisionFilter), csv_format)
    }

    pub async fn run(&self, request: &ExportRequest, context: ExportContext) -> Result<ExportOutcome> {
        let (Some(upload_id), Some(item_id)) = (request.upload_id, request.item_id) else {
            return Ok(ExportOutcome::NoContent);
        };

        if !self.tree.is_accessible(upload_id, context.group_id).await? {
            info!(upload_id, group_id = context.group_id, "Export denied");
            return Ok(ExportOutcome::PermissionDenied);
        }

        let Some(bounds) = self.tree.item_bounds(upload_id, item_id).await? else {
            debug!(upload_id, item_id, "Item not in upload");
            return Ok(ExportOutcome::NoContent);
        };

        let mut warnings = Vec::new();
        let mut form = ExportForm {
            agents_included: Vec::new(),
            export_copyright: request.export_copyright,
            copyright_type: if request.export_copyright
                && request.copyright_type == CopyrightType::NoLicense
            {
                "nolic"
            } else {
                "all"
            },
            download: request.download,
            list_row_limit: context.row_limit,
            include_subfolder: request.include_subfolders,
            show_containers: request.show_containers,
            exclude: request.exclude.clone(),
        };

        let (lines, truncated) = if request.export_copyright {
            let aggregator = CopyrightAggregator {
                tree: self.tree.as_ref(),
                findings: self.findings.as_ref(),
                filter: self.filter.as_ref(),
                policy: KeyMatchPolicy::FirstSubstring,
            };
            let (lines, truncated) = aggregator
                .get_copyrights(
                    upload_id,
                    &bounds,
                    context.group_id,
                    &request.exclude,
                    request.copyright_type,
                    context.row_limit,
                )
                .await?;
            (ExportLines::Copyrights(lines), truncated)
        } else {
            let mut agent_ids = Vec::new();
            for agent_name in &request.agents {
                match self.findings.latest_agent_run(agent_name, upload_id).await? {
                    Some(agent_id) => {
                        agent_ids.push(agent_id);
                        form.agents_included.push(agent_name.clone());
                    }
                    None => {
                        warn!(upload_id, agent = %agent_name, "No successful agent run");
                        warnings.push(format!("No information for agent: {}", agent_name));
                    }
                }
            }

            let options = LicenseListOptions {
                include_subfolders: request.include_subfolders,
                exclude: &request.exclude,
                ignore_empty_containers: !request.show_containers,
            };
            let (lines, truncated) = license::create_list_of_lines(
                self.findings.as_ref(),
                self.filter.as_ref(),
                &bounds,
                context.group_id,
                &agent_ids,
                &options,
                context.row_limit,
            )
            .await?;
            (ExportLines::Licenses(lines), truncated)
        };

        if truncated {
            if let Some(limit) = context.row_limit {
                warn!(upload_id, item_id, limit, "Export list truncated");
                warnings.push(truncation_warning(limit));
            }
        }
        if lines.is_empty() {
            warnings.push(RESULT_EMPTY.to_string());
        }

        debug!(upload_id, item_id, lines = lines.len(), "Export lines ready");

        if request.download {
            let item_name = self
                .tree
                .item_name(item_id)
                .await?
                .unwrap_or_else(|| item_id.to_string());
            let file_name =
                format::export_file_name(&item_name, context.today, request.export_copyright);
            let csv = match &lines {
                ExportLines::Licenses(lines) => format::licenses_csv(lines, self.csv_format)?,
                ExportLines::Copyrights(lines) => format::copyrights_csv(lines, self.csv_format)?,
            };
            return Ok(ExportOutcome::Download {
                warnings,
                file_name,
                csv,
            });
        }

        let list_output = match &lines {
            ExportLines::Licenses(lines) => format::display_licenses(lines),
            ExportLines::Copyrights(lines) => format::display_copyrights(lines),
        };
        Ok(ExportOutcome::Display {
            warnings,
            list_output,
            form,
        })
    }
}
