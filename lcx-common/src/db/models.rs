//! Database models

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Agent id of a scanner run (`agent.agent_pk`)
pub type AgentId = i64;

/// Upload tree mode bit: directory
pub const MODE_DIRECTORY: i64 = 1 << 18;
/// Upload tree mode bit: artifact (unpacker-generated wrapper, never shown)
pub const MODE_ARTIFACT: i64 = 1 << 28;
/// Upload tree mode bit: container (archive)
pub const MODE_CONTAINER: i64 = 1 << 29;

/// License scanners whose findings can be exported
pub const LICENSE_AGENTS: [&str; 5] = ["nomos", "monk", "ninka", "reportImport", "ojo"];

/// Copyright scanner agent name
pub const COPYRIGHT_AGENT: &str = "copyright";

/// Scanner short name recorded when a file has no license
pub const NO_LICENSE_FOUND: &str = "No_license_found";

/// Conclusion recorded when a file is irrelevant or all licenses were removed
pub const VOID_LICENSE: &str = "Void";

/// Contiguous nested-set range over one upload's file tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTreeBounds {
    /// Root item of the range (`upload_tree.uploadtree_pk`)
    pub item_id: i64,
    pub upload_id: i64,
    pub left: i64,
    pub right: i64,
}

/// Upload permission levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    None = 0,
    Read = 1,
    Write = 3,
    Admin = 10,
}

/// Clearing decision type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionType {
    /// Work in progress, not a decision yet
    Wip,
    ToBeDiscussed,
    Irrelevant,
    Identified,
    DoNotUse,
    NonFunctional,
}

impl DecisionType {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Wip),
            3 => Some(Self::ToBeDiscussed),
            4 => Some(Self::Irrelevant),
            5 => Some(Self::Identified),
            6 => Some(Self::DoNotUse),
            7 => Some(Self::NonFunctional),
            _ => None,
        }
    }
}

/// Where a clearing decision applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionScope {
    /// Only the upload tree item it was made on
    Item,
    /// Every item sharing the same file content
    Repo,
}

impl DecisionScope {
    pub fn from_i64(value: i64) -> Self {
        if value == 1 {
            Self::Repo
        } else {
            Self::Item
        }
    }
}

/// One license event of a clearing decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingLicense {
    pub short_name: String,
    /// License was explicitly removed by the reviewer
    pub removed: bool,
}

/// A recorded clearing decision, attributed to an item inside the folder
/// it was queried for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingDecision {
    pub decision_id: i64,
    /// Item of the queried folder this decision applies to
    pub item_id: i64,
    pub pfile_id: i64,
    pub decision_type: DecisionType,
    pub scope: DecisionScope,
    pub licenses: Vec<ClearingLicense>,
}

impl ClearingDecision {
    /// Short names of licenses that were concluded (not removed)
    pub fn positive_licenses(&self) -> Vec<String> {
        self.licenses
            .iter()
            .filter(|license| !license.removed)
            .map(|license| license.short_name.clone())
            .collect()
    }
}

/// Concluded licenses per item: one inner list per decision layer
pub type ConcludedLicenses = HashMap<i64, Vec<Vec<String>>>;

/// Result of looking up license information for one file path
///
/// `NoResult` and `Empty` are distinct: the first means nothing is known
/// about the file, the second that a selected scanner processed it and
/// recorded no license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseFindings {
    NoResult,
    Empty,
    Present {
        /// Scanner short names, deduplicated
        scan_results: Vec<String>,
        /// Clearing conclusions, one inner list per decision layer
        concluded_results: Option<Vec<Vec<String>>>,
    },
}

/// License findings keyed by file path, in upload tree order
pub type LicensesPerFile = Vec<(String, LicenseFindings)>;

/// A copyright statement attached to an upload tree item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CopyrightEntry {
    pub item_id: i64,
    pub text: String,
}

/// License reference (`license_ref` row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LicenseRef {
    pub id: i64,
    pub short_name: String,
    pub full_name: Option<String>,
}

/// Cached Software Heritage lookup for one file content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareHeritageRecord {
    /// License short names reported by Software Heritage
    pub license: Option<String>,
    /// HTTP status of the lookup
    pub status: Option<i64>,
}
