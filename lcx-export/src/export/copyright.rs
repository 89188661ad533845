//! Copyright list: scanner and reviewer statements per file path

use std::collections::HashMap;

use lcx_common::db::license::LicenseListOptions;
use lcx_common::db::{
    CopyrightEntry, ItemTreeBounds, LicenseFindings, LicensesPerFile, COPYRIGHT_AGENT,
    LICENSE_AGENTS, NO_LICENSE_FOUND, VOID_LICENSE,
};
use lcx_common::Result;
use tracing::{debug, warn};

use super::license::consolidate_conclusions;
use super::CopyrightLine;
use crate::decision_filter::DecisionFilter;
use crate::row_cap::TakeWithWarning;
use crate::sources::{FindingsSource, TreeLookup};

/// Which files the copyright list covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyrightType {
    /// Every file with a statement
    All,
    /// Only files without a license finding or concluded license
    NoLicense,
}

impl CopyrightType {
    /// `all` selects every file; any other value restricts to unlicensed files
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("all") => Self::All,
            _ => Self::NoLicense,
        }
    }
}

/// How a licensed file path is matched against the collected groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatchPolicy {
    /// Remove the first group whose path contains the licensed path
    ///
    /// `src/a.c` therefore also matches `src/a.cpp` when that group comes
    /// first. Exports have always behaved this way.
    FirstSubstring,
    /// Remove the group with exactly the licensed path
    Exact,
}

/// Statements grouped by file path in first-seen order
pub type CopyrightGroups = Vec<(String, Vec<String>)>;

/// Lookups shared by both statement lists of one request
#[derive(Default)]
struct GroupIndex {
    /// Item id to full path (`None` for items outside the tree)
    paths: HashMap<i64, Option<String>>,
    /// Path to its group's position; groups are only appended while collecting
    positions: HashMap<String, usize>,
}

/// Collects copyright lines for one export request
pub struct CopyrightAggregator<'a> {
    pub tree: &'a dyn TreeLookup,
    pub findings: &'a dyn FindingsSource,
    pub filter: &'a dyn DecisionFilter,
    pub policy: KeyMatchPolicy,
}

impl CopyrightAggregator<'_> {
    /// Copyright lines under `bounds` and whether the row limit was hit
    ///
    /// An upload the copyright scanner never finished on yields no lines.
    pub async fn get_copyrights(
        &self,
        upload_id: i64,
        bounds: &ItemTreeBounds,
        group_id: i64,
        exclude: &str,
        copyright_type: CopyrightType,
        row_limit: Option<usize>,
    ) -> Result<(Vec<CopyrightLine>, bool)> {
        let Some(agent_id) = self.findings.latest_agent_run(COPYRIGHT_AGENT, upload_id).await? else {
            debug!(upload_id, "No successful copyright run");
            return Ok((Vec::new(), false));
        };

        let mut index = GroupIndex::default();

        let scanner = self
            .findings
            .copyright_scanner_entries(bounds, agent_id, exclude)
            .await?;
        let mut take = TakeWithWarning::new(row_limit);
        self.update_copyright_list(&mut take, scanner, &mut index).await?;

        let edited = self.findings.copyright_edited_entries(bounds, exclude).await?;
        self.update_copyright_list(&mut take, edited, &mut index).await?;

        let (mut groups, truncated) = take.into_inner();

        if copyright_type == CopyrightType::NoLicense {
            let mut agent_ids = Vec::new();
            for agent_name in LICENSE_AGENTS {
                if let Some(agent_id) = self.findings.latest_agent_run(agent_name, upload_id).await? {
                    agent_ids.push(agent_id);
                }
            }

            let decisions = self.findings.clearing_decisions(bounds, group_id).await?;
            let concluded = self.filter.for_copyright_list(&decisions);
            let options = LicenseListOptions {
                include_subfolders: true,
                exclude,
                ignore_empty_containers: true,
            };
            let per_file = self
                .findings
                .licenses_per_file(bounds, &agent_ids, &options, &concluded)
                .await?;
            remove_copyright_with_license(&mut groups, &per_file, self.policy);
        }

        Ok((reduce_copyright_lines(groups), truncated))
    }

    /// Append entries to their path's group
    ///
    /// Stops this list (and marks truncation) as soon as the number of
    /// groups reached the limit, even when the next entry would join an
    /// existing group.
    async fn update_copyright_list(
        &self,
        take: &mut TakeWithWarning<(String, Vec<String>)>,
        entries: Vec<CopyrightEntry>,
        index: &mut GroupIndex,
    ) -> Result<()> {
        for entry in entries {
            if take.is_full() {
                take.mark_truncated();
                break;
            }

            let path = match index.paths.get(&entry.item_id) {
                Some(path) => path.clone(),
                None => {
                    let path = self.tree.full_path(entry.item_id).await?;
                    index.paths.insert(entry.item_id, path.clone());
                    path
                }
            };
            let Some(path) = path else {
                warn!(item_id = entry.item_id, "Copyright entry for unknown item");
                continue;
            };

            match index.positions.get(&path) {
                Some(&position) => take.items_mut()[position].1.push(entry.text),
                None => {
                    let position = take.items_mut().len();
                    if take.push((path.clone(), vec![entry.text])) {
                        index.positions.insert(path, position);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Drop groups of files that carry a license
///
/// A file is licensed when its current decision concludes a license, or
/// when a scanner found something other than "no license". Files whose
/// decision voids their licenses are left alone.
pub fn remove_copyright_with_license(
    groups: &mut CopyrightGroups,
    per_file: &LicensesPerFile,
    policy: KeyMatchPolicy,
) {
    for (file_path, findings) in per_file {
        let LicenseFindings::Present {
            scan_results,
            concluded_results,
        } = findings
        else {
            continue;
        };

        if let Some(layers) = concluded_results {
            let conclusions = consolidate_conclusions(layers);
            if conclusions.iter().any(|name| name == VOID_LICENSE) {
                continue;
            }
            remove_if_key_exists(groups, file_path, policy);
        }

        let unlicensed = scan_results
            .iter()
            .any(|name| name == NO_LICENSE_FOUND || name == VOID_LICENSE);
        if !scan_results.is_empty() && !unlicensed {
            remove_if_key_exists(groups, file_path, policy);
        }
    }
}

/// Remove at most one group matching `key`
pub fn remove_if_key_exists(groups: &mut CopyrightGroups, key: &str, policy: KeyMatchPolicy) {
    let position = groups.iter().position(|(path, _)| match policy {
        KeyMatchPolicy::FirstSubstring => path.contains(key),
        KeyMatchPolicy::Exact => path == key,
    });
    if let Some(position) = position {
        groups.remove(position);
    }
}

/// One line per statement, groups kept adjacent
pub fn reduce_copyright_lines(groups: CopyrightGroups) -> Vec<CopyrightLine> {
    groups
        .into_iter()
        .flat_map(|(file_path, statements)| {
            statements.into_iter().map(move |content| CopyrightLine {
                file_path: file_path.clone(),
                content,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_filter::CurrentDecisionFilter;
    use async_trait::async_trait;
    use lcx_common::db::{AgentId, ClearingDecision, ConcludedLicenses};

    fn group(path: &str, statements: &[&str]) -> (String, Vec<String>) {
        (path.to_string(), statements.iter().map(|s| s.to_string()).collect())
    }

    fn present(scan: &[&str], concluded: Option<&[&str]>) -> LicenseFindings {
        LicenseFindings::Present {
            scan_results: scan.iter().map(|s| s.to_string()).collect(),
            concluded_results: concluded.map(|c| vec![c.iter().map(|s| s.to_string()).collect()]),
        }
    }

    /// In-memory tree and findings: item `n` lives at `paths[n]`
    struct FakeSources {
        paths: HashMap<i64, String>,
        copyright_run: Option<AgentId>,
        license_runs: Vec<(&'static str, AgentId)>,
        scanner: Vec<CopyrightEntry>,
        edited: Vec<CopyrightEntry>,
        licenses: LicensesPerFile,
    }

    impl FakeSources {
        fn new() -> Self {
            let paths = [(1, "up/a.c"), (2, "up/a.cpp"), (3, "up/b.c"), (4, "up/c.c")]
                .into_iter()
                .map(|(id, path)| (id, path.to_string()))
                .collect();
            Self {
                paths,
                copyright_run: Some(20),
                license_runs: vec![("nomos", 10)],
                scanner: Vec::new(),
                edited: Vec::new(),
                licenses: Vec::new(),
            }
        }
    }

    fn entry(item_id: i64, text: &str) -> CopyrightEntry {
        CopyrightEntry {
            item_id,
            text: text.to_string(),
        }
    }

    #[async_trait]
    impl TreeLookup for FakeSources {
        async fn item_bounds(&self, upload_id: i64, item_id: i64) -> Result<Option<ItemTreeBounds>> {
            Ok(Some(ItemTreeBounds {
                item_id,
                upload_id,
                left: 1,
                right: 100,
            }))
        }

        async fn full_path(&self, item_id: i64) -> Result<Option<String>> {
            Ok(self.paths.get(&item_id).cloned())
        }

        async fn item_name(&self, _item_id: i64) -> Result<Option<String>> {
            Ok(Some("up".to_string()))
        }

        async fn is_accessible(&self, _upload_id: i64, _group_id: i64) -> Result<bool> {
            Ok(true)
        }
    }

    #[async_trait]
    impl FindingsSource for FakeSources {
        async fn latest_agent_run(&self, agent_name: &str, _upload_id: i64) -> Result<Option<AgentId>> {
            if agent_name == COPYRIGHT_AGENT {
                return Ok(self.copyright_run);
            }
            Ok(self
                .license_runs
                .iter()
                .find(|(name, _)| *name == agent_name)
                .map(|(_, id)| *id))
        }

        async fn clearing_decisions(
            &self,
            _bounds: &ItemTreeBounds,
            _group_id: i64,
        ) -> Result<Vec<ClearingDecision>> {
            Ok(Vec::new())
        }

        async fn licenses_per_file(
            &self,
            _bounds: &ItemTreeBounds,
            agent_ids: &[AgentId],
            options: &LicenseListOptions<'_>,
            _concluded: &ConcludedLicenses,
        ) -> Result<LicensesPerFile> {
            assert_eq!(agent_ids, &[10]);
            assert!(options.include_subfolders);
            assert!(options.ignore_empty_containers);
            Ok(self.licenses.clone())
        }

        async fn copyright_scanner_entries(
            &self,
            _bounds: &ItemTreeBounds,
            agent_id: AgentId,
            _exclude: &str,
        ) -> Result<Vec<CopyrightEntry>> {
            assert_eq!(Some(agent_id), self.copyright_run);
            Ok(self.scanner.clone())
        }

        async fn copyright_edited_entries(
            &self,
            _bounds: &ItemTreeBounds,
            _exclude: &str,
        ) -> Result<Vec<CopyrightEntry>> {
            Ok(self.edited.clone())
        }
    }

    const BOUNDS: ItemTreeBounds = ItemTreeBounds {
        item_id: 1,
        upload_id: 1,
        left: 1,
        right: 100,
    };

    async fn run(
        sources: &FakeSources,
        copyright_type: CopyrightType,
        row_limit: Option<usize>,
    ) -> (Vec<CopyrightLine>, bool) {
        let aggregator = CopyrightAggregator {
            tree: sources,
            findings: sources,
            filter: &CurrentDecisionFilter,
            policy: KeyMatchPolicy::FirstSubstring,
        };
        aggregator
            .get_copyrights(1, &BOUNDS, 2, "", copyright_type, row_limit)
            .await
            .unwrap()
    }

    fn paths(lines: &[CopyrightLine]) -> Vec<&str> {
        lines.iter().map(|l| l.file_path.as_str()).collect()
    }

    #[test]
    fn test_copyright_type_param() {
        assert_eq!(CopyrightType::from_param(Some("all")), CopyrightType::All);
        assert_eq!(CopyrightType::from_param(Some("nolic")), CopyrightType::NoLicense);
        assert_eq!(CopyrightType::from_param(Some("bogus")), CopyrightType::NoLicense);
        assert_eq!(CopyrightType::from_param(None), CopyrightType::NoLicense);
    }

    #[tokio::test]
    async fn test_no_copyright_run_is_empty() {
        let mut sources = FakeSources::new();
        sources.copyright_run = None;
        sources.scanner = vec![entry(1, "Copyright Alice")];

        let (lines, truncated) = run(&sources, CopyrightType::All, None).await;
        assert!(lines.is_empty());
        assert!(!truncated);
    }

    #[tokio::test]
    async fn test_statements_grouped_by_path() {
        let mut sources = FakeSources::new();
        sources.scanner = vec![
            entry(1, "Copyright Alice"),
            entry(3, "Copyright Bob"),
            entry(1, "Copyright Carol"),
        ];
        sources.edited = vec![entry(3, "Copyright Bob (edited)")];

        let (lines, truncated) = run(&sources, CopyrightType::All, None).await;

        assert!(!truncated);
        assert_eq!(paths(&lines), vec!["up/a.c", "up/a.c", "up/b.c", "up/b.c"]);
        let contents: Vec<&str> = lines.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["Copyright Alice", "Copyright Carol", "Copyright Bob", "Copyright Bob (edited)"]
        );
    }

    #[tokio::test]
    async fn test_many_files_grouped_in_first_seen_order() {
        let mut sources = FakeSources::new();
        sources.paths = (1..=500).map(|id| (id, format!("up/f{}.c", id))).collect();
        sources.scanner = (1..=500).rev().map(|id| entry(id, "scanner")).collect();
        sources.edited = (1..=500).map(|id| entry(id, "edited")).collect();

        let (lines, truncated) = run(&sources, CopyrightType::All, None).await;

        assert!(!truncated);
        assert_eq!(lines.len(), 1000);
        assert_eq!(lines[0].file_path, "up/f500.c");
        assert_eq!(lines[1].file_path, "up/f500.c");
        assert_eq!(lines[1].content, "edited");
        assert_eq!(lines[998].file_path, "up/f1.c");
        assert_eq!(lines[999].content, "edited");
    }

    #[tokio::test]
    async fn test_row_limit_counts_groups_per_list() {
        let mut sources = FakeSources::new();
        sources.scanner = vec![
            entry(1, "one"),
            entry(1, "one again"),
            entry(3, "two"),
            entry(4, "three"),
        ];
        sources.edited = vec![entry(1, "edited one")];

        let (lines, truncated) = run(&sources, CopyrightType::All, Some(2)).await;

        // The second group fills the cap; the edited list stops right away
        assert!(truncated);
        assert_eq!(paths(&lines), vec!["up/a.c", "up/a.c", "up/b.c"]);
    }

    #[tokio::test]
    async fn test_nolic_keeps_files_without_license() {
        let mut sources = FakeSources::new();
        sources.scanner = vec![entry(1, "Alice"), entry(3, "Bob"), entry(4, "Carol")];
        sources.licenses = vec![
            ("up/a.c".to_string(), present(&["MIT"], None)),
            ("up/b.c".to_string(), present(&[NO_LICENSE_FOUND], None)),
            ("up/c.c".to_string(), present(&[], Some(&["GPL-2.0"]))),
        ];

        let (lines, _) = run(&sources, CopyrightType::NoLicense, None).await;
        assert_eq!(paths(&lines), vec!["up/b.c"]);
    }

    #[tokio::test]
    async fn test_nolic_void_conclusion_keeps_file() {
        let mut sources = FakeSources::new();
        sources.scanner = vec![entry(1, "Alice")];
        sources.licenses = vec![("up/a.c".to_string(), present(&["MIT"], Some(&[VOID_LICENSE])))];

        let (lines, _) = run(&sources, CopyrightType::NoLicense, None).await;
        assert_eq!(paths(&lines), vec!["up/a.c"]);
    }

    #[test]
    fn test_first_substring_removes_earlier_match_only() {
        let mut groups = vec![
            group("up/a.cpp", &["x"]),
            group("up/a.c", &["y"]),
            group("up/b.c", &["z"]),
        ];

        remove_if_key_exists(&mut groups, "up/a.c", KeyMatchPolicy::FirstSubstring);

        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["up/a.c", "up/b.c"]);
    }

    #[test]
    fn test_exact_policy() {
        let mut groups = vec![group("up/a.cpp", &["x"]), group("up/a.c", &["y"])];

        remove_if_key_exists(&mut groups, "up/a.c", KeyMatchPolicy::Exact);

        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["up/a.cpp"]);

        remove_if_key_exists(&mut groups, "up/missing", KeyMatchPolicy::Exact);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_licensed_by_both_rules_removes_twice() {
        // A concluded file with a scanner hit is removed by each rule
        let mut groups = vec![group("up/a.c", &["x"]), group("up/a.c.orig", &["y"])];
        let per_file = vec![("up/a.c".to_string(), present(&["MIT"], Some(&["MIT"])))];

        remove_copyright_with_license(&mut groups, &per_file, KeyMatchPolicy::FirstSubstring);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_reduce_flattens_in_order() {
        let groups = vec![group("b", &["1", "2"]), group("a", &["3"])];
        let lines = reduce_copyright_lines(groups);
        assert_eq!(
            lines,
            vec![
                CopyrightLine { file_path: "b".into(), content: "1".into() },
                CopyrightLine { file_path: "b".into(), content: "2".into() },
                CopyrightLine { file_path: "a".into(), content: "3".into() },
            ]
        );
    }
}
