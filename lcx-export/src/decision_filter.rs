//! Reduction of raw clearing decisions to the current decision per item
//!
//! The decision store keeps every decision ever made. An item's current
//! decision is its newest item-scoped decision, or failing that the newest
//! repository-scoped decision for its file content. Work-in-progress
//! decisions never count.

use std::collections::HashMap;

use lcx_common::db::{ClearingDecision, ConcludedLicenses, DecisionScope, DecisionType, VOID_LICENSE};

/// Maps raw decisions to the conclusions shown in exports
pub trait DecisionFilter: Send + Sync {
    /// Concluded license names per item for the license list
    ///
    /// Items whose current decision concludes no license have no entry.
    fn for_license_list(&self, decisions: &[ClearingDecision]) -> ConcludedLicenses;

    /// Concluded license names per item for the copyright list
    ///
    /// Irrelevant files and decisions that removed every license map to
    /// `Void`.
    fn for_copyright_list(&self, decisions: &[ClearingDecision]) -> ConcludedLicenses;
}

/// Newest decision wins, item scope before repository scope
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentDecisionFilter;

impl CurrentDecisionFilter {
    /// Current decision per item
    ///
    /// Expects `decisions` newest first, as the decision queries return them.
    pub fn current_decisions<'a>(
        &self,
        decisions: &'a [ClearingDecision],
    ) -> HashMap<i64, &'a ClearingDecision> {
        let mut item_scoped: HashMap<i64, &ClearingDecision> = HashMap::new();
        let mut repo_scoped: HashMap<i64, &ClearingDecision> = HashMap::new();

        for decision in decisions {
            if decision.decision_type == DecisionType::Wip {
                continue;
            }
            let slot = match decision.scope {
                DecisionScope::Item => &mut item_scoped,
                DecisionScope::Repo => &mut repo_scoped,
            };
            slot.entry(decision.item_id).or_insert(decision);
        }

        for (item_id, decision) in repo_scoped {
            item_scoped.entry(item_id).or_insert(decision);
        }
        item_scoped
    }
}

impl DecisionFilter for CurrentDecisionFilter {
    fn for_license_list(&self, decisions: &[ClearingDecision]) -> ConcludedLicenses {
        self.current_decisions(decisions)
            .into_iter()
            .filter_map(|(item_id, decision)| {
                let licenses = decision.positive_licenses();
                (!licenses.is_empty()).then(|| (item_id, vec![licenses]))
            })
            .collect()
    }

    fn for_copyright_list(&self, decisions: &[ClearingDecision]) -> ConcludedLicenses {
        self.current_decisions(decisions)
            .into_iter()
            .map(|(item_id, decision)| {
                let licenses = decision.positive_licenses();
                if decision.decision_type == DecisionType::Irrelevant || licenses.is_empty() {
                    (item_id, vec![vec![VOID_LICENSE.to_string()]])
                } else {
                    (item_id, vec![licenses])
                }
            })
            .collect()
    }
}
