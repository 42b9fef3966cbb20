use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;

use super::rule::VarId;
use super::rule_generator::Variables;
use super::{SolveJob, SolveMode};
use crate::item::{Kind, Transact};
use crate::pool::ItemId;

/// Policy for ordering candidate items.
///
/// When several items can satisfy a rule, the policy decides which one
/// the search tries first.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Prefer keeping installed items over newer editions
    pub prefer_installed: bool,
    /// Items the solver chose to install last time
    pub preferred: HashSet<ItemId>,
    /// Items the solver chose to remove last time
    pub avoided: HashSet<ItemId>,
}

impl Policy {
    pub fn new() -> Self {
        Self {
            prefer_installed: true,
            preferred: HashSet::new(),
            avoided: HashSet::new(),
        }
    }

    pub fn prefer_installed(mut self, prefer: bool) -> Self {
        self.prefer_installed = prefer;
        self
    }

    /// Carry over the previous solver decisions
    pub fn with_previous(mut self, previous: &BTreeMap<ItemId, Transact>) -> Self {
        for (&id, transact) in previous {
            match transact {
                Transact::Install => {
                    self.preferred.insert(id);
                }
                Transact::Remove => {
                    self.avoided.insert(id);
                }
                Transact::Keep => {}
            }
        }
        self
    }

    pub fn for_job(job: &SolveJob<'_>) -> Self {
        Self::new()
            .prefer_installed(job.mode != SolveMode::Upgrade)
            .with_previous(job.previous)
    }

    /// Whether an installed item should be tried as removed first
    pub fn avoids(&self, id: ItemId) -> bool {
        self.avoided.contains(&id)
    }

    /// Order candidates best first.
    ///
    /// Candidates are grouped by kind and name. Within a group previous
    /// choices come first, then (unless upgrading) installed items, then
    /// higher editions, then pool order. Groups are ordered by the same
    /// flags of their best member, then by first appearance.
    pub(crate) fn select_preferred(&self, vars: &Variables, candidates: &[VarId]) -> Vec<VarId> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut groups: IndexMap<(Kind, &str), Vec<VarId>> = IndexMap::new();
        for &var in candidates {
            let item = vars.item(var);
            groups.entry((item.kind(), item.name())).or_default().push(var);
        }

        let mut groups: Vec<Vec<VarId>> = groups.into_values().collect();
        for group in &mut groups {
            group.sort_by(|&a, &b| self.compare_same_name(vars, a, b));
            group.dedup();
        }

        // stable sort keeps first appearance as the final tie-break
        groups.sort_by_key(|group| self.flags(vars, group[0]));

        groups.into_iter().flatten().collect()
    }

    /// Sort key where smaller is better: (not preferred, not installed)
    fn flags(&self, vars: &Variables, var: VarId) -> (bool, bool) {
        let item = vars.item(var);
        let preferred = self.preferred.contains(&item.id());
        let installed = self.prefer_installed && item.status().is_installed();
        (!preferred, !installed)
    }

    fn compare_same_name(&self, vars: &Variables, a: VarId, b: VarId) -> Ordering {
        let item_a = vars.item(a);
        let item_b = vars.item(b);
        self.flags(vars, a)
            .cmp(&self.flags(vars, b))
            .then_with(|| item_b.edition().cmp(item_a.edition()))
            .then_with(|| a.cmp(&b))
    }
}
