use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, info};

use super::Resolver;
use crate::item::{Arch, Transact, TransactBy};
use crate::pool::{ItemId, PoolItem, ResPool};
use crate::error::Result;
use crate::solver::SolveMode;

/// Counters filled by [`Resolver::do_upgrade`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeStatistics {
    /// Installed items looked at
    pub installed: usize,
    /// Installed items with a newer edition marked for install
    pub upgraded: usize,
    /// Installed items replaced by an obsoleting item
    pub replaced: usize,
    /// Installed items the user already marked
    pub already_transacting: usize,
    /// Installed items without a candidate that stay
    pub kept: usize,
    pub removed: usize,
    pub unmaintained: usize,
    /// Problems left after the upgrade
    pub unresolved: usize,
    /// Mark broken unmaintained items for removal; otherwise their
    /// installed status is ignored
    pub delete_unmaintained: bool,
}

impl Default for UpgradeStatistics {
    fn default() -> Self {
        Self {
            installed: 0,
            upgraded: 0,
            replaced: 0,
            already_transacting: 0,
            kept: 0,
            removed: 0,
            unmaintained: 0,
            unresolved: 0,
            delete_unmaintained: true,
        }
    }
}

impl fmt::Display for UpgradeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} installed: {} upgraded, {} replaced, {} already transacting, {} kept, \
             {} removed, {} unmaintained, {} unresolved",
            self.installed,
            self.upgraded,
            self.replaced,
            self.already_transacting,
            self.kept,
            self.removed,
            self.unmaintained,
            self.unresolved
        )
    }
}

impl Resolver {
    /// Upgrade every installed item to its best candidate.
    ///
    /// Candidates are marked for install by `Upgrade` and the pool is
    /// solved in upgrade mode. If that fails, installed items without a
    /// candidate whose requirements can no longer be met are treated as
    /// unmaintained and the pool is solved once more. The check is a
    /// reachability estimate over the pool and may misjudge items whose
    /// providers depend on solver choices.
    pub fn do_upgrade(&mut self, stats: &mut UpgradeStatistics) -> Result<bool> {
        let pool = self.bound_pool()?;
        self.upgrade_mode = true;
        self.clear_result();

        *stats = UpgradeStatistics {
            delete_unmaintained: stats.delete_unmaintained,
            ..UpgradeStatistics::default()
        };

        let items = pool.items();
        let system_arch = Arch::new(self.config.system_arch.clone());
        // installed item -> the item taking its place
        let mut replaced: BTreeMap<ItemId, PoolItem> = BTreeMap::new();
        let mut no_candidate: Vec<PoolItem> = Vec::new();

        for installed in items.iter().filter(|item| item.status().is_installed()) {
            stats.installed += 1;

            let status = installed.status();
            if status.is_transacting() && status.transact_by() == TransactBy::User {
                stats.already_transacting += 1;
                continue;
            }

            if let Some(candidate) = self.update_candidate(&items, installed, &system_arch) {
                debug!("Upgrade candidate for {}: {}", installed, candidate);
                candidate.set_transact(Transact::Install, TransactBy::Upgrade);
                stats.upgraded += 1;
                replaced.insert(installed.id(), candidate);
            } else if let Some(obsoleter) = self.obsoleter(&items, installed, &system_arch) {
                debug!("{} replaces {}", obsoleter, installed);
                obsoleter.set_transact(Transact::Install, TransactBy::Upgrade);
                stats.replaced += 1;
                replaced.insert(installed.id(), obsoleter);
            } else {
                no_candidate.push(installed.clone());
            }
        }

        let mut solved = self.solve(SolveMode::Upgrade)?;
        if !solved && self.check_unmaintained_items(&pool, &no_candidate, &replaced, stats.delete_unmaintained) {
            solved = self.solve(SolveMode::Upgrade)?;
        }

        if solved {
            for item in &no_candidate {
                let status = item.status();
                if status.to_remove() {
                    if !self.unmaintained_items.contains(item) {
                        info!("{} is removed by the upgrade", item);
                        self.unmaintained_items.push(item.clone());
                    }
                } else {
                    stats.kept += 1;
                }
            }
            stats.removed = items.iter().filter(|item| item.status().to_remove()).count();
        } else {
            stats.unresolved = self.problems.len();
            self.problem_items = self.problematic_items(&pool, &replaced);
        }
        stats.unmaintained = self.unmaintained_items.len();

        info!("Upgrade {}: {}", if solved { "done" } else { "failed" }, stats);
        Ok(solved)
    }

    /// Newest acceptable edition of the same kind and name, first in pool
    /// order among equal editions
    fn update_candidate(&self, items: &[PoolItem], installed: &PoolItem, system_arch: &Arch) -> Option<PoolItem> {
        let mut best: Option<&PoolItem> = None;

        for candidate in items {
            if candidate.status().is_installed()
                || !candidate.same_name_as(installed)
                || candidate.edition().compare(installed.edition()) != Ordering::Greater
                || !self.arch_acceptable(candidate, system_arch)
                || !(candidate.vendor() == installed.vendor()
                    || self.config.allow_vendor_change
                    || self.ignore.ignores_vendor(candidate.id()))
            {
                continue;
            }

            let better = best.map_or(true, |b| candidate.edition().compare(b.edition()) == Ordering::Greater);
            if better {
                best = Some(candidate);
            }
        }

        best.cloned()
    }

    /// First available item obsoleting `installed`
    fn obsoleter(&self, items: &[PoolItem], installed: &PoolItem, system_arch: &Arch) -> Option<PoolItem> {
        items
            .iter()
            .find(|candidate| {
                !candidate.status().is_installed()
                    && self.arch_acceptable(candidate, system_arch)
                    && candidate.deps().obsoletes.iter().any(|cap| {
                        cap.matches_item(installed.name(), installed.edition())
                            && !self.ignore.ignores_obsoletes(candidate.id(), cap)
                    })
            })
            .cloned()
    }

    fn arch_acceptable(&self, item: &PoolItem, system_arch: &Arch) -> bool {
        item.arch().compatible_with(system_arch) || self.ignore.ignores_architecture(item.id())
    }

    /// Find installed items without a candidate whose requirements have
    /// no provider left after the upgrade. Those are marked for removal
    /// or get their installed status ignored. Returns whether any was found.
    fn check_unmaintained_items(
        &mut self,
        pool: &ResPool,
        no_candidate: &[PoolItem],
        replaced: &BTreeMap<ItemId, PoolItem>,
        delete: bool,
    ) -> bool {
        let items = pool.items();
        let present = |provider: &PoolItem| {
            let status = provider.status();
            status.to_install() || (status.stays_installed() && !replaced.contains_key(&provider.id()))
        };

        let mut found = false;
        for item in no_candidate {
            let broken = item.deps().requires.iter().find(|cap| {
                !self.ignore.ignores_requires(item.id(), cap)
                    && !items
                        .iter()
                        .any(|provider| provider.provides_capability(cap) && present(provider))
            });
            let Some(cap) = broken else {
                continue;
            };

            info!("{} is unmaintained: nothing provides {} after the upgrade", item, cap);
            found = true;
            self.unmaintained_items.push(item.clone());
            if delete {
                item.set_transact(Transact::Remove, TransactBy::Upgrade);
            } else if self.ignore.add_installed(item.id()) {
                self.upgrade_ignored.insert(item.id());
            }
        }

        found
    }

    /// Installed items named by the remaining problems. Candidates stand
    /// for the item they replace; unmaintained items are left out.
    fn problematic_items(&self, pool: &ResPool, replaced: &BTreeMap<ItemId, PoolItem>) -> Vec<PoolItem> {
        let replaced_by: BTreeMap<ItemId, ItemId> = replaced
            .iter()
            .map(|(&installed, candidate)| (candidate.id(), installed))
            .collect();

        let mut seen = BTreeSet::new();
        let mut result = Vec::new();
        for problem in &self.problems {
            for id in &problem.items {
                let id = replaced_by.get(id).copied().unwrap_or(*id);
                let Some(item) = pool.get(id) else {
                    continue;
                };
                if !item.status().is_installed() || self.unmaintained_items.contains(&item) {
                    continue;
                }
                if seen.insert(id) {
                    result.push(item);
                }
            }
        }
        result
    }
}
