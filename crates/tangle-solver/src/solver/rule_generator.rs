use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use log::trace;

use super::rule::{Rule, RuleType, VarId};
use super::rule_set::RuleSet;
use super::{SolveJob, SolveMode};
use crate::capability::Capability;
use crate::item::{Arch, Kind, Transact, TransactBy};
use crate::pool::{ItemId, PoolItem, ResPool};

/// Items indexed by every name they can be found under: their own name
/// and the names of their explicit provides. Buckets keep pool order.
#[derive(Debug, Default)]
pub struct ProviderIndex {
    by_name: IndexMap<String, Vec<PoolItem>>,
    content_serial: u64,
}

impl ProviderIndex {
    pub fn build(pool: &ResPool) -> Self {
        let mut by_name: IndexMap<String, Vec<PoolItem>> = IndexMap::new();

        for item in pool.items() {
            let names = std::iter::once(item.name())
                .chain(item.deps().provides.iter().map(|c| c.name()));
            for name in names {
                let bucket = by_name.entry(name.to_string()).or_default();
                if bucket.last().map(|last| last.id()) != Some(item.id()) {
                    bucket.push(item.clone());
                }
            }
        }

        Self {
            by_name,
            content_serial: pool.content_serial(),
        }
    }

    /// Whether the index still reflects the pool content
    pub fn is_current(&self, pool: &ResPool) -> bool {
        self.content_serial == pool.content_serial()
    }

    /// Items providing `capability`, in pool order
    pub fn what_provides(&self, capability: &Capability) -> Vec<PoolItem> {
        self.candidates(capability.name())
            .iter()
            .filter(|item| item.provides_capability(capability))
            .cloned()
            .collect()
    }

    /// Items whose name and edition match `capability` (obsoletes semantics)
    pub fn what_matches(&self, capability: &Capability) -> Vec<PoolItem> {
        self.candidates(capability.name())
            .iter()
            .filter(|item| capability.matches_item(item.name(), item.edition()))
            .cloned()
            .collect()
    }

    fn candidates(&self, name: &str) -> &[PoolItem] {
        self.by_name.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// The solve snapshot: variable `n` is `items[n - 1]`
#[derive(Debug)]
pub(crate) struct Variables {
    items: Vec<PoolItem>,
    by_id: HashMap<ItemId, VarId>,
}

impl Variables {
    pub fn new(job: &SolveJob<'_>) -> Self {
        let items: Vec<PoolItem> = job
            .pool
            .items()
            .into_iter()
            .filter(|item| job.mode != SolveMode::Verify || item.status().is_installed())
            .collect();
        let by_id = items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.id(), idx as VarId + 1))
            .collect();
        Self { items, by_id }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, var: VarId) -> &PoolItem {
        &self.items[var as usize - 1]
    }

    pub fn var(&self, id: ItemId) -> Option<VarId> {
        self.by_id.get(&id).copied()
    }

    pub fn all(&self) -> impl Iterator<Item = VarId> {
        1..=self.items.len() as VarId
    }

    fn vars_of(&self, items: &[PoolItem]) -> Vec<VarId> {
        items.iter().filter_map(|item| self.var(item.id())).collect()
    }
}

/// Transaction requested by the user or the upgrade pass. Solver-authored
/// transactions are not jobs; they only feed the policy.
pub(crate) fn job_transact(item: &PoolItem) -> Option<Transact> {
    let status = item.status();
    if status.is_transacting() && status.transact_by() != TransactBy::Solver {
        Some(status.transact())
    } else {
        None
    }
}

/// Rules plus the weak preferences the search honours after the hard rules
#[derive(Debug, Default)]
pub(crate) struct GeneratedRules {
    pub rules: RuleSet,
    /// Installed items kept only if nothing prevents it (force-resolve)
    pub weak_keeps: Vec<VarId>,
    /// Recommending item and the providers of one recommended capability
    pub recommends: Vec<(VarId, Vec<VarId>)>,
}

/// Turns a solve job into SAT rules.
///
/// Rules are generated for the items reachable from the installed set,
/// the jobs and the extra requires. Ids follow generation order: jobs,
/// extra requires, keep rules, per-item rules, pairwise rules, extra
/// conflicts.
pub(crate) struct RuleGenerator<'a> {
    job: &'a SolveJob<'a>,
    index: &'a ProviderIndex,
    vars: &'a Variables,
    system_arch: Arch,
    added: Vec<bool>,
    queue: VecDeque<VarId>,
    out: GeneratedRules,
}

impl<'a> RuleGenerator<'a> {
    pub fn new(job: &'a SolveJob<'a>, index: &'a ProviderIndex, vars: &'a Variables) -> Self {
        Self {
            job,
            index,
            vars,
            system_arch: Arch::new(job.config.system_arch.clone()),
            added: vec![false; vars.len() + 1],
            queue: VecDeque::new(),
            out: GeneratedRules::default(),
        }
    }

    pub fn generate(mut self) -> GeneratedRules {
        self.add_job_rules();
        self.add_extra_require_rules();
        self.add_keep_rules();

        while let Some(var) = self.queue.pop_front() {
            self.add_item_rules(var);
        }

        self.add_pairwise_rules();
        self.add_extra_conflict_rules();

        self.out
    }

    fn providers(&self, capability: &Capability) -> Vec<VarId> {
        self.vars.vars_of(&self.index.what_provides(capability))
    }

    fn enqueue(&mut self, var: VarId) {
        if !self.added[var as usize] {
            self.added[var as usize] = true;
            self.queue.push_back(var);
        }
    }

    fn push(&mut self, rule: Rule) {
        trace!("rule {}", rule);
        self.out.rules.add(rule);
    }

    fn is_ignored_installed(&self, item: &PoolItem) -> bool {
        item.status().is_installed() && self.job.ignore.ignores_installed(item.id())
    }

    fn add_job_rules(&mut self) {
        if self.job.mode == SolveMode::Verify {
            return;
        }

        for var in self.vars.all() {
            let item = self.vars.item(var);
            let literal = match job_transact(item) {
                Some(Transact::Install) => var,
                Some(Transact::Remove) => -var,
                _ => continue,
            };
            self.push(Rule::assertion(literal, RuleType::Job).with_source(var));
            self.enqueue(var);
        }
    }

    fn add_extra_require_rules(&mut self) {
        let job = self.job;
        for capability in job.extra_requires {
            let providers = self.providers(capability);
            self.push(
                Rule::new(providers.clone(), RuleType::ExtraRequire).with_capability(capability.clone()),
            );
            for provider in providers {
                self.enqueue(provider);
            }
        }
    }

    fn add_keep_rules(&mut self) {
        for var in self.vars.all() {
            let item = self.vars.item(var);
            if !item.status().is_installed() || job_transact(item).is_some() {
                continue;
            }

            let replacements = self.replacements(item);
            if self.job.force_resolve {
                self.out.weak_keeps.push(var);
            } else {
                self.push(Rule::keep(var, &replacements));
            }

            self.enqueue(var);
            for replacement in replacements {
                self.enqueue(replacement);
            }
        }
    }

    /// Uninstalled items that may take the place of `installed`: same kind
    /// and name with an acceptable vendor, or obsoleting it
    fn replacements(&self, installed: &PoolItem) -> Vec<VarId> {
        if self.job.mode == SolveMode::Verify {
            return Vec::new();
        }

        self.vars
            .all()
            .filter(|&var| {
                let candidate = self.vars.item(var);
                if candidate.status().is_installed() {
                    return false;
                }
                if candidate.same_name_as(installed) {
                    return self.vendor_acceptable(candidate, installed);
                }
                candidate.deps().obsoletes.iter().any(|cap| {
                    cap.matches_item(installed.name(), installed.edition())
                        && !self.job.ignore.ignores_obsoletes(candidate.id(), cap)
                })
            })
            .collect()
    }

    fn vendor_acceptable(&self, candidate: &PoolItem, installed: &PoolItem) -> bool {
        candidate.vendor() == installed.vendor()
            || self.job.config.allow_vendor_change
            || self.job.ignore.ignores_vendor(candidate.id())
    }

    fn add_item_rules(&mut self, var: VarId) {
        let item = self.vars.item(var).clone();
        let installed = item.status().is_installed();

        if !installed {
            if !item.arch().compatible_with(&self.system_arch)
                && !self.job.ignore.ignores_architecture(item.id())
            {
                self.push(Rule::assertion(-var, RuleType::NotInstallable).with_source(var));
            }

            let vendor_clash = self
                .index
                .candidates(item.name())
                .iter()
                .filter(|other| {
                    other.status().is_installed()
                        && other.same_name_as(&item)
                        && !self.vendor_acceptable(&item, other)
                })
                .find_map(|other| self.vars.var(other.id()));
            if let Some(other) = vendor_clash {
                self.push(
                    Rule::assertion(-var, RuleType::VendorChange)
                        .with_source(var)
                        .with_related(other),
                );
            }
        }

        if self.is_ignored_installed(&item) {
            return;
        }

        for capability in &item.deps().requires {
            if self.job.ignore.ignores_requires(item.id(), capability) {
                continue;
            }
            let providers = self.providers(capability);
            self.push(Rule::requires(var, &providers, capability.clone()));
            for provider in providers {
                self.enqueue(provider);
            }
        }

        if !self.job.only_requires && self.job.mode != SolveMode::Verify {
            for capability in &item.deps().recommends {
                let providers: Vec<VarId> = self
                    .providers(capability)
                    .into_iter()
                    .filter(|&p| p != var)
                    .collect();
                if providers.is_empty() {
                    continue;
                }
                for &provider in &providers {
                    self.enqueue(provider);
                }
                self.out.recommends.push((var, providers));
            }
        }
    }

    /// Conflicts, obsoletes and same-name rules among the reachable items
    fn add_pairwise_rules(&mut self) {
        let reachable: Vec<VarId> = self.vars.all().filter(|&v| self.added[v as usize]).collect();

        for &var in &reachable {
            let item = self.vars.item(var).clone();
            if self.is_ignored_installed(&item) {
                continue;
            }

            for capability in &item.deps().conflicts {
                if self.job.ignore.ignores_conflict(item.id(), capability) {
                    continue;
                }
                for other in self.providers(capability) {
                    if other != var && self.added[other as usize] {
                        self.push(
                            Rule::conflict(var, other, RuleType::Conflicts)
                                .with_capability(capability.clone()),
                        );
                    }
                }
            }

            // obsoletes of installed items have already been carried out
            if item.status().is_installed() {
                continue;
            }
            for capability in &item.deps().obsoletes {
                if self.job.ignore.ignores_obsoletes(item.id(), capability) {
                    continue;
                }
                let obsoleted = self.vars.vars_of(&self.index.what_matches(capability));
                for other in obsoleted {
                    if other != var && self.added[other as usize] {
                        self.push(
                            Rule::conflict(var, other, RuleType::Obsoletes)
                                .with_capability(capability.clone()),
                        );
                    }
                }
            }
        }

        let mut by_name: IndexMap<(Kind, String), Vec<VarId>> = IndexMap::new();
        for &var in &reachable {
            let item = self.vars.item(var);
            by_name
                .entry((item.kind(), item.name().to_string()))
                .or_default()
                .push(var);
        }
        for group in by_name.values().filter(|group| group.len() > 1) {
            self.push(Rule::same_name(group));
        }
    }

    fn add_extra_conflict_rules(&mut self) {
        let job = self.job;
        for capability in job.extra_conflicts {
            for provider in self.providers(capability) {
                if self.added[provider as usize] {
                    self.push(
                        Rule::assertion(-provider, RuleType::ExtraConflict)
                            .with_source(provider)
                            .with_capability(capability.clone()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySet;
    use crate::config::ResolverConfig;
    use crate::item::Resolvable;
    use crate::resolver::IgnoreRules;
    use std::collections::BTreeMap;
    use tangle_edition::Edition;

    fn pkg(name: &str, version: &str) -> Resolvable {
        Resolvable::package(name, Edition::parse(version).unwrap())
    }

    fn cap(s: &str) -> Capability {
        Capability::parse(s).unwrap()
    }

    struct Fixture {
        pool: ResPool,
        none: CapabilitySet,
        ignore: IgnoreRules,
        config: ResolverConfig,
        previous: BTreeMap<ItemId, Transact>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                pool: ResPool::new(),
                none: CapabilitySet::new(),
                ignore: IgnoreRules::default(),
                config: ResolverConfig::default().with_system_arch("x86_64"),
                previous: BTreeMap::new(),
            }
        }

        fn job(&self, mode: SolveMode) -> SolveJob<'_> {
            SolveJob {
                pool: &self.pool,
                mode,
                extra_requires: &self.none,
                extra_conflicts: &self.none,
                ignore: &self.ignore,
                only_requires: false,
                force_resolve: false,
                config: &self.config,
                previous: &self.previous,
            }
        }

        fn generate(&self, mode: SolveMode) -> GeneratedRules {
            let job = self.job(mode);
            let index = ProviderIndex::build(&self.pool);
            let vars = Variables::new(&job);
            RuleGenerator::new(&job, &index, &vars).generate()
        }
    }

    #[test]
    fn test_provider_index() {
        let pool = ResPool::new();
        let a = pool.add_available(pkg("a", "1.0").provides(cap("libx = 2")));
        let b = pool.add_available(pkg("libx", "1.0"));

        let index = ProviderIndex::build(&pool);
        assert_eq!(index.what_provides(&cap("libx")), vec![a.clone(), b.clone()]);
        assert_eq!(index.what_provides(&cap("libx >= 2")), vec![a]);
        assert_eq!(index.what_matches(&cap("libx")), vec![b]);
        assert!(index.is_current(&pool));

        pool.add_available(pkg("c", "1.0"));
        assert!(!index.is_current(&pool));
    }

    #[test]
    fn test_unreachable_items_get_no_rules() {
        let fx = Fixture::new();
        fx.pool.add_available(pkg("a", "1.0").requires(cap("libx")));

        let generated = fx.generate(SolveMode::Resolve);
        assert!(generated.rules.is_empty());
    }

    #[test]
    fn test_job_and_requires_rules() {
        let fx = Fixture::new();
        let a = fx.pool.add_available(pkg("a", "1.0").requires(cap("b")));
        fx.pool.add_available(pkg("b", "1.0"));
        a.set_transact(Transact::Install, TransactBy::User);

        let rules = fx.generate(SolveMode::Resolve).rules;
        let literals: Vec<Vec<i32>> = rules.iter().map(|r| r.literals().to_vec()).collect();
        assert_eq!(literals, vec![vec![1], vec![-1, 2]]);
        assert_eq!(rules.get(0).map(|r| r.rule_type()), Some(RuleType::Job));
    }

    #[test]
    fn test_keep_rule_lists_updates_and_obsoleters() {
        let fx = Fixture::new();
        fx.pool.add_installed(pkg("a", "1.0"));
        fx.pool.add_available(pkg("a", "2.0"));
        fx.pool.add_available(pkg("a-ng", "1.0").obsoletes(cap("a < 2")));

        let rules = fx.generate(SolveMode::Resolve).rules;
        let keep: Vec<_> = rules.rules_of_type(RuleType::Keep).collect();
        assert_eq!(keep.len(), 1);
        assert_eq!(keep[0].literals(), &[1, 2, 3]);
        assert_eq!(rules.count_by_type(RuleType::SameName), 1);
        assert_eq!(rules.count_by_type(RuleType::Obsoletes), 1);
    }

    #[test]
    fn test_force_resolve_makes_keep_weak() {
        let mut fx = Fixture::new();
        fx.pool.add_installed(pkg("a", "1.0"));

        let job = SolveJob {
            force_resolve: true,
            ..fx.job(SolveMode::Resolve)
        };
        let index = ProviderIndex::build(&fx.pool);
        let vars = Variables::new(&job);
        let generated = RuleGenerator::new(&job, &index, &vars).generate();
        assert_eq!(generated.weak_keeps, vec![1]);
        assert_eq!(generated.rules.count_by_type(RuleType::Keep), 0);

        let a = fx.pool.items()[0].clone();
        fx.ignore.add_installed(a.id());
        let job = SolveJob {
            force_resolve: true,
            ..fx.job(SolveMode::Resolve)
        };
        let vars = Variables::new(&job);
        let generated = RuleGenerator::new(&job, &index, &vars).generate();
        assert_eq!(generated.weak_keeps, vec![1]);
        assert_eq!(generated.rules.count_by_type(RuleType::Keep), 0);
    }

    #[test]
    fn test_ignored_installed_item_keeps_its_replacements() {
        let mut fx = Fixture::new();
        let x = fx.pool.add_installed(pkg("x", "1.0").requires(cap("gone")).conflicts(cap("y")));
        fx.pool.add_available(pkg("x", "2.0"));
        fx.pool.add_available(pkg("y", "1.0")).set_transact(Transact::Install, TransactBy::User);
        fx.ignore.add_installed(x.id());

        let rules = fx.generate(SolveMode::Resolve).rules;
        let keep: Vec<_> = rules.rules_of_type(RuleType::Keep).collect();
        assert_eq!(keep.len(), 1);
        assert_eq!(keep[0].literals(), &[1, 2]);
        assert_eq!(rules.count_by_type(RuleType::Requires), 0);
        assert_eq!(rules.count_by_type(RuleType::Conflicts), 0);
        assert_eq!(rules.count_by_type(RuleType::SameName), 1);
    }

    #[test]
    fn test_architecture_and_vendor_rules() {
        let fx = Fixture::new();
        fx.pool.add_installed(pkg("a", "1.0").with_vendor("openSUSE"));
        let arm = fx.pool.add_available(pkg("b", "1.0").with_arch("aarch64"));
        let other_vendor = fx.pool.add_available(pkg("a", "2.0").with_vendor("Packman"));
        arm.set_transact(Transact::Install, TransactBy::User);
        other_vendor.set_transact(Transact::Install, TransactBy::User);

        let rules = fx.generate(SolveMode::Resolve).rules;
        let arch: Vec<_> = rules.rules_of_type(RuleType::NotInstallable).collect();
        assert_eq!(arch.len(), 1);
        assert_eq!(arch[0].literals(), &[-2]);

        let vendor: Vec<_> = rules.rules_of_type(RuleType::VendorChange).collect();
        assert_eq!(vendor.len(), 1);
        assert_eq!(vendor[0].literals(), &[-3]);
        assert_eq!(vendor[0].related(), Some(1));
    }

    #[test]
    fn test_verify_mode_only_sees_installed_items() {
        let fx = Fixture::new();
        let a = fx.pool.add_available(pkg("a", "1.0"));
        fx.pool.add_installed(pkg("b", "1.0").requires(cap("a")));
        a.set_transact(Transact::Install, TransactBy::User);

        let rules = fx.generate(SolveMode::Verify).rules;
        assert_eq!(rules.count_by_type(RuleType::Job), 0);
        let requires: Vec<_> = rules.rules_of_type(RuleType::Requires).collect();
        assert_eq!(requires[0].literals(), &[-1]);
    }
}
