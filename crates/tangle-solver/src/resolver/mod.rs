//! The resolution session.
//!
//! A [`Resolver`] is bound to a pool and owns everything a solve needs
//! besides it: the solver adapter, the extra requires and conflicts, the
//! ignore rules and the problems of the last failed solve. Callers loop
//! over [`Resolver::resolve_pool`], [`Resolver::problems`] and
//! [`Resolver::apply_solutions`] until the pool resolves.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::mem;

use log::{debug, info};

use crate::capability::{Capability, CapabilitySet};
use crate::config::{OnlyRequires, ResolverConfig};
use crate::error::{ResolverError, Result};
use crate::item::{Transact, TransactBy};
use crate::pool::{ItemId, PoolItem, ResPool, SerialWatcher};
use crate::problem::{ProblemSolution, ResolverProblem, SolutionAction};
use crate::solver::{
    SatResolver, Solution, SolveJob, SolveMode, SolveOutcome, SolverAdapter, Transaction,
};

mod ignore;
mod upgrade;

pub use ignore::IgnoreRules;
pub use upgrade::UpgradeStatistics;

/// Builds the solver adapter for a newly bound pool
pub type AdapterFactory = Box<dyn Fn(&ResPool, &ResolverConfig) -> Result<Box<dyn SolverAdapter>>>;

fn sat_adapter() -> AdapterFactory {
    Box::new(
        |pool: &ResPool, _config: &ResolverConfig| -> Result<Box<dyn SolverAdapter>> {
            Ok(Box::new(SatResolver::new(pool)))
        },
    )
}

/// Stateful dependency resolution over a shared pool.
///
/// Solver decisions are written to the pool as `Solver` transactions and
/// are taken as preferences by the next solve. Configuration changes,
/// and any change of the pool watermark, invalidate the last result.
pub struct Resolver {
    pool: Option<ResPool>,
    config: ResolverConfig,
    adapter: Option<Box<dyn SolverAdapter>>,
    factory: AdapterFactory,

    /// Pool serial right after the last successful solve
    pool_watcher: SerialWatcher,
    /// Pool content serial last reported to the adapter
    content_watcher: SerialWatcher,

    extra_requires: CapabilitySet,
    extra_conflicts: CapabilitySet,
    ignore: IgnoreRules,
    /// Ignore-installed entries added by the upgrade pass for unmaintained items
    upgrade_ignored: BTreeSet<ItemId>,

    problems: Vec<ResolverProblem>,
    problem_items: Vec<PoolItem>,
    unmaintained_items: Vec<PoolItem>,
    transaction: Option<Transaction>,
    solved: bool,

    force_resolve: bool,
    upgrade_mode: bool,
    verifying: bool,
    testing: bool,
    only_requires: OnlyRequires,
}

impl Default for Resolver {
    /// An unbound session; call [`Resolver::set_pool`] before solving
    fn default() -> Self {
        Self {
            pool: None,
            config: ResolverConfig::default(),
            adapter: None,
            factory: sat_adapter(),
            pool_watcher: SerialWatcher::default(),
            content_watcher: SerialWatcher::default(),
            extra_requires: CapabilitySet::new(),
            extra_conflicts: CapabilitySet::new(),
            ignore: IgnoreRules::default(),
            upgrade_ignored: BTreeSet::new(),
            problems: Vec::new(),
            problem_items: Vec::new(),
            unmaintained_items: Vec::new(),
            transaction: None,
            solved: false,
            force_resolve: false,
            upgrade_mode: false,
            verifying: false,
            testing: false,
            only_requires: OnlyRequires::default(),
        }
    }
}

impl Resolver {
    pub fn new(pool: &ResPool) -> Result<Self> {
        Self::with_config(pool, ResolverConfig::default())
    }

    pub fn with_config(pool: &ResPool, config: ResolverConfig) -> Result<Self> {
        Self::with_adapter_factory(pool, config, sat_adapter())
    }

    /// Session using a custom solver adapter
    pub fn with_adapter_factory(
        pool: &ResPool,
        config: ResolverConfig,
        factory: AdapterFactory,
    ) -> Result<Self> {
        config.validate()?;
        let mut resolver = Self {
            config,
            factory,
            ..Self::default()
        };
        resolver.set_pool(pool)?;
        Ok(resolver)
    }

    /// Bind another pool. Ignore rules and extra constraints are kept; the
    /// adapter is recreated and the last result is dropped.
    pub fn set_pool(&mut self, pool: &ResPool) -> Result<()> {
        let adapter = (self.factory)(pool, &self.config)?;
        debug!("Binding resolver to pool with {} items", pool.len());

        self.pool = Some(pool.clone());
        self.adapter = Some(adapter);
        self.content_watcher.forget();
        self.clear_result();
        Ok(())
    }

    pub fn pool(&self) -> Option<&ResPool> {
        self.pool.as_ref()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn bound_pool(&self) -> Result<ResPool> {
        self.pool.clone().ok_or(ResolverError::NoPool)
    }

    fn invalidate(&mut self) {
        self.solved = false;
        self.pool_watcher.forget();
    }

    fn clear_result(&mut self) {
        self.invalidate();
        self.problems.clear();
        self.problem_items.clear();
        self.unmaintained_items.clear();
        self.transaction = None;
    }

    // Extra constraints

    pub fn extra_requires(&self) -> &CapabilitySet {
        &self.extra_requires
    }

    pub fn extra_conflicts(&self) -> &CapabilitySet {
        &self.extra_conflicts
    }

    pub fn add_extra_require(&mut self, capability: Capability) -> bool {
        let changed = self.extra_requires.insert(capability);
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn remove_extra_require(&mut self, capability: &Capability) -> bool {
        let changed = self.extra_requires.remove(capability);
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn add_extra_conflict(&mut self, capability: Capability) -> bool {
        let changed = self.extra_conflicts.insert(capability);
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn remove_extra_conflict(&mut self, capability: &Capability) -> bool {
        let changed = self.extra_conflicts.remove(capability);
        if changed {
            self.invalidate();
        }
        changed
    }

    // Ignore rules

    pub fn ignore_rules(&self) -> &IgnoreRules {
        &self.ignore
    }

    fn ignore_changed(&mut self, changed: bool) -> bool {
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn add_ignore_conflict(&mut self, item: &PoolItem, capability: Capability) -> bool {
        let changed = self.ignore.add_conflict(item.id(), capability);
        self.ignore_changed(changed)
    }

    pub fn add_ignore_requires(&mut self, item: &PoolItem, capability: Capability) -> bool {
        let changed = self.ignore.add_requires(item.id(), capability);
        self.ignore_changed(changed)
    }

    pub fn add_ignore_obsoletes(&mut self, item: &PoolItem, capability: Capability) -> bool {
        let changed = self.ignore.add_obsoletes(item.id(), capability);
        self.ignore_changed(changed)
    }

    pub fn add_ignore_installed_item(&mut self, item: &PoolItem) -> bool {
        let changed = self.ignore.add_installed(item.id());
        self.ignore_changed(changed)
    }

    pub fn add_ignore_architecture_item(&mut self, item: &PoolItem) -> bool {
        let changed = self.ignore.add_architecture(item.id());
        self.ignore_changed(changed)
    }

    pub fn add_ignore_vendor_item(&mut self, item: &PoolItem) -> bool {
        let changed = self.ignore.add_vendor(item.id());
        self.ignore_changed(changed)
    }

    // Flags

    pub fn force_resolve(&self) -> bool {
        self.force_resolve
    }

    /// Let the solver drop installed items instead of reporting problems.
    /// Results may then remove items the user did not ask to remove.
    pub fn set_force_resolve(&mut self, force: bool) {
        if self.force_resolve != force {
            self.force_resolve = force;
            self.invalidate();
        }
    }

    pub fn only_requires(&self) -> OnlyRequires {
        self.only_requires
    }

    pub fn set_only_requires(&mut self, only_requires: OnlyRequires) {
        if self.only_requires != only_requires {
            self.only_requires = only_requires;
            self.invalidate();
        }
    }

    pub fn testing(&self) -> bool {
        self.testing
    }

    /// In testing mode solves compute a transaction but leave the pool alone
    pub fn set_testing(&mut self, testing: bool) {
        if self.testing != testing {
            self.testing = testing;
            self.invalidate();
        }
    }

    pub fn is_verifying(&self) -> bool {
        self.verifying
    }

    pub fn is_upgrade_mode(&self) -> bool {
        self.upgrade_mode
    }

    // Results

    /// Problems of the last failed solve; empty after a successful one
    pub fn problems(&self) -> &[ResolverProblem] {
        &self.problems
    }

    /// Installed items the last upgrade could not handle
    pub fn problematic_update_items(&self) -> &[PoolItem] {
        &self.problem_items
    }

    /// Installed items the last upgrade found to be broken without a replacement
    pub fn unmaintained_items(&self) -> &[PoolItem] {
        &self.unmaintained_items
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// The last solve succeeded and nothing changed since
    pub fn is_solved(&self) -> bool {
        self.solved
            && self
                .pool
                .as_ref()
                .is_some_and(|pool| self.pool_watcher.is_clean(pool.serial()))
    }

    // Solving

    /// Resolve the pool with the current constraints.
    ///
    /// Returns `Ok(false)` when the pool cannot be resolved; the reasons
    /// are then in [`Resolver::problems`].
    pub fn resolve_pool(&mut self) -> Result<bool> {
        self.bound_pool()?;
        if self.is_solved() {
            debug!("Pool unchanged since the last solve");
            return Ok(true);
        }
        let mode = if self.upgrade_mode {
            SolveMode::Upgrade
        } else {
            SolveMode::Resolve
        };
        self.solve(mode)
    }

    /// Check that the installed items are consistent, ignoring every
    /// pending install.
    pub fn verify_system(&mut self) -> Result<bool> {
        self.bound_pool()?;
        self.verifying = true;
        let result = self.solve(SolveMode::Verify);
        self.verifying = false;
        result
    }

    fn solve(&mut self, mode: SolveMode) -> Result<bool> {
        let pool = self.bound_pool()?;

        if self.content_watcher.remember(pool.content_serial()) {
            if let Some(adapter) = self.adapter.as_mut() {
                adapter.pool_changed();
            }
        }

        let previous: BTreeMap<ItemId, Transact> = pool
            .items()
            .iter()
            .filter(|item| {
                let status = item.status();
                status.is_transacting() && status.transact_by() == TransactBy::Solver
            })
            .map(|item| (item.id(), item.status().transact()))
            .collect();

        let job = SolveJob {
            pool: &pool,
            mode,
            extra_requires: &self.extra_requires,
            extra_conflicts: &self.extra_conflicts,
            ignore: &self.ignore,
            only_requires: self.only_requires.effective(self.config.only_requires),
            force_resolve: self.force_resolve,
            config: &self.config,
            previous: &previous,
        };

        let adapter = self.adapter.as_mut().ok_or(ResolverError::NoPool)?;
        let outcome = adapter.solve(&job)?;

        match outcome {
            SolveOutcome::Solved(solution) => {
                let transaction = Transaction::from_solution(&pool, &solution);
                if self.testing {
                    debug!("Testing mode, pool left untouched: {}", transaction.summary());
                } else {
                    Self::apply_solution(&pool, &solution);
                }
                self.problems.clear();
                self.transaction = Some(transaction);
                self.solved = mode != SolveMode::Verify;
                self.pool_watcher.remember(pool.serial());
                Ok(true)
            }
            SolveOutcome::Unsolvable(problems) => {
                info!("Resolving failed with {} problem(s)", problems.len());
                self.problems = problems;
                self.transaction = None;
                self.invalidate();
                Ok(false)
            }
        }
    }

    /// Record a solution as `Solver` transactions, replacing those of the
    /// previous solve
    fn apply_solution(pool: &ResPool, solution: &Solution) {
        for item in pool.items() {
            let status = item.status();
            if status.is_transacting()
                && status.transact_by() == TransactBy::Solver
                && !solution.install.contains(&item.id())
                && !solution.remove.contains(&item.id())
            {
                item.reset_transact(TransactBy::Solver);
            }
        }

        for &id in &solution.install {
            if let Some(item) = pool.get(id) {
                item.set_transact(Transact::Install, TransactBy::Solver);
            }
        }
        for &id in &solution.remove {
            if let Some(item) = pool.get(id) {
                item.set_transact(Transact::Remove, TransactBy::Solver);
            }
        }
    }

    /// Cancel every transaction the solver or the upgrade pass made, and
    /// the ignore-installed entries the upgrade pass added for unmaintained
    /// items. Extra constraints and the caller's ignore rules stay.
    pub fn undo(&mut self) {
        if let Some(pool) = &self.pool {
            for item in pool.items() {
                if item.status().transact_by() < TransactBy::User {
                    item.reset_transact(TransactBy::Upgrade);
                }
            }
        }
        for id in mem::take(&mut self.upgrade_ignored) {
            self.ignore.remove_installed(id);
        }
        self.upgrade_mode = false;
        self.clear_result();
    }

    /// Drop ignore rules and results; extra constraints too unless
    /// `keep_extras` is set. Item statuses are left alone.
    pub fn reset(&mut self, keep_extras: bool) {
        self.ignore.clear();
        self.upgrade_ignored.clear();
        if !keep_extras {
            self.extra_requires.clear();
            self.extra_conflicts.clear();
        }
        self.upgrade_mode = false;
        self.verifying = false;
        self.clear_result();
    }

    // Solutions

    /// Apply the actions of `solutions` in order. Actions on items that
    /// are no longer in the pool, or that change nothing, are skipped.
    /// Returns the number of actions applied. The pool is not re-solved.
    pub fn apply_solutions(&mut self, solutions: &[ProblemSolution]) -> Result<usize> {
        let pool = self.bound_pool()?;
        let mut applied = 0;

        for solution in solutions {
            debug!("Applying solution: {}", solution.description);
            for action in &solution.actions {
                if self.apply_action(&pool, action) {
                    applied += 1;
                } else {
                    debug!("Skipping stale or redundant action {}", action);
                }
            }
        }

        if applied > 0 {
            self.invalidate();
        }
        Ok(applied)
    }

    fn apply_action(&mut self, pool: &ResPool, action: &SolutionAction) -> bool {
        let item = match action.item() {
            Some(id) => match pool.get(id) {
                Some(item) => Some(item),
                None => return false,
            },
            None => None,
        };

        match (action, item) {
            (SolutionAction::KeepItem(_), Some(item)) => item.reset_transact(TransactBy::User),
            (SolutionAction::Uninstall(_), Some(item)) => {
                item.set_transact(Transact::Remove, TransactBy::User)
            }
            (SolutionAction::Install(_), Some(item)) => {
                item.set_transact(Transact::Install, TransactBy::User)
            }
            (SolutionAction::IgnoreRequires(id, cap), _) => self.ignore.add_requires(*id, cap.clone()),
            (SolutionAction::IgnoreConflict(id, cap), _) => self.ignore.add_conflict(*id, cap.clone()),
            (SolutionAction::IgnoreObsoletes(id, cap), _) => {
                self.ignore.add_obsoletes(*id, cap.clone())
            }
            (SolutionAction::IgnoreInstalled(id), _) => self.ignore.add_installed(*id),
            (SolutionAction::IgnoreArchitecture(id), _) => self.ignore.add_architecture(*id),
            (SolutionAction::IgnoreVendor(id), _) => self.ignore.add_vendor(*id),
            (SolutionAction::RemoveExtraRequire(cap), _) => self.extra_requires.remove(cap),
            (SolutionAction::RemoveExtraConflict(cap), _) => self.extra_conflicts.remove(cap),
            _ => false,
        }
    }

    /// Human readable state of the session
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("pool", &self.pool)
            .field("extra_requires", &self.extra_requires)
            .field("extra_conflicts", &self.extra_conflicts)
            .field("ignore", &self.ignore)
            .field("problems", &self.problems.len())
            .field("solved", &self.solved)
            .field("force_resolve", &self.force_resolve)
            .field("upgrade_mode", &self.upgrade_mode)
            .field("testing", &self.testing)
            .field("only_requires", &self.only_requires)
            .finish()
    }
}

impl fmt::Display for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pool {
            Some(pool) => writeln!(f, "Resolver for {} items (serial {})", pool.len(), pool.serial())?,
            None => writeln!(f, "Resolver without pool")?,
        }
        writeln!(
            f,
            "  solved: {}, force-resolve: {}, upgrade-mode: {}, testing: {}, only-requires: {:?}",
            self.is_solved(),
            self.force_resolve,
            self.upgrade_mode,
            self.testing,
            self.only_requires
        )?;
        for cap in &self.extra_requires {
            writeln!(f, "  extra require {}", cap)?;
        }
        for cap in &self.extra_conflicts {
            writeln!(f, "  extra conflict {}", cap)?;
        }
        write!(f, "{}", self.ignore)?;
        for (i, problem) in self.problems.iter().enumerate() {
            writeln!(f, "Problem {}: {}", i + 1, problem)?;
        }
        Ok(())
    }
}
