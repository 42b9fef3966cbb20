//! SAT-based solver adapter.
//!
//! The session talks to the solver only through [`SolverAdapter`]: it
//! hands over a [`SolveJob`] describing the pool and every session-level
//! constraint, and gets back either the full target state or the problems
//! that prevent one.
//!
//! The default adapter, [`SatResolver`], works in four steps:
//!
//! 1. **Rule generation**: jobs, keep rules for installed items and the
//!    dependency rules of every item reachable from them become clauses
//! 2. **Unit propagation** over two watched literals
//! 3. **Decisions** driven by [`Policy`], with chronological backtracking
//! 4. **Problem extraction**: when the search fails, the rules it touched
//!    are shrunk to a minimal unsatisfiable core, reported, relaxed, and
//!    the search runs again

use std::collections::BTreeMap;

use crate::capability::CapabilitySet;
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::item::Transact;
use crate::pool::{ItemId, ResPool};
use crate::problem::ResolverProblem;
use crate::resolver::IgnoreRules;

mod decisions;
mod policy;
mod problem;
mod rule;
mod rule_generator;
mod rule_set;
mod sat;
#[allow(clippy::module_inception)]
mod solver;
mod transaction;
mod watch_graph;

pub use decisions::Decisions;
pub use policy::Policy;
pub use rule::{Literal, Rule, RuleType, VarId};
pub use rule_generator::ProviderIndex;
pub use rule_set::{RuleSet, RuleSetStats};
pub use sat::SatResolver;
pub use transaction::{Operation, Transaction, TransactionSummary};
pub use watch_graph::{PropagateResult, Propagator, WatchGraph};

/// What the solver is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveMode {
    /// Honour jobs, keep installed items where possible
    #[default]
    Resolve,
    /// Check the installed set only; jobs are ignored
    Verify,
    /// Like `Resolve`, but newer editions win over installed ones
    Upgrade,
}

/// Everything the adapter needs for one solve
#[derive(Debug, Clone, Copy)]
pub struct SolveJob<'a> {
    pub pool: &'a ResPool,
    pub mode: SolveMode,
    pub extra_requires: &'a CapabilitySet,
    pub extra_conflicts: &'a CapabilitySet,
    pub ignore: &'a IgnoreRules,
    /// Effective only-requires flag: recommends are skipped when set
    pub only_requires: bool,
    /// Installed items may be dropped to reach a solution
    pub force_resolve: bool,
    pub config: &'a ResolverConfig,
    /// Transactions the solver chose in the previous solve, used as preferences
    pub previous: &'a BTreeMap<ItemId, Transact>,
}

/// Target state of a successful solve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    /// Items not installed now that must be installed
    pub install: Vec<ItemId>,
    /// Installed items that must be removed
    pub remove: Vec<ItemId>,
}

impl Solution {
    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.remove.is_empty()
    }
}

/// Result of a solve
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Solved(Solution),
    Unsolvable(Vec<ResolverProblem>),
}

/// Boundary between the resolution session and a SAT engine
pub trait SolverAdapter {
    /// Compute the target state for `job`, or the problems preventing one
    fn solve(&mut self, job: &SolveJob<'_>) -> Result<SolveOutcome>;

    /// The bound pool's content changed; drop anything derived from it
    fn pool_changed(&mut self);
}

#[cfg(test)]
mod tests;
