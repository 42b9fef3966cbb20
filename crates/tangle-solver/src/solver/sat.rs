use std::collections::BTreeSet;
use std::time::Instant;

use log::{debug, info};

use super::policy::Policy;
use super::problem::ProblemBuilder;
use super::rule_generator::{GeneratedRules, ProviderIndex, RuleGenerator, Variables};
use super::rule_set::RuleSet;
use super::solver::{SearchOutcome, Solver};
use super::{Solution, SolveJob, SolveOutcome, SolverAdapter};
use crate::error::Result;
use crate::pool::ResPool;

/// Default [`SolverAdapter`]: a SAT search over rules generated per solve.
///
/// The provider index is kept between solves and rebuilt when items are
/// added to or removed from the pool.
#[derive(Debug)]
pub struct SatResolver {
    pool: ResPool,
    index: Option<ProviderIndex>,
}

impl SatResolver {
    pub fn new(pool: &ResPool) -> Self {
        Self {
            pool: pool.clone(),
            index: None,
        }
    }

    fn index_for(&mut self, pool: &ResPool) -> &ProviderIndex {
        let stale = !self.pool.ptr_eq(pool)
            || self.index.as_ref().map_or(true, |index| !index.is_current(pool));
        if stale {
            debug!("rebuilding provider index for {} items", pool.len());
            self.pool = pool.clone();
            self.index = Some(ProviderIndex::build(pool));
        }
        self.index.get_or_insert_with(|| ProviderIndex::build(pool))
    }

    fn search(
        &self,
        job: &SolveJob<'_>,
        generated: &GeneratedRules,
        rules: &RuleSet,
        vars: &Variables,
        policy: &Policy,
    ) -> Result<SearchOutcome> {
        Solver::new(rules, vars, policy, job.config.max_iterations)
            .with_weak_keeps(&generated.weak_keeps)
            .with_recommends(&generated.recommends)
            .run()
    }

    /// Shrink `core` to a minimal unsatisfiable subset: each rule is
    /// dropped in turn and kept out if the rest stays unsatisfiable.
    fn minimize(
        &self,
        job: &SolveJob<'_>,
        rules: &RuleSet,
        vars: &Variables,
        policy: &Policy,
        core: BTreeSet<u32>,
    ) -> Result<BTreeSet<u32>> {
        let mut reduced = rules.clone();
        reduced.retain_enabled(|id| core.contains(&id));

        let mut minimal = core.clone();
        for id in core {
            reduced.disable(id);
            let outcome = Solver::new(&reduced, vars, policy, job.config.max_iterations).run()?;
            if matches!(outcome, SearchOutcome::Satisfied(_)) {
                reduced.enable(id);
            } else {
                minimal.remove(&id);
            }
        }

        Ok(minimal)
    }

    fn solution(vars: &Variables, installed: &[i32]) -> Solution {
        let installed: BTreeSet<i32> = installed.iter().copied().collect();
        let mut solution = Solution::default();

        for var in vars.all() {
            let item = vars.item(var);
            match (item.status().is_installed(), installed.contains(&var)) {
                (false, true) => solution.install.push(item.id()),
                (true, false) => solution.remove.push(item.id()),
                _ => {}
            }
        }

        solution
    }
}

impl SolverAdapter for SatResolver {
    fn solve(&mut self, job: &SolveJob<'_>) -> Result<SolveOutcome> {
        let start = Instant::now();

        let vars = Variables::new(job);
        let index = self.index_for(job.pool);
        let generated = RuleGenerator::new(job, index, &vars).generate();
        let mut rules = generated.rules.clone();
        info!(
            "Generated {} for {} items ({:?} mode) in {:?}",
            rules.stats(),
            vars.len(),
            job.mode,
            start.elapsed()
        );

        let policy = Policy::for_job(job);
        let mut problems = Vec::new();

        loop {
            match self.search(job, &generated, &rules, &vars, &policy)? {
                SearchOutcome::Satisfied(installed) => {
                    if problems.is_empty() {
                        let solution = Self::solution(&vars, &installed);
                        info!(
                            "Solved in {:?}: {} to install, {} to remove",
                            start.elapsed(),
                            solution.install.len(),
                            solution.remove.len()
                        );
                        return Ok(SolveOutcome::Solved(solution));
                    }
                    break;
                }
                SearchOutcome::Unsatisfiable(touched) => {
                    let core = self.minimize(job, &rules, &vars, &policy, touched)?;
                    let problem = ProblemBuilder::new(&rules, &vars).build(&core);
                    debug!("Problem {}: {}", problems.len() + 1, problem.description);
                    problems.push(problem);

                    if problems.len() >= job.config.max_problems {
                        break;
                    }

                    let victim = core
                        .iter()
                        .filter_map(|&id| rules.get(id))
                        .min_by_key(|rule| (rule.rule_type().relax_rank(), rule.id()))
                        .map(|rule| rule.id());
                    match victim {
                        Some(id) => rules.disable(id),
                        None => break,
                    }
                }
            }
        }

        info!("Found {} problem(s) in {:?}", problems.len(), start.elapsed());
        Ok(SolveOutcome::Unsolvable(problems))
    }

    fn pool_changed(&mut self) {
        self.index = None;
    }
}
