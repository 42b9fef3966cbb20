use std::collections::{BTreeSet, HashMap, HashSet};

use log::trace;

use super::decisions::Decisions;
use super::policy::Policy;
use super::rule::{Literal, Rule, VarId};
use super::rule_generator::Variables;
use super::rule_set::RuleSet;
use super::watch_graph::{PropagateResult, Propagator, WatchGraph};
use crate::error::{ResolverError, Result};

/// Result of one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SearchOutcome {
    /// Variables that end up installed; every other variable is not
    Satisfied(Vec<VarId>),
    /// Ids of every rule the failed search relied on
    Unsatisfiable(BTreeSet<u32>),
}

/// Conflict-driven search over a rule set.
///
/// Propagation runs first; then the first enabled rule that still needs
/// a positive literal is decided, candidates ordered by the policy.
/// Weak keeps and recommends are decided next. When nothing is left to
/// choose, undecided variables are not installed.
///
/// A conflict is analysed down to its first unique implication point.
/// The learned rule is added to the search, which jumps back to the
/// level where that rule forces a literal. A conflict at level 1 proves
/// the rules unsatisfiable.
pub(crate) struct Solver<'a> {
    rules: &'a RuleSet,
    vars: &'a Variables,
    policy: &'a Policy,
    weak_keeps: &'a [VarId],
    recommends: &'a [(VarId, Vec<VarId>)],
    max_iterations: u32,
}

struct SolverState {
    /// Input rules followed by the learned ones
    rules: RuleSet,
    decisions: Decisions,
    watch_graph: WatchGraph,
    /// Index of the next decision to propagate
    propagate_index: usize,
    /// Input rules used as a reason or found in conflict
    touched: BTreeSet<u32>,
}

impl SolverState {
    fn reset_propagate_index(&mut self) {
        self.propagate_index = self.decisions.len();
    }
}

/// Outcome of conflict analysis
struct Learned {
    /// The literal to assert first, then the others
    literals: Vec<Literal>,
    /// Level to jump back to
    level: u32,
}

impl<'a> Solver<'a> {
    pub fn new(rules: &'a RuleSet, vars: &'a Variables, policy: &'a Policy, max_iterations: u32) -> Self {
        Self {
            rules,
            vars,
            policy,
            weak_keeps: &[],
            recommends: &[],
            max_iterations,
        }
    }

    pub fn with_weak_keeps(mut self, weak_keeps: &'a [VarId]) -> Self {
        self.weak_keeps = weak_keeps;
        self
    }

    pub fn with_recommends(mut self, recommends: &'a [(VarId, Vec<VarId>)]) -> Self {
        self.recommends = recommends;
        self
    }

    pub fn run(&self) -> Result<SearchOutcome> {
        let rules = self.rules.clone();
        let mut state = SolverState {
            decisions: Decisions::with_capacity(self.vars.len()),
            watch_graph: WatchGraph::from_rules(&rules),
            rules,
            propagate_index: 0,
            touched: BTreeSet::new(),
        };

        if !self.process_assertions(&mut state) {
            return Ok(SearchOutcome::Unsatisfiable(state.touched));
        }

        let mut iterations = 0u32;
        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(ResolverError::SolverAborted {
                    iterations: self.max_iterations,
                });
            }

            if let Err(conflict) = self.propagate(&mut state) {
                trace!("conflict in rule {} at level {}", conflict, state.decisions.level());
                self.touch(&mut state.touched, conflict);
                if state.decisions.level() <= 1 {
                    return Ok(SearchOutcome::Unsatisfiable(state.touched));
                }

                let learned = self.analyze_conflict(&state, conflict);
                state.decisions.revert_to_level(learned.level);
                state.reset_propagate_index();
                self.learn(&mut state, learned.literals);
                continue;
            }

            let Some(literal) = self.select_next(&state.decisions) else {
                break;
            };

            state.decisions.increment_level();
            state.decisions.decide(literal, None);
        }

        let installed: Vec<VarId> = state.decisions.installed_vars().collect();
        debug_assert!(self.all_satisfied(&installed), "search ended with a violated rule");
        Ok(SearchOutcome::Satisfied(installed))
    }

    /// Learned rules stand for the input rules they were derived from,
    /// which were touched on the way.
    fn touch(&self, touched: &mut BTreeSet<u32>, rule_id: u32) {
        if (rule_id as usize) < self.rules.len() {
            touched.insert(rule_id);
        }
    }

    /// Decide every assertion at level 1. An enabled empty rule, or two
    /// assertions on opposite literals, make the rules unsatisfiable.
    fn process_assertions(&self, state: &mut SolverState) -> bool {
        state.decisions.increment_level();

        if let Some(empty) = self.rules.enabled().find(|r| r.literals().is_empty()) {
            state.touched.insert(empty.id());
            return false;
        }

        for rule in self.rules.assertions() {
            state.touched.insert(rule.id());
            if !state.decisions.decide(rule.literals()[0], Some(rule.id())) {
                return false;
            }
        }

        true
    }

    /// Unit propagation of every decision not yet propagated
    fn propagate(&self, state: &mut SolverState) -> std::result::Result<(), u32> {
        while state.propagate_index < state.decisions.len() {
            let literal = state.decisions.queue()[state.propagate_index];
            state.propagate_index += 1;

            let results = {
                let mut propagator = Propagator::new(&mut state.watch_graph, &state.rules);
                propagator.propagate(literal, &state.decisions)
            };

            for result in results {
                match result {
                    PropagateResult::Unit(unit, rule_id) => {
                        self.touch(&mut state.touched, rule_id);
                        if !state.decisions.decide(unit, Some(rule_id)) {
                            return Err(rule_id);
                        }
                    }
                    PropagateResult::Conflict(rule_id) => return Err(rule_id),
                }
            }
        }

        Ok(())
    }

    /// First-UIP analysis. The conflicting rule is resolved with the
    /// reasons of its current-level literals, newest first, until a single
    /// current-level literal is left. Level-1 literals are dropped from the
    /// learned rule; they never change.
    fn analyze_conflict(&self, state: &SolverState, conflict: u32) -> Learned {
        let decisions = &state.decisions;
        let level = decisions.level();
        let queue = decisions.queue();
        let positions: HashMap<VarId, usize> =
            queue.iter().enumerate().map(|(idx, &l)| (l.abs(), idx)).collect();

        let mut seen: HashSet<VarId> = HashSet::new();
        let mut literals = vec![0];
        let mut open = 0usize;
        let mut index = queue.len();
        let mut clause = self.reason_literals(state, conflict, None, &positions);

        loop {
            for literal in clause {
                if !seen.insert(literal.abs()) {
                    continue;
                }
                match decisions.decision_level(literal) {
                    Some(l) if l == level => open += 1,
                    Some(l) if l > 1 => literals.push(literal),
                    _ => {}
                }
            }

            // every current-level literal but the level's decision has a reason
            let current = loop {
                index -= 1;
                let literal = queue[index];
                if seen.contains(&literal.abs()) && decisions.decision_level(literal) == Some(level) {
                    break literal;
                }
            };
            open -= 1;

            match decisions.decision_rule(current) {
                Some(reason) if open > 0 => {
                    clause = self.reason_literals(state, reason, Some(current), &positions);
                }
                _ => {
                    literals[0] = -current;
                    break;
                }
            }
        }

        // watch the asserted literal and the newest of the others
        let mut backjump = 1;
        let newest = literals
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, &l)| (idx, decisions.decision_level(l).unwrap_or(1)))
            .max_by_key(|&(_, l)| l);
        if let Some((idx, l)) = newest {
            literals.swap(1, idx);
            backjump = l;
        }

        trace!("learned {:?}, back to level {}", literals, backjump);
        Learned {
            literals,
            level: backjump,
        }
    }

    /// False literals of `rule_id` that explain a conflict, or that forced
    /// `implied`. A same-name rule only excludes pairs: it is explained by
    /// its earliest installed member.
    fn reason_literals(
        &self,
        state: &SolverState,
        rule_id: u32,
        implied: Option<Literal>,
        positions: &HashMap<VarId, usize>,
    ) -> Vec<Literal> {
        let Some(rule) = state.rules.get(rule_id) else {
            return Vec::new();
        };
        let implied_var = implied.map(|l| l.abs());
        let others = rule
            .literals()
            .iter()
            .copied()
            .filter(move |&l| Some(l.abs()) != implied_var);

        if !rule.is_multi_conflict() {
            return others.collect();
        }

        let falsified = others.filter(|&l| state.decisions.conflict(l));
        match implied {
            None => falsified.collect(),
            Some(_) => falsified
                .min_by_key(|l| positions.get(&l.abs()).copied().unwrap_or(usize::MAX))
                .into_iter()
                .collect(),
        }
    }

    /// Add a learned rule and assert its first literal
    fn learn(&self, state: &mut SolverState, literals: Vec<Literal>) {
        let Some(&asserted) = literals.first() else {
            return;
        };

        let next_id = state.rules.len() as u32;
        let id = state.rules.add(Rule::learned(literals));
        if id == next_id {
            if let Some(rule) = state.rules.get(id) {
                state.watch_graph.add_rule(rule);
            }
        }

        state.decisions.decide(asserted, Some(id));
    }

    fn select_next(&self, decisions: &Decisions) -> Option<Literal> {
        for rule in self.rules.enabled() {
            if rule.is_multi_conflict() {
                continue;
            }

            let literals = rule.literals();
            if literals.iter().any(|&l| decisions.satisfied(l)) {
                continue;
            }
            // a rule with an open negative literal is satisfied by leaving it out
            if literals.iter().any(|&l| l < 0 && decisions.undecided(-l)) {
                continue;
            }

            let candidates: Vec<VarId> = literals
                .iter()
                .copied()
                .filter(|&l| l > 0 && decisions.undecided(l))
                .collect();
            if let Some(&best) = self.policy.select_preferred(self.vars, &candidates).first() {
                return Some(best);
            }
        }

        for &var in self.weak_keeps {
            if decisions.undecided(var) {
                if self.policy.avoids(self.vars.item(var).id()) {
                    return Some(-var);
                }
                return Some(var);
            }
        }

        for (source, providers) in self.recommends {
            if !decisions.decided_install(*source)
                || providers.iter().any(|&p| decisions.decided_install(p))
            {
                continue;
            }
            let open: Vec<VarId> = providers
                .iter()
                .copied()
                .filter(|&p| decisions.undecided(p))
                .collect();
            if let Some(&best) = self.policy.select_preferred(self.vars, &open).first() {
                return Some(best);
            }
        }

        None
    }

    fn all_satisfied(&self, installed: &[VarId]) -> bool {
        let installed: HashSet<VarId> = installed.iter().copied().collect();
        self.rules.enabled().all(|rule| {
            rule.literals().iter().any(|&l| {
                if l > 0 {
                    installed.contains(&l)
                } else {
                    !installed.contains(&-l)
                }
            })
        })
    }
}
