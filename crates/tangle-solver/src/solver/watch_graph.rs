use std::mem;

use super::decisions::Decisions;
use super::rule::{Literal, Rule};
use super::rule_set::RuleSet;

/// Two-watched-literals index for unit propagation.
///
/// Every enabled rule with two or more literals watches two of them; the
/// pair is stored per rule so both watch lists always agree on it.
/// Same-name rules watch all of their literals instead.
#[derive(Debug, Default)]
pub struct WatchGraph {
    /// literal index -> ids of rules watching that literal
    watches: Vec<Vec<u32>>,

    /// rule id -> its two watched literals
    pairs: Vec<Option<[Literal; 2]>>,
}

impl WatchGraph {
    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn watches_mut(&mut self, literal: Literal) -> &mut Vec<u32> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    pub fn from_rules(rules: &RuleSet) -> Self {
        let mut graph = Self {
            watches: Vec::new(),
            pairs: vec![None; rules.len()],
        };

        for rule in rules.enabled() {
            graph.add_rule(rule);
        }

        graph
    }

    pub fn add_rule(&mut self, rule: &Rule) {
        let literals = rule.literals();
        if literals.len() < 2 {
            return;
        }

        let id = rule.id();
        if rule.is_multi_conflict() {
            for &literal in literals {
                self.watches_mut(literal).push(id);
            }
            return;
        }

        let pair = [literals[0], literals[1]];
        if id as usize >= self.pairs.len() {
            self.pairs.resize(id as usize + 1, None);
        }
        self.pairs[id as usize] = Some(pair);
        self.watches_mut(pair[0]).push(id);
        self.watches_mut(pair[1]).push(id);
    }

    pub fn watch_count(&self, literal: Literal) -> usize {
        self.watches
            .get(Self::literal_to_index(literal))
            .map(|w| w.len())
            .unwrap_or(0)
    }
}

/// Outcome of propagating one decided literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagateResult {
    /// Literal forced by a rule
    Unit(Literal, u32),
    /// Every literal of the rule is false
    Conflict(u32),
}

/// Runs unit propagation for decided literals over a watch graph
pub struct Propagator<'a> {
    graph: &'a mut WatchGraph,
    rules: &'a RuleSet,
}

impl<'a> Propagator<'a> {
    pub fn new(graph: &'a mut WatchGraph, rules: &'a RuleSet) -> Self {
        Self { graph, rules }
    }

    /// Visit the rules watching the negation of `literal`, which just
    /// became false. Forced literals are reported as units; the first
    /// conflicting rule ends the visit.
    pub fn propagate(&mut self, literal: Literal, decisions: &Decisions) -> Vec<PropagateResult> {
        let rules = self.rules;
        let false_literal = -literal;
        let idx = WatchGraph::literal_to_index(false_literal);
        if idx >= self.graph.watches.len() {
            return Vec::new();
        }

        let watching = mem::take(&mut self.graph.watches[idx]);
        let mut kept = Vec::with_capacity(watching.len());
        let mut results = Vec::new();
        let mut conflict = None;

        for rule_id in watching {
            if conflict.is_some() {
                kept.push(rule_id);
                continue;
            }

            let Some(rule) = rules.get(rule_id) else {
                continue;
            };
            if rule.is_disabled() {
                kept.push(rule_id);
                continue;
            }

            if rule.is_multi_conflict() {
                kept.push(rule_id);
                for &other in rule.literals() {
                    if other == false_literal {
                        continue;
                    }
                    match decisions.value(other) {
                        Some(true) => {}
                        Some(false) => {
                            conflict = Some(rule_id);
                            break;
                        }
                        None => results.push(PropagateResult::Unit(other, rule_id)),
                    }
                }
                continue;
            }

            let Some(pair) = self.graph.pairs.get(rule_id as usize).copied().flatten() else {
                continue;
            };
            let other = if pair[0] == false_literal { pair[1] } else { pair[0] };

            if decisions.value(other) == Some(true) {
                kept.push(rule_id);
                continue;
            }

            // look for a replacement watch that is not false
            let replacement = rule
                .literals()
                .iter()
                .copied()
                .find(|&l| l != false_literal && l != other && decisions.value(l) != Some(false));

            match replacement {
                Some(new_watch) => {
                    self.graph.pairs[rule_id as usize] = Some([other, new_watch]);
                    self.graph.watches_mut(new_watch).push(rule_id);
                }
                None => {
                    kept.push(rule_id);
                    match decisions.value(other) {
                        None => results.push(PropagateResult::Unit(other, rule_id)),
                        _ => conflict = Some(rule_id),
                    }
                }
            }
        }

        self.graph.watches[idx] = kept;

        if let Some(rule_id) = conflict {
            results.push(PropagateResult::Conflict(rule_id));
        }
        results
    }
}
