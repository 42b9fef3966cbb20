use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::rule::{Rule, RuleType};

/// Collection of SAT rules.
///
/// Rules get sequential ids in insertion order. A rule with the same type
/// and literals as an existing one is not added twice.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,

    /// Rules by type for iteration
    rules_by_type: HashMap<RuleType, Vec<u32>>,

    /// Hash map for deduplication
    rule_hashes: HashMap<u64, Vec<u32>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, returning its id. Returns the existing id for a duplicate.
    pub fn add(&mut self, mut rule: Rule) -> u32 {
        let hash = rule.literal_hash();
        if let Some(candidates) = self.rule_hashes.get(&hash) {
            for &existing_id in candidates {
                if let Some(existing) = self.get(existing_id) {
                    if existing.equals_literals(&rule) {
                        return existing_id;
                    }
                }
            }
        }

        let id = self.rules.len() as u32;
        rule.set_id(id);

        self.rules_by_type.entry(rule.rule_type()).or_default().push(id);
        self.rule_hashes.entry(hash).or_default().push(id);
        self.rules.push(rule);

        id
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Rule> {
        self.rules.get_mut(id as usize)
    }

    pub fn rules_of_type(&self, rule_type: RuleType) -> impl Iterator<Item = &Rule> {
        self.rules_by_type
            .get(&rule_type)
            .into_iter()
            .flatten()
            .filter_map(move |&id| self.get(id))
    }

    /// All rules in id order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Enabled rules in id order
    pub fn enabled(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_enabled())
    }

    /// Enabled single-literal rules
    pub fn assertions(&self) -> impl Iterator<Item = &Rule> {
        self.enabled().filter(|r| r.is_assertion())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn count_by_type(&self, rule_type: RuleType) -> usize {
        self.rules_by_type.get(&rule_type).map(|v| v.len()).unwrap_or(0)
    }

    pub fn disable(&mut self, id: u32) {
        if let Some(rule) = self.get_mut(id) {
            rule.disable();
        }
    }

    pub fn enable(&mut self, id: u32) {
        if let Some(rule) = self.get_mut(id) {
            rule.enable();
        }
    }

    /// Disable every rule whose id is not accepted by `keep`
    pub fn retain_enabled(&mut self, mut keep: impl FnMut(u32) -> bool) {
        for rule in &mut self.rules {
            if !keep(rule.id()) {
                rule.disable();
            }
        }
    }

    pub fn stats(&self) -> RuleSetStats {
        let mut stats = RuleSetStats {
            total: self.rules.len(),
            ..RuleSetStats::default()
        };

        for rule in &self.rules {
            *stats.by_type.entry(rule.rule_type()).or_default() += 1;
            if rule.is_assertion() {
                stats.assertions += 1;
            }
            if rule.is_disabled() {
                stats.disabled += 1;
            }
        }

        stats
    }
}

/// Statistics about a rule set
#[derive(Debug, Default)]
pub struct RuleSetStats {
    pub total: usize,
    pub assertions: usize,
    pub disabled: usize,
    pub by_type: BTreeMap<RuleType, usize>,
}

impl fmt::Display for RuleSetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rules ({} assertions", self.total, self.assertions)?;
        for (rule_type, count) in &self.by_type {
            write!(f, ", {} {}", count, rule_type)?;
        }
        write!(f, ")")
    }
}
