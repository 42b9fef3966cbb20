use super::rule::{Literal, VarId};

/// Assignment state of the search.
///
/// `decision_map` is indexed by variable: 0 = undecided, `+(level + 1)` =
/// installed at `level`, `-(level + 1)` = not installed at `level`. The
/// queue keeps decisions in the order they were made, which is also
/// non-decreasing in level.
#[derive(Debug, Default)]
pub struct Decisions {
    decision_map: Vec<i32>,

    /// Rule that forced each variable, if any
    reasons: Vec<Option<u32>>,

    decision_queue: Vec<Literal>,

    level: u32,
}

impl Decisions {
    pub fn with_capacity(var_count: usize) -> Self {
        Self {
            decision_map: vec![0; var_count + 1],
            reasons: vec![None; var_count + 1],
            decision_queue: Vec::with_capacity(var_count),
            level: 0,
        }
    }

    #[inline]
    fn ensure_capacity(&mut self, var: VarId) {
        let id = var as usize;
        if id >= self.decision_map.len() {
            self.decision_map.resize(id + 1, 0);
            self.reasons.resize(id + 1, None);
        }
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Decide `literal` at the current level.
    ///
    /// Returns false if it contradicts an existing decision.
    pub fn decide(&mut self, literal: Literal, rule_id: Option<u32>) -> bool {
        let var = literal.abs();
        self.ensure_capacity(var);

        let existing = self.decision_map[var as usize];
        if existing != 0 {
            return (existing > 0) == (literal > 0);
        }

        let level_value = (self.level + 1) as i32;
        self.decision_map[var as usize] = if literal > 0 { level_value } else { -level_value };
        self.reasons[var as usize] = rule_id;
        self.decision_queue.push(literal);

        true
    }

    /// Truth value of `literal`, `None` while undecided
    #[inline]
    pub fn value(&self, literal: Literal) -> Option<bool> {
        match self.decision_map.get(literal.unsigned_abs() as usize) {
            None | Some(0) => None,
            Some(decision) => Some((*decision > 0) == (literal > 0)),
        }
    }

    #[inline]
    pub fn satisfied(&self, literal: Literal) -> bool {
        self.value(literal) == Some(true)
    }

    #[inline]
    pub fn conflict(&self, literal: Literal) -> bool {
        self.value(literal) == Some(false)
    }

    #[inline]
    pub fn decided(&self, var: VarId) -> bool {
        self.value(var).is_some()
    }

    #[inline]
    pub fn undecided(&self, var: VarId) -> bool {
        !self.decided(var)
    }

    #[inline]
    pub fn decided_install(&self, var: VarId) -> bool {
        self.satisfied(var)
    }

    pub fn decision_level(&self, literal: Literal) -> Option<u32> {
        match self.decision_map.get(literal.unsigned_abs() as usize) {
            None | Some(0) => None,
            Some(decision) => Some(decision.unsigned_abs() - 1),
        }
    }

    /// Rule that forced the decision on `literal`'s variable
    pub fn decision_rule(&self, literal: Literal) -> Option<u32> {
        self.reasons
            .get(literal.unsigned_abs() as usize)
            .copied()
            .flatten()
    }

    /// Undo every decision above `target_level`
    pub fn revert_to_level(&mut self, target_level: u32) {
        while let Some(&literal) = self.decision_queue.last() {
            match self.decision_level(literal) {
                Some(level) if level > target_level => {
                    let var = literal.unsigned_abs() as usize;
                    self.decision_map[var] = 0;
                    self.reasons[var] = None;
                    self.decision_queue.pop();
                }
                _ => break,
            }
        }

        self.level = target_level;
    }

    /// Variables decided to be installed
    pub fn installed_vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.decision_map
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(id, _)| id as VarId)
    }

    pub fn queue(&self) -> &[Literal] {
        &self.decision_queue
    }

    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decision_queue.is_empty()
    }
}
