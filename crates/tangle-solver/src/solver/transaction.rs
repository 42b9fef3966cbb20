use std::fmt;

use super::Solution;
use crate::pool::{PoolItem, ResPool};

/// Operations that take the installed set to a solve's target state
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Uninstalls first, then updates, then installs
    pub operations: Vec<Operation>,
}

/// A single operation in a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Install a new item
    Install(PoolItem),
    /// Replace an installed item by another edition of the same kind and name
    Update { from: PoolItem, to: PoolItem },
    /// Remove an installed item
    Uninstall(PoolItem),
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Pair installs with removals of the same kind and name into updates.
    /// Items of the solution missing from `pool` are skipped.
    pub fn from_solution(pool: &ResPool, solution: &Solution) -> Self {
        let mut removals: Vec<PoolItem> = solution.remove.iter().filter_map(|&id| pool.get(id)).collect();
        let mut updates = Vec::new();
        let mut installs = Vec::new();

        for item in solution.install.iter().filter_map(|&id| pool.get(id)) {
            match removals.iter().position(|old| old.same_name_as(&item)) {
                Some(idx) => {
                    let from = removals.remove(idx);
                    updates.push(Operation::Update { from, to: item });
                }
                None => installs.push(Operation::Install(item)),
            }
        }

        let mut tx = Self::new();
        tx.operations.extend(removals.into_iter().map(Operation::Uninstall));
        tx.operations.extend(updates);
        tx.operations.extend(installs);
        tx
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Items that will be installed (including update targets)
    pub fn installs(&self) -> impl Iterator<Item = &PoolItem> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Install(item) => Some(item),
            Operation::Update { to, .. } => Some(to),
            _ => None,
        })
    }

    /// Items that will be removed (including update sources)
    pub fn uninstalls(&self) -> impl Iterator<Item = &PoolItem> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Uninstall(item) => Some(item),
            Operation::Update { from, .. } => Some(from),
            _ => None,
        })
    }

    pub fn updates(&self) -> impl Iterator<Item = (&PoolItem, &PoolItem)> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Update { from, to } => Some((from, to)),
            _ => None,
        })
    }

    pub fn summary(&self) -> TransactionSummary {
        let mut summary = TransactionSummary::default();

        for op in &self.operations {
            match op {
                Operation::Install(_) => summary.installs += 1,
                Operation::Update { .. } => summary.updates += 1,
                Operation::Uninstall(_) => summary.uninstalls += 1,
            }
        }

        summary
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install(item) => write!(f, "install {}", item),
            Operation::Update { from, to } => write!(f, "update {} to {}", from, to),
            Operation::Uninstall(item) => write!(f, "remove {}", item),
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for op in &self.operations {
            writeln!(f, "  {}", op)?;
        }
        Ok(())
    }
}

/// Summary of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub installs: usize,
    pub updates: usize,
    pub uninstalls: usize,
}

impl fmt::Display for TransactionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if self.installs > 0 {
            parts.push(format!("{} install(s)", self.installs));
        }
        if self.updates > 0 {
            parts.push(format!("{} update(s)", self.updates));
        }
        if self.uninstalls > 0 {
            parts.push(format!("{} removal(s)", self.uninstalls));
        }

        if parts.is_empty() {
            write!(f, "Nothing to do")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
