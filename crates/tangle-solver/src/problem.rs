//! Problems reported by a failed solve and the solutions offered for them

use std::fmt;

use crate::capability::Capability;
use crate::pool::ItemId;

/// One thing a solution does when applied.
///
/// Item actions change the item's transaction (by `User`); ignore actions
/// add an ignore rule; the last two drop a session-wide extra constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SolutionAction {
    /// Cancel the pending transaction of the item
    KeepItem(ItemId),
    /// Mark an installed item for removal
    Uninstall(ItemId),
    /// Mark an available item for installation
    Install(ItemId),
    IgnoreRequires(ItemId, Capability),
    IgnoreConflict(ItemId, Capability),
    IgnoreObsoletes(ItemId, Capability),
    IgnoreInstalled(ItemId),
    IgnoreArchitecture(ItemId),
    IgnoreVendor(ItemId),
    RemoveExtraRequire(Capability),
    RemoveExtraConflict(Capability),
}

impl SolutionAction {
    /// Item the action targets, if any
    pub fn item(&self) -> Option<ItemId> {
        match self {
            SolutionAction::KeepItem(id)
            | SolutionAction::Uninstall(id)
            | SolutionAction::Install(id)
            | SolutionAction::IgnoreRequires(id, _)
            | SolutionAction::IgnoreConflict(id, _)
            | SolutionAction::IgnoreObsoletes(id, _)
            | SolutionAction::IgnoreInstalled(id)
            | SolutionAction::IgnoreArchitecture(id)
            | SolutionAction::IgnoreVendor(id) => Some(*id),
            SolutionAction::RemoveExtraRequire(_) | SolutionAction::RemoveExtraConflict(_) => None,
        }
    }

    /// Short identifier of the action kind
    pub fn kind(&self) -> &'static str {
        match self {
            SolutionAction::KeepItem(_) => "keep",
            SolutionAction::Uninstall(_) => "uninstall",
            SolutionAction::Install(_) => "install",
            SolutionAction::IgnoreRequires(..) => "ignore-requires",
            SolutionAction::IgnoreConflict(..) => "ignore-conflict",
            SolutionAction::IgnoreObsoletes(..) => "ignore-obsoletes",
            SolutionAction::IgnoreInstalled(_) => "ignore-installed",
            SolutionAction::IgnoreArchitecture(_) => "ignore-architecture",
            SolutionAction::IgnoreVendor(_) => "ignore-vendor",
            SolutionAction::RemoveExtraRequire(_) => "remove-extra-require",
            SolutionAction::RemoveExtraConflict(_) => "remove-extra-conflict",
        }
    }
}

impl fmt::Display for SolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionAction::IgnoreRequires(id, cap)
            | SolutionAction::IgnoreConflict(id, cap)
            | SolutionAction::IgnoreObsoletes(id, cap) => write!(f, "{} {} {}", self.kind(), id, cap),
            SolutionAction::RemoveExtraRequire(cap) | SolutionAction::RemoveExtraConflict(cap) => {
                write!(f, "{} {}", self.kind(), cap)
            }
            other => match other.item() {
                Some(id) => write!(f, "{} {}", other.kind(), id),
                None => write!(f, "{}", other.kind()),
            },
        }
    }
}

/// A remedy for one problem: a description and the actions it applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemSolution {
    pub description: String,
    pub details: String,
    pub actions: Vec<SolutionAction>,
}

impl ProblemSolution {
    pub fn new(description: impl Into<String>, action: SolutionAction) -> Self {
        Self {
            description: description.into(),
            details: String::new(),
            actions: vec![action],
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

impl fmt::Display for ProblemSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)?;
        for line in self.details.lines() {
            write!(f, "\n      {}", line)?;
        }
        Ok(())
    }
}

/// One unsatisfiable set of constraints and the ways out of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverProblem {
    pub description: String,
    /// One line per constraint taking part in the problem
    pub details: String,
    /// Items the problem is about
    pub items: Vec<ItemId>,
    pub solutions: Vec<ProblemSolution>,
}

impl ResolverProblem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            details: String::new(),
            items: Vec::new(),
            solutions: Vec::new(),
        }
    }

    pub fn solutions(&self) -> &[ProblemSolution] {
        &self.solutions
    }

    /// Whether the description or details mention `text`
    pub fn mentions(&self, text: &str) -> bool {
        self.description.contains(text) || self.details.contains(text)
    }
}

impl fmt::Display for ResolverProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)?;
        for line in self.details.lines() {
            write!(f, "\n  - {}", line)?;
        }
        for (i, solution) in self.solutions.iter().enumerate() {
            write!(f, "\n  Solution {}: {}", i + 1, solution)?;
        }
        Ok(())
    }
}

/// Render a list of problems, numbered from 1
pub fn describe_problems(problems: &[ResolverProblem]) -> String {
    problems
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Problem {}: {}", i + 1, p))
        .collect::<Vec<_>>()
        .join("\n")
}
