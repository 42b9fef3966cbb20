//! Capabilities and dependency sets

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use tangle_edition::{Edition, EditionError, Range, Rel};

lazy_static! {
    /// `name`, `name op edition` or the compact `name>=edition`
    static ref CAPABILITY_RE: Regex = Regex::new(r"^([^\s<>=!]+)\s*(?:([<>=!]+)\s*(\S+))?$").unwrap();
}

/// A symbolic dependency token: a name with an optional edition range.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capability {
    name: String,
    range: Range,
}

impl Capability {
    /// An unversioned capability
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: Range::any(),
        }
    }

    pub fn versioned(name: impl Into<String>, op: Rel, edition: Edition) -> Self {
        Self {
            name: name.into(),
            range: Range::new(op, edition),
        }
    }

    /// Parse `name` or `name op edition`; whitespace around the operator
    /// is optional
    pub fn parse(input: &str) -> Result<Self, EditionError> {
        let caps = CAPABILITY_RE
            .captures(input.trim())
            .ok_or_else(|| EditionError::Malformed(input.to_string()))?;
        let name = &caps[1];

        match (caps.get(2), caps.get(3)) {
            (Some(op), Some(edition)) => Ok(Self {
                name: name.to_string(),
                range: Range::parse(op.as_str(), edition.as_str())?,
            }),
            _ => Ok(Self::new(name)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    /// Whether `provided` satisfies this capability when used as a requirement
    pub fn matched_by(&self, provided: &Capability) -> bool {
        self.name == provided.name && self.range.overlaps(&provided.range)
    }

    /// Whether an item named `name` at `edition` matches this capability
    pub fn matches_item(&self, name: &str, edition: &Edition) -> bool {
        self.name == name && self.range.matches(edition)
    }
}

impl FromStr for Capability {
    type Err = EditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range.is_any() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.range)
        }
    }
}

/// Ordered, deduplicated set of capabilities
pub type CapabilitySet = BTreeSet<Capability>;

/// Dependency relation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dep {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Recommends,
}

impl Dep {
    pub const ALL: [Dep; 5] = [
        Dep::Provides,
        Dep::Requires,
        Dep::Conflicts,
        Dep::Obsoletes,
        Dep::Recommends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dep::Provides => "provides",
            Dep::Requires => "requires",
            Dep::Conflicts => "conflicts",
            Dep::Obsoletes => "obsoletes",
            Dep::Recommends => "recommends",
        }
    }
}

impl fmt::Display for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability sets of one item, one per dependency kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    pub provides: CapabilitySet,
    pub requires: CapabilitySet,
    pub conflicts: CapabilitySet,
    pub obsoletes: CapabilitySet,
    pub recommends: CapabilitySet,
}

impl Dependencies {
    pub fn get(&self, dep: Dep) -> &CapabilitySet {
        match dep {
            Dep::Provides => &self.provides,
            Dep::Requires => &self.requires,
            Dep::Conflicts => &self.conflicts,
            Dep::Obsoletes => &self.obsoletes,
            Dep::Recommends => &self.recommends,
        }
    }

    pub fn get_mut(&mut self, dep: Dep) -> &mut CapabilitySet {
        match dep {
            Dep::Provides => &mut self.provides,
            Dep::Requires => &mut self.requires,
            Dep::Conflicts => &mut self.conflicts,
            Dep::Obsoletes => &mut self.obsoletes,
            Dep::Recommends => &mut self.recommends,
        }
    }

    pub fn is_empty(&self) -> bool {
        Dep::ALL.iter().all(|dep| self.get(*dep).is_empty())
    }
}
