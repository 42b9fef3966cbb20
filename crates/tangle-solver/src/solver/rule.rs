use std::fmt;
use std::hash::{Hash, Hasher};

use crate::capability::Capability;

/// Solver variable: the 1-based position of an item in the solve snapshot
pub type VarId = i32;

/// A literal in SAT terms - positive means "installed", negative means "not installed"
pub type Literal = i32;

/// Types of rules generated for a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    /// Install or remove requested by the user or the upgrade pass
    Job,
    /// Installed item stays, or is replaced by an update or an obsoleter
    Keep,
    /// If the source is installed, one provider of the capability must be
    Requires,
    /// Source and a provider of the conflicting capability exclude each other
    Conflicts,
    /// Source and an item it obsoletes exclude each other
    Obsoletes,
    /// At most one item of a kind and name (n-ary, watches every literal)
    SameName,
    /// Item cannot be installed on this architecture
    NotInstallable,
    /// Item would change the vendor of an installed item
    VendorChange,
    /// Session-wide extra requirement
    ExtraRequire,
    /// Session-wide extra conflict
    ExtraConflict,
    /// Derived by the search from a conflict; never leaves the solver
    Learned,
}

impl RuleType {
    /// Rank used to pick the rule that explains a problem (lower first)
    pub fn explanation_rank(&self) -> u8 {
        match self {
            RuleType::Requires => 0,
            RuleType::NotInstallable => 1,
            RuleType::VendorChange => 2,
            RuleType::Conflicts => 3,
            RuleType::Obsoletes => 4,
            RuleType::ExtraRequire => 5,
            RuleType::ExtraConflict => 6,
            RuleType::SameName => 7,
            RuleType::Job => 8,
            RuleType::Keep => 9,
            RuleType::Learned => 10,
        }
    }

    /// Rank used to pick the rule disabled to expose further problems (lower first)
    pub fn relax_rank(&self) -> u8 {
        match self {
            RuleType::Job => 0,
            RuleType::ExtraRequire => 1,
            RuleType::ExtraConflict => 2,
            RuleType::Keep => 3,
            _ => 4,
        }
    }

    pub fn is_multi_conflict(&self) -> bool {
        matches!(self, RuleType::SameName)
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleType::Job => "job",
            RuleType::Keep => "keep",
            RuleType::Requires => "requires",
            RuleType::Conflicts => "conflicts",
            RuleType::Obsoletes => "obsoletes",
            RuleType::SameName => "same-name",
            RuleType::NotInstallable => "not-installable",
            RuleType::VendorChange => "vendor-change",
            RuleType::ExtraRequire => "extra-require",
            RuleType::ExtraConflict => "extra-conflict",
            RuleType::Learned => "learned",
        };
        f.write_str(name)
    }
}

/// A SAT rule (clause). Satisfied when at least one literal is true.
///
/// - `[A]` - A must be installed
/// - `[-A]` - A must not be installed
/// - `[-A, B, C]` - if A is installed, B or C must be
/// - `[-A, -B]` - A and B cannot both be installed
#[derive(Clone)]
pub struct Rule {
    literals: Vec<Literal>,
    rule_type: RuleType,
    id: u32,
    /// Item the rule was generated for
    source: Option<VarId>,
    /// Second item involved (conflicting, obsoleted or installed counterpart)
    related: Option<VarId>,
    /// Capability the rule was generated from
    capability: Option<Capability>,
    disabled: bool,
}

impl Rule {
    pub fn new(literals: Vec<Literal>, rule_type: RuleType) -> Self {
        Self {
            literals,
            rule_type,
            id: 0,
            source: None,
            related: None,
            capability: None,
            disabled: false,
        }
    }

    /// Single literal that must hold
    pub fn assertion(literal: Literal, rule_type: RuleType) -> Self {
        Self::new(vec![literal], rule_type)
    }

    /// If `source` is installed, one of `providers` must be
    pub fn requires(source: VarId, providers: &[VarId], capability: Capability) -> Self {
        let mut literals = Vec::with_capacity(providers.len() + 1);
        literals.push(-source);
        literals.extend_from_slice(providers);
        Self::new(literals, RuleType::Requires)
            .with_source(source)
            .with_capability(capability)
    }

    /// `a` and `b` cannot both be installed
    pub fn conflict(a: VarId, b: VarId, rule_type: RuleType) -> Self {
        Self::new(vec![-a, -b], rule_type).with_source(a).with_related(b)
    }

    /// At most one of `vars` can be installed
    pub fn same_name(vars: &[VarId]) -> Self {
        Self::new(vars.iter().map(|v| -v).collect(), RuleType::SameName)
    }

    /// Installed `installed` stays, or one of `replacements` is installed
    pub fn keep(installed: VarId, replacements: &[VarId]) -> Self {
        let mut literals = Vec::with_capacity(replacements.len() + 1);
        literals.push(installed);
        literals.extend_from_slice(replacements);
        Self::new(literals, RuleType::Keep).with_source(installed)
    }

    /// Clause implied by the rules a conflict was derived from
    pub fn learned(literals: Vec<Literal>) -> Self {
        Self::new(literals, RuleType::Learned)
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn with_source(mut self, source: VarId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_related(mut self, related: VarId) -> Self {
        self.related = Some(related);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn source(&self) -> Option<VarId> {
        self.source
    }

    pub fn related(&self) -> Option<VarId> {
        self.related
    }

    pub fn capability(&self) -> Option<&Capability> {
        self.capability.as_ref()
    }

    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn is_multi_conflict(&self) -> bool {
        self.rule_type.is_multi_conflict()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn enable(&mut self) {
        self.disabled = false;
    }

    /// Hash of rule type and sorted literals for deduplication
    pub fn literal_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.rule_type.hash(&mut hasher);
        let mut sorted = self.literals.clone();
        sorted.sort_unstable();
        sorted.hash(&mut hasher);
        hasher.finish()
    }

    /// Same type and same literals, ignoring order
    pub fn equals_literals(&self, other: &Rule) -> bool {
        if self.rule_type != other.rule_type || self.literals.len() != other.literals.len() {
            return false;
        }
        let mut mine = self.literals.clone();
        let mut theirs = other.literals.clone();
        mine.sort_unstable();
        theirs.sort_unstable();
        mine == theirs
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("type", &self.rule_type)
            .field("literals", &self.literals)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) ", self.rule_type)?;
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|l| if *l > 0 { format!("+{}", l) } else { l.to_string() })
            .collect();
        write!(f, "[{}]", literals.join(" | "))?;
        if let Some(capability) = &self.capability {
            write!(f, " {}", capability)?;
        }
        Ok(())
    }
}
