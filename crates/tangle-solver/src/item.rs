//! Resolvable items and their transaction status

use std::fmt;

use tangle_edition::Edition;

use crate::capability::{Capability, CapabilitySet, Dep, Dependencies};

/// Kind of a resolvable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Kind {
    #[default]
    Package,
    Patch,
    Pattern,
    Product,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Package => "package",
            Kind::Patch => "patch",
            Kind::Pattern => "pattern",
            Kind::Product => "product",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Architecture tag of a resolvable
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Arch(String);

impl Arch {
    pub const NOARCH: &'static str = "noarch";

    pub fn new(arch: impl Into<String>) -> Self {
        Self(arch.into())
    }

    pub fn noarch() -> Self {
        Self::new(Self::NOARCH)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_noarch(&self) -> bool {
        self.0 == Self::NOARCH
    }

    /// Whether an item built for `self` can be installed on `system`
    pub fn compatible_with(&self, system: &Arch) -> bool {
        if self.is_noarch() || self == system {
            return true;
        }

        let accepted: &[&str] = match system.as_str() {
            "x86_64" => &["i686", "i586", "i486", "i386"],
            "i686" => &["i586", "i486", "i386"],
            "i586" => &["i486", "i386"],
            "aarch64" => &["armv7hl", "armv7l"],
            "ppc64" => &["ppc"],
            "s390x" => &["s390"],
            _ => &[],
        };

        accepted.contains(&self.as_str())
    }
}

impl Default for Arch {
    fn default() -> Self {
        Self::noarch()
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An installable or removable unit: kind, name, edition, arch, vendor and dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolvable {
    kind: Kind,
    name: String,
    edition: Edition,
    arch: Arch,
    vendor: String,
    deps: Dependencies,
}

impl Resolvable {
    pub fn new(kind: Kind, name: impl Into<String>, edition: Edition) -> Self {
        Self {
            kind,
            name: name.into(),
            edition,
            arch: Arch::noarch(),
            vendor: String::new(),
            deps: Dependencies::default(),
        }
    }

    /// A noarch package
    pub fn package(name: impl Into<String>, edition: Edition) -> Self {
        Self::new(Kind::Package, name, edition)
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Arch::new(arch);
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn with_dep(mut self, dep: Dep, capability: Capability) -> Self {
        self.deps.get_mut(dep).insert(capability);
        self
    }

    pub fn provides(self, capability: Capability) -> Self {
        self.with_dep(Dep::Provides, capability)
    }

    pub fn requires(self, capability: Capability) -> Self {
        self.with_dep(Dep::Requires, capability)
    }

    pub fn conflicts(self, capability: Capability) -> Self {
        self.with_dep(Dep::Conflicts, capability)
    }

    pub fn obsoletes(self, capability: Capability) -> Self {
        self.with_dep(Dep::Obsoletes, capability)
    }

    pub fn recommends(self, capability: Capability) -> Self {
        self.with_dep(Dep::Recommends, capability)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn edition(&self) -> &Edition {
        &self.edition
    }

    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn deps(&self) -> &Dependencies {
        &self.deps
    }

    pub fn dep(&self, dep: Dep) -> &CapabilitySet {
        self.deps.get(dep)
    }

    /// Whether this item satisfies `requirement`, through its implicit
    /// `name = edition` provide or an explicit one
    pub fn provides_capability(&self, requirement: &Capability) -> bool {
        requirement.matches_item(&self.name, &self.edition)
            || self
                .deps
                .provides
                .iter()
                .any(|provided| requirement.matched_by(provided))
    }

    /// Whether `other` has the same kind and name
    pub fn same_name_as(&self, other: &Resolvable) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl fmt::Display for Resolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind != Kind::Package {
            write!(f, "{}:", self.kind)?;
        }
        write!(f, "{}-{}.{}", self.name, self.edition, self.arch)
    }
}

/// Requested transaction of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transact {
    #[default]
    Keep,
    Install,
    Remove,
}

/// Who requested a transaction. Later variants take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TransactBy {
    #[default]
    Solver,
    Upgrade,
    User,
}

impl fmt::Display for TransactBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactBy::Solver => write!(f, "solver"),
            TransactBy::Upgrade => write!(f, "upgrade"),
            TransactBy::User => write!(f, "user"),
        }
    }
}

/// Installed flag plus the pending transaction and its causer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResStatus {
    installed: bool,
    transact: Transact,
    by: TransactBy,
}

impl ResStatus {
    pub fn installed() -> Self {
        Self {
            installed: true,
            ..Self::default()
        }
    }

    pub fn uninstalled() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn transact(&self) -> Transact {
        self.transact
    }

    pub fn transact_by(&self) -> TransactBy {
        self.by
    }

    pub fn to_install(&self) -> bool {
        !self.installed && self.transact == Transact::Install
    }

    pub fn to_remove(&self) -> bool {
        self.installed && self.transact == Transact::Remove
    }

    pub fn is_transacting(&self) -> bool {
        self.to_install() || self.to_remove()
    }

    pub fn is_kept(&self) -> bool {
        !self.is_transacting()
    }

    pub fn stays_installed(&self) -> bool {
        self.installed && !self.to_remove()
    }

    /// Installed after the pending transaction is carried out
    pub fn will_be_installed(&self) -> bool {
        self.stays_installed() || self.to_install()
    }

    /// Status with the given transaction. A transaction that makes no sense
    /// for the installed state (installing an installed item) becomes `Keep`.
    pub fn with_transact(self, transact: Transact, by: TransactBy) -> Self {
        let transact = match (transact, self.installed) {
            (Transact::Install, true) | (Transact::Remove, false) => Transact::Keep,
            (transact, _) => transact,
        };
        Self {
            transact,
            by: if transact == Transact::Keep { TransactBy::Solver } else { by },
            ..self
        }
    }

    pub fn reset_transact(self) -> Self {
        self.with_transact(Transact::Keep, TransactBy::Solver)
    }
}

impl fmt::Display for ResStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.installed { "I" } else { "U" };
        match self.transact {
            Transact::Keep => write!(f, "{}", state),
            Transact::Install => write!(f, "{}+({})", state, self.by),
            Transact::Remove => write!(f, "{}-({})", state, self.by),
        }
    }
}
