use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::capability::{Capability, CapabilitySet};
use crate::pool::ItemId;

/// Per-item overrides that relax the constraints of the next solve.
///
/// The tables only ever grow; [`IgnoreRules::clear`] is the sole way to
/// drop entries. Every `add_*` returns whether the tables changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IgnoreRules {
    requires: BTreeMap<ItemId, CapabilitySet>,
    conflicts: BTreeMap<ItemId, CapabilitySet>,
    obsoletes: BTreeMap<ItemId, CapabilitySet>,
    installed: BTreeSet<ItemId>,
    architecture: BTreeSet<ItemId>,
    vendor: BTreeSet<ItemId>,
}

impl IgnoreRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_requires(&mut self, item: ItemId, capability: Capability) -> bool {
        self.requires.entry(item).or_default().insert(capability)
    }

    pub fn add_conflict(&mut self, item: ItemId, capability: Capability) -> bool {
        self.conflicts.entry(item).or_default().insert(capability)
    }

    pub fn add_obsoletes(&mut self, item: ItemId, capability: Capability) -> bool {
        self.obsoletes.entry(item).or_default().insert(capability)
    }

    pub fn add_installed(&mut self, item: ItemId) -> bool {
        self.installed.insert(item)
    }

    pub fn remove_installed(&mut self, item: ItemId) -> bool {
        self.installed.remove(&item)
    }

    pub fn add_architecture(&mut self, item: ItemId) -> bool {
        self.architecture.insert(item)
    }

    pub fn add_vendor(&mut self, item: ItemId) -> bool {
        self.vendor.insert(item)
    }

    pub fn ignores_requires(&self, item: ItemId, capability: &Capability) -> bool {
        contains(&self.requires, item, capability)
    }

    pub fn ignores_conflict(&self, item: ItemId, capability: &Capability) -> bool {
        contains(&self.conflicts, item, capability)
    }

    pub fn ignores_obsoletes(&self, item: ItemId, capability: &Capability) -> bool {
        contains(&self.obsoletes, item, capability)
    }

    pub fn ignores_installed(&self, item: ItemId) -> bool {
        self.installed.contains(&item)
    }

    pub fn ignores_architecture(&self, item: ItemId) -> bool {
        self.architecture.contains(&item)
    }

    pub fn ignores_vendor(&self, item: ItemId) -> bool {
        self.vendor.contains(&item)
    }

    pub fn ignored_requires(&self) -> &BTreeMap<ItemId, CapabilitySet> {
        &self.requires
    }

    pub fn ignored_conflicts(&self) -> &BTreeMap<ItemId, CapabilitySet> {
        &self.conflicts
    }

    pub fn ignored_obsoletes(&self) -> &BTreeMap<ItemId, CapabilitySet> {
        &self.obsoletes
    }

    pub fn ignored_installed(&self) -> &BTreeSet<ItemId> {
        &self.installed
    }

    pub fn ignored_architecture(&self) -> &BTreeSet<ItemId> {
        &self.architecture
    }

    pub fn ignored_vendor(&self) -> &BTreeSet<ItemId> {
        &self.vendor
    }

    pub fn is_empty(&self) -> bool {
        self.requires.is_empty()
            && self.conflicts.is_empty()
            && self.obsoletes.is_empty()
            && self.installed.is_empty()
            && self.architecture.is_empty()
            && self.vendor.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn contains(table: &BTreeMap<ItemId, CapabilitySet>, item: ItemId, capability: &Capability) -> bool {
    table.get(&item).is_some_and(|caps| caps.contains(capability))
}

fn write_table(f: &mut fmt::Formatter<'_>, label: &str, table: &BTreeMap<ItemId, CapabilitySet>) -> fmt::Result {
    for (item, caps) in table {
        for cap in caps {
            writeln!(f, "  ignore {} {} {}", label, item, cap)?;
        }
    }
    Ok(())
}

fn write_set(f: &mut fmt::Formatter<'_>, label: &str, set: &BTreeSet<ItemId>) -> fmt::Result {
    for item in set {
        writeln!(f, "  ignore {} {}", label, item)?;
    }
    Ok(())
}

impl fmt::Display for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_table(f, "requires", &self.requires)?;
        write_table(f, "conflict", &self.conflicts)?;
        write_table(f, "obsoletes", &self.obsoletes)?;
        write_set(f, "installed", &self.installed)?;
        write_set(f, "architecture", &self.architecture)?;
        write_set(f, "vendor", &self.vendor)
    }
}
