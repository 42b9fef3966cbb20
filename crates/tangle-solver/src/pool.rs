//! The item pool
//!
//! [`ResPool`] is a cheap shared handle to a collection owned outside the
//! resolver. Item statuses are interior-mutable so that the session can
//! record solver decisions through any handle. Handles are reference
//! counted with `Rc`, so a pool and its items stay on one thread.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::capability::Capability;
use crate::item::{ResStatus, Resolvable, Transact, TransactBy};

static NEXT_ITEM_ID: AtomicU32 = AtomicU32::new(1);

/// Process-wide unique identity of a pool item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(u32);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ItemInner {
    id: ItemId,
    resolvable: Resolvable,
    status: Cell<ResStatus>,
    serial: Rc<Cell<u64>>,
}

/// Shared handle to one item of a pool
#[derive(Clone)]
pub struct PoolItem(Rc<ItemInner>);

impl PoolItem {
    pub fn id(&self) -> ItemId {
        self.0.id
    }

    pub fn resolvable(&self) -> &Resolvable {
        &self.0.resolvable
    }

    pub fn status(&self) -> ResStatus {
        self.0.status.get()
    }

    /// Replace the status; bumps the pool serial when it changes
    pub fn set_status(&self, status: ResStatus) {
        if self.0.status.get() != status {
            self.0.status.set(status);
            self.0.serial.set(self.0.serial.get() + 1);
        }
    }

    /// Request a transaction. Refused when a causer of higher precedence
    /// already holds one. Returns whether the status changed.
    pub fn set_transact(&self, transact: Transact, by: TransactBy) -> bool {
        let current = self.status();
        if current.is_transacting() && current.transact_by() > by {
            return false;
        }
        let next = current.with_transact(transact, by);
        if next == current {
            return false;
        }
        self.set_status(next);
        true
    }

    /// Cancel a pending transaction held by `by` or a lower causer
    pub fn reset_transact(&self, by: TransactBy) -> bool {
        self.set_transact(Transact::Keep, by)
    }
}

impl std::ops::Deref for PoolItem {
    type Target = Resolvable;

    fn deref(&self) -> &Resolvable {
        &self.0.resolvable
    }
}

impl PartialEq for PoolItem {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for PoolItem {}

impl std::hash::Hash for PoolItem {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for PoolItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolItem({} {} {})", self.id(), self.resolvable(), self.status())
    }
}

impl fmt::Display for PoolItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolvable())
    }
}

struct PoolInner {
    items: RefCell<Vec<PoolItem>>,
    serial: Rc<Cell<u64>>,
    content_serial: Cell<u64>,
}

/// Shared handle to an externally owned pool of items
#[derive(Clone)]
pub struct ResPool(Rc<PoolInner>);

impl Default for ResPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResPool {
    pub fn new() -> Self {
        Self(Rc::new(PoolInner {
            items: RefCell::new(Vec::new()),
            serial: Rc::new(Cell::new(0)),
            content_serial: Cell::new(0),
        }))
    }

    fn bump_content(&self) {
        self.0.serial.set(self.0.serial.get() + 1);
        self.0.content_serial.set(self.0.content_serial.get() + 1);
    }

    /// Add an item, installed or available
    pub fn add(&self, resolvable: Resolvable, installed: bool) -> PoolItem {
        let status = if installed {
            ResStatus::installed()
        } else {
            ResStatus::uninstalled()
        };
        let item = PoolItem(Rc::new(ItemInner {
            id: ItemId::next(),
            resolvable,
            status: Cell::new(status),
            serial: Rc::clone(&self.0.serial),
        }));
        self.0.items.borrow_mut().push(item.clone());
        self.bump_content();
        item
    }

    pub fn add_installed(&self, resolvable: Resolvable) -> PoolItem {
        self.add(resolvable, true)
    }

    pub fn add_available(&self, resolvable: Resolvable) -> PoolItem {
        self.add(resolvable, false)
    }

    pub fn remove(&self, id: ItemId) -> bool {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            let before = items.len();
            items.retain(|item| item.id() != id);
            items.len() != before
        };
        if removed {
            self.bump_content();
        }
        removed
    }

    pub fn get(&self, id: ItemId) -> Option<PoolItem> {
        self.0.items.borrow().iter().find(|item| item.id() == id).cloned()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.0.items.borrow().iter().any(|item| item.id() == id)
    }

    /// Snapshot of all items in insertion order
    pub fn items(&self) -> Vec<PoolItem> {
        self.0.items.borrow().clone()
    }

    pub fn installed_items(&self) -> Vec<PoolItem> {
        self.0
            .items
            .borrow()
            .iter()
            .filter(|item| item.status().is_installed())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Vec<PoolItem> {
        self.0
            .items
            .borrow()
            .iter()
            .filter(|item| item.name() == name)
            .cloned()
            .collect()
    }

    pub fn what_provides(&self, capability: &Capability) -> Vec<PoolItem> {
        self.0
            .items
            .borrow()
            .iter()
            .filter(|item| item.provides_capability(capability))
            .cloned()
            .collect()
    }

    /// Watermark that increases on every content or status change
    pub fn serial(&self) -> u64 {
        self.0.serial.get()
    }

    /// Watermark that only increases when items are added or removed
    pub fn content_serial(&self) -> u64 {
        self.0.content_serial.get()
    }

    /// Whether both handles refer to the same pool
    pub fn ptr_eq(&self, other: &ResPool) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ResPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResPool")
            .field("items", &self.len())
            .field("serial", &self.serial())
            .finish()
    }
}

/// Remembers a serial number and tells whether it moved since
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialWatcher {
    last: Option<u64>,
}

impl SerialWatcher {
    /// Store `serial`; returns true if it differs from the stored one
    pub fn remember(&mut self, serial: u64) -> bool {
        let changed = self.last != Some(serial);
        self.last = Some(serial);
        changed
    }

    pub fn is_clean(&self, serial: u64) -> bool {
        self.last == Some(serial)
    }

    pub fn forget(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_edition::Edition;

    fn pkg(name: &str, version: &str) -> Resolvable {
        Resolvable::package(name, Edition::parse(version).unwrap())
    }

    #[test]
    fn test_add_and_lookup() {
        let pool = ResPool::new();
        let a = pool.add_installed(pkg("a", "1.0"));
        let b = pool.add_available(pkg("b", "2.0"));

        assert_eq!(pool.len(), 2);
        assert!(a.status().is_installed());
        assert!(!b.status().is_installed());
        assert_eq!(pool.get(b.id()), Some(b.clone()));
        assert_eq!(pool.find_by_name("a").len(), 1);
        assert!(a.id() < b.id());
    }

    #[test]
    fn test_remove_invalidates_lookup() {
        let pool = ResPool::new();
        let a = pool.add_installed(pkg("a", "1.0"));
        assert!(pool.remove(a.id()));
        assert!(!pool.remove(a.id()));
        assert!(pool.get(a.id()).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_serial_tracks_content_and_status() {
        let pool = ResPool::new();
        let start = pool.serial();
        let a = pool.add_available(pkg("a", "1.0"));
        assert!(pool.serial() > start);

        let content = pool.content_serial();
        let before = pool.serial();
        assert!(a.set_transact(Transact::Install, TransactBy::User));
        assert!(pool.serial() > before);
        assert_eq!(pool.content_serial(), content);

        // unchanged status does not move the watermark
        let unchanged = pool.serial();
        assert!(!a.set_transact(Transact::Install, TransactBy::User));
        assert_eq!(pool.serial(), unchanged);
    }

    #[test]
    fn test_transact_precedence() {
        let pool = ResPool::new();
        let a = pool.add_available(pkg("a", "1.0"));
        assert!(a.set_transact(Transact::Install, TransactBy::User));
        assert!(!a.reset_transact(TransactBy::Solver));
        assert!(a.status().to_install());
        assert!(a.reset_transact(TransactBy::User));
        assert!(a.status().is_kept());
    }

    #[test]
    fn test_what_provides() {
        let pool = ResPool::new();
        let a = pool.add_available(pkg("a", "1.0").provides(Capability::parse("libx = 2").unwrap()));
        pool.add_available(pkg("b", "1.0"));

        let providers = pool.what_provides(&Capability::parse("libx >= 1").unwrap());
        assert_eq!(providers, vec![a]);
    }

    #[test]
    fn test_serial_watcher() {
        let mut watcher = SerialWatcher::default();
        assert!(!watcher.is_clean(0));
        assert!(watcher.remember(3));
        assert!(!watcher.remember(3));
        assert!(watcher.is_clean(3));
        watcher.forget();
        assert!(!watcher.is_clean(3));
    }
}
