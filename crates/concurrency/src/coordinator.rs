//! Per-index reader/writer locking.
//!
//! Each name maps to its own `tokio::sync::RwLock`, which is fair: a queued
//! writer holds back readers that arrive after it, and waiters are served in
//! arrival order. Guards are owned (`'static`), so they can move into a
//! worker-pool task and outlive the request that acquired them.
//!
//! The store-level lock orders structural changes. Operations on an
//! existing index never touch it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Shared access to one index
pub type IndexReadGuard<T> = OwnedRwLockReadGuard<T>;

/// Exclusive access to one index
pub type IndexWriteGuard<T> = OwnedRwLockWriteGuard<T>;

/// Held while reading the set of names (list)
pub struct StructureReadGuard {
    _guard: OwnedRwLockReadGuard<()>,
}

/// Held while adding or removing names (create, delete, import)
pub struct StructureWriteGuard {
    _guard: OwnedRwLockWriteGuard<()>,
}

/// Owner of the name → index mapping.
///
/// The mapping is only reachable through this type: structural changes
/// require a [`StructureWriteGuard`], per-index access goes through
/// [`read`](Self::read) and [`write`](Self::write).
pub struct LockCoordinator<T> {
    structure: Arc<RwLock<()>>,
    slots: DashMap<String, Arc<RwLock<T>>>,
}

impl<T> Default for LockCoordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LockCoordinator<T> {
    /// Empty coordinator
    pub fn new() -> Self {
        LockCoordinator {
            structure: Arc::new(RwLock::new(())),
            slots: DashMap::new(),
        }
    }

    /// Coordinator pre-populated at startup
    pub fn from_entries(entries: impl IntoIterator<Item = (String, T)>) -> Self {
        let coordinator = Self::new();
        for (name, value) in entries {
            coordinator.slots.insert(name, Arc::new(RwLock::new(value)));
        }
        coordinator
    }

    /// Acquire the store-level lock for reading
    pub async fn structure_read(&self) -> StructureReadGuard {
        StructureReadGuard {
            _guard: Arc::clone(&self.structure).read_owned().await,
        }
    }

    /// Acquire the store-level lock for writing
    pub async fn structure_write(&self) -> StructureWriteGuard {
        StructureWriteGuard {
            _guard: Arc::clone(&self.structure).write_owned().await,
        }
    }

    fn slot(&self, name: &str) -> Option<Arc<RwLock<T>>> {
        // Clone out of the map so no shard lock is held across an await.
        self.slots.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Shared access to `name`, or `None` if absent
    pub async fn read(&self, name: &str) -> Option<IndexReadGuard<T>> {
        let slot = self.slot(name)?;
        Some(slot.read_owned().await)
    }

    /// Exclusive access to `name`, or `None` if absent
    pub async fn write(&self, name: &str) -> Option<IndexWriteGuard<T>> {
        let slot = self.slot(name)?;
        Some(slot.write_owned().await)
    }

    /// Whether `name` is present
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no names are present
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Snapshot of present names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Add a name; returns `false` (and drops `value`) if already present
    pub fn insert(&self, _guard: &StructureWriteGuard, name: String, value: T) -> bool {
        match self.slots.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(Arc::new(RwLock::new(value)));
                true
            }
        }
    }

    /// Remove a name
    ///
    /// Tasks that looked the name up before removal may still acquire its
    /// lock afterwards; callers mark the value as gone before removing it.
    pub fn remove(&self, _guard: &StructureWriteGuard, name: &str) -> bool {
        self.slots.remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const SHORT: Duration = Duration::from_millis(50);

    fn coordinator() -> LockCoordinator<u32> {
        LockCoordinator::from_entries(vec![("a".to_string(), 1), ("b".to_string(), 2)])
    }

    #[tokio::test]
    async fn test_readers_share() {
        let c = coordinator();
        let r1 = c.read("a").await.unwrap();
        let r2 = timeout(SHORT, c.read("a")).await.unwrap().unwrap();
        assert_eq!(*r1 + *r2, 2);
    }

    #[tokio::test]
    async fn test_writer_excludes_readers_on_same_name_only() {
        let c = coordinator();
        let mut w = c.write("a").await.unwrap();
        *w = 10;

        assert!(timeout(SHORT, c.read("a")).await.is_err());
        let other = timeout(SHORT, c.read("b")).await.unwrap().unwrap();
        assert_eq!(*other, 2);

        drop(w);
        assert_eq!(*c.read("a").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_queued_writer_blocks_later_readers() {
        let c = Arc::new(coordinator());
        let r = c.read("a").await.unwrap();

        let c2 = Arc::clone(&c);
        let writer = tokio::spawn(async move {
            let mut w = c2.write("a").await.unwrap();
            *w = 5;
        });
        tokio::time::sleep(SHORT).await;

        // Fair lock: the waiting writer goes first.
        assert!(timeout(SHORT, c.read("a")).await.is_err());
        drop(r);
        writer.await.unwrap();
        assert_eq!(*c.read("a").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_structure_lock_does_not_block_index_access() {
        let c = coordinator();
        let s = c.structure_write().await;
        let r = timeout(SHORT, c.read("a")).await.unwrap().unwrap();
        assert_eq!(*r, 1);
        assert!(timeout(SHORT, c.structure_read()).await.is_err());
        drop(s);
        let _list = c.structure_read().await;
        let _list2 = timeout(SHORT, c.structure_read()).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let c: LockCoordinator<u32> = LockCoordinator::new();
        assert!(c.is_empty());
        let s = c.structure_write().await;
        assert!(c.insert(&s, "x".into(), 1));
        assert!(!c.insert(&s, "x".into(), 2));
        assert_eq!(*c.read("x").await.unwrap(), 1);
        assert_eq!(c.names(), vec!["x".to_string()]);

        assert!(c.remove(&s, "x"));
        assert!(!c.remove(&s, "x"));
        assert!(c.read("x").await.is_none());
        assert!(c.write("x").await.is_none());
    }

    #[tokio::test]
    async fn test_guard_outlives_removal() {
        let c = coordinator();
        let w = c.write("a").await.unwrap();
        {
            let s = c.structure_write().await;
            c.remove(&s, "a");
        }
        assert!(!c.contains("a"));
        assert_eq!(*w, 1);
        assert_eq!(c.len(), 1);
    }
}
