//! Concurrent access safety for namespace mutations
//!
//! Link maintenance is a read-modify-write on the parent's cached lists.
//! The backing store only serializes conflicting transactions, so two
//! concurrent configure calls appending to the same parent's list could
//! lose an update. Mutation paths take the owning parents' locks, in id
//! order, before touching their lists. Read paths take no locks.

use crate::types::FolderId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-parent lock manager.
///
/// Provides fine-grained locking at the parent-folder level, so edits to
/// different folders' lists proceed concurrently while edits to the same
/// list are serialized.
pub struct ParentLockManager {
    locks: RwLock<HashMap<FolderId, Arc<Mutex<()>>>>,
}

impl ParentLockManager {
    pub fn new() -> Self {
        ParentLockManager {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the lock for one parent folder.
    pub fn get_lock(&self, parent: FolderId) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(&parent) {
                return lock.clone();
            }
        }
        let mut map = self.locks.write();
        // Another thread may have created it between the read and the write.
        map.entry(parent)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Locks for the parents touched by one mutation, deduplicated and in
    /// id order so concurrent moves cannot deadlock. The virtual root has
    /// no cached lists and therefore no lock.
    pub fn locks_for(&self, parents: &[Option<FolderId>]) -> Vec<Arc<Mutex<()>>> {
        let mut ids: Vec<FolderId> = parents.iter().copied().flatten().collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| self.get_lock(id)).collect()
    }
}

impl Default for ParentLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn same_parent_serializes_writers() {
        let manager = Arc::new(ParentLockManager::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..5 {
            let manager = manager.clone();
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                let lock = manager.get_lock(1);
                let _guard = lock.lock();
                let current = counter.load(Ordering::SeqCst);
                thread::yield_now();
                counter.store(current + 1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn different_parents_do_not_block() {
        let manager = Arc::new(ParentLockManager::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for i in 0..6u64 {
            let manager = manager.clone();
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                let lock = manager.get_lock(i % 2);
                let _guard = lock.lock();
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn locks_for_orders_and_dedups() {
        let manager = ParentLockManager::new();
        let locks = manager.locks_for(&[Some(9), None, Some(3), Some(9)]);
        assert_eq!(locks.len(), 2);
        // Root contributes no lock.
        assert!(manager.locks_for(&[None, None]).is_empty());
    }
}
