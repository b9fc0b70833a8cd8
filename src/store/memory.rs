//! In-memory document store.
//!
//! Default backend for tests and ephemeral use. Transactions take a
//! snapshot of both collections at `begin` and restore it on `rollback`.

use super::{DirectoryPredicate, DocumentStore, FilePredicate};
use crate::error::StoreError;
use crate::record::{DirectoryRecord, FileRecord};
use crate::types::FolderId;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct Collections {
    directories: BTreeMap<FolderId, DirectoryRecord>,
    files: BTreeMap<String, FileRecord>,
}

struct Inner {
    live: Collections,
    /// Present while a transaction is open; restored on rollback.
    /// The id counter is deliberately outside the snapshot: ids are never
    /// reused, even when the allocating transaction rolls back.
    snapshot: Option<Collections>,
    next_id: FolderId,
}

/// In-memory [`DocumentStore`].
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        MemoryDocumentStore {
            inner: Mutex::new(Inner {
                live: Collections::default(),
                snapshot: None,
                next_id: 1,
            }),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Collections {
    fn clone_for_snapshot(&self) -> Collections {
        Collections {
            directories: self.directories.clone(),
            files: self.files.clone(),
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get_directory(&self, id: FolderId) -> Result<Option<DirectoryRecord>, StoreError> {
        Ok(self.inner.lock().live.directories.get(&id).cloned())
    }

    fn find_directories(
        &self,
        predicate: DirectoryPredicate<'_>,
    ) -> Result<Vec<DirectoryRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .live
            .directories
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    fn insert_directory(&self, record: &DirectoryRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.live.directories.contains_key(&record.id) {
            return Err(StoreError::operation(
                "insert",
                format!("directory {}", record.id),
                "key already present",
            ));
        }
        inner.live.directories.insert(record.id, record.clone());
        // Keep the allocator ahead of explicitly supplied ids.
        if record.id >= inner.next_id {
            inner.next_id = record.id + 1;
        }
        Ok(())
    }

    fn update_directory(&self, record: &DirectoryRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.live.directories.get_mut(&record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(StoreError::operation(
                "update",
                format!("directory {}", record.id),
                "no such record",
            )),
        }
    }

    fn delete_directory(&self, id: FolderId) -> Result<(), StoreError> {
        self.inner.lock().live.directories.remove(&id);
        Ok(())
    }

    fn count_directories(&self) -> Result<u64, StoreError> {
        Ok(self.inner.lock().live.directories.len() as u64)
    }

    fn allocate_directory_id(&self) -> Result<FolderId, StoreError> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        Ok(id)
    }

    fn get_file(&self, cid: &str) -> Result<Option<FileRecord>, StoreError> {
        Ok(self.inner.lock().live.files.get(cid).cloned())
    }

    fn find_files(&self, predicate: FilePredicate<'_>) -> Result<Vec<FileRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .live
            .files
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    fn insert_file(&self, record: &FileRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.live.files.contains_key(&record.cid) {
            return Err(StoreError::operation(
                "insert",
                format!("file {}", record.cid),
                "key already present",
            ));
        }
        inner.live.files.insert(record.cid.clone(), record.clone());
        Ok(())
    }

    fn update_file(&self, record: &FileRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.live.files.get_mut(&record.cid) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(StoreError::operation(
                "update",
                format!("file {}", record.cid),
                "no such record",
            )),
        }
    }

    fn delete_file(&self, cid: &str) -> Result<(), StoreError> {
        self.inner.lock().live.files.remove(cid);
        Ok(())
    }

    fn count_files(&self) -> Result<u64, StoreError> {
        Ok(self.inner.lock().live.files.len() as u64)
    }

    fn begin_transaction(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.snapshot.is_some() {
            return Err(StoreError::transaction(
                "begin",
                "transaction already in progress",
            ));
        }
        inner.snapshot = Some(inner.live.clone_for_snapshot());
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.snapshot.take() {
            Some(_) => Ok(()),
            None => Err(StoreError::transaction("commit", "no transaction in progress")),
        }
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.snapshot.take() {
            Some(snapshot) => {
                inner.live = snapshot;
                Ok(())
            }
            None => Err(StoreError::transaction(
                "rollback",
                "no transaction in progress",
            )),
        }
    }
}
