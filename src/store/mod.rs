//! Document store abstraction
//!
//! The engine's only dependency on persistence: two collections (directory
//! records and file records) offering get/find/insert/update/delete/count,
//! plus store-wide transaction control. Any key-value or document store
//! satisfying these primitives suffices; nothing here assumes SQL or a
//! specific engine.

pub mod memory;
pub mod persistence;

pub use memory::MemoryDocumentStore;
pub use persistence::SledDocumentStore;

use crate::error::StoreError;
use crate::record::{DirectoryRecord, FileRecord};
use crate::types::FolderId;

/// Predicate over directory records, used by `find_directories`.
pub type DirectoryPredicate<'a> = &'a dyn Fn(&DirectoryRecord) -> bool;
/// Predicate over file records, used by `find_files`.
pub type FilePredicate<'a> = &'a dyn Fn(&FileRecord) -> bool;

/// Two-collection document store with store-wide transactions.
///
/// Every method reports failure through [`StoreError`]; none panics. The
/// store serializes conflicting transactions; a single logical writer is
/// assumed, and writes issued outside `begin_transaction`/`commit` apply
/// immediately (used for corrective repairs on read paths).
pub trait DocumentStore: Send + Sync {
    // Directory records, keyed by folder id.
    fn get_directory(&self, id: FolderId) -> Result<Option<DirectoryRecord>, StoreError>;
    fn find_directories(
        &self,
        predicate: DirectoryPredicate<'_>,
    ) -> Result<Vec<DirectoryRecord>, StoreError>;
    fn insert_directory(&self, record: &DirectoryRecord) -> Result<(), StoreError>;
    fn update_directory(&self, record: &DirectoryRecord) -> Result<(), StoreError>;
    fn delete_directory(&self, id: FolderId) -> Result<(), StoreError>;
    fn count_directories(&self) -> Result<u64, StoreError>;

    /// Allocate the next directory id. Ids are never reused, including
    /// across a rollback of the allocating transaction.
    fn allocate_directory_id(&self) -> Result<FolderId, StoreError>;

    // File records, keyed by canonical content identifier.
    fn get_file(&self, cid: &str) -> Result<Option<FileRecord>, StoreError>;
    fn find_files(&self, predicate: FilePredicate<'_>) -> Result<Vec<FileRecord>, StoreError>;
    fn insert_file(&self, record: &FileRecord) -> Result<(), StoreError>;
    fn update_file(&self, record: &FileRecord) -> Result<(), StoreError>;
    fn delete_file(&self, cid: &str) -> Result<(), StoreError>;
    fn count_files(&self) -> Result<u64, StoreError>;

    // Transaction control.
    fn begin_transaction(&self) -> Result<(), StoreError>;
    fn commit(&self) -> Result<(), StoreError>;
    fn rollback(&self) -> Result<(), StoreError>;
}
