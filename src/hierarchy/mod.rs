//! Folder/file hierarchy consistency engine
//!
//! Creates, relocates, and deletes folders and files while maintaining two
//! redundant views of the same relationship: a child's parent pointer and
//! the parent's cached children list. Drift between the two (from a crash
//! mid-mutation) is repaired lazily on read. Every multi-record mutation
//! runs inside one store transaction.

pub mod files;
pub mod folders;
pub(crate) mod links;
pub mod repair;
pub(crate) mod tx;

pub use files::FileManager;
pub use folders::FolderManager;

use crate::concurrency::ParentLockManager;
use crate::record::{DirectoryRecord, FileRecord};
use crate::store::DocumentStore;
use serde::Serialize;
use std::sync::Arc;

/// Resolved contents of one folder, or of the virtual root.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderContents {
    pub folders: Vec<DirectoryRecord>,
    pub files: Vec<FileRecord>,
}

/// The two managers over one store, sharing a parent lock manager.
pub struct Repository {
    pub folders: FolderManager,
    pub files: FileManager,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let locks = Arc::new(ParentLockManager::new());
        Repository {
            folders: FolderManager::new(store.clone(), locks.clone()),
            files: FileManager::new(store, locks),
        }
    }
}
