//! Sled-backed document store.
//!
//! Three trees: `directories` and `files` hold bincode-encoded records,
//! `meta` holds the directory id counter. Transactions are implemented as
//! an undo journal: every write issued inside a transaction records the
//! prior value, and `rollback` replays the journal in reverse. The store
//! assumes a single logical writer (the engine), matching the repository's
//! concurrency model.

use super::{DirectoryPredicate, DocumentStore, FilePredicate};
use crate::error::StoreError;
use crate::record::{DirectoryRecord, FileRecord};
use crate::types::FolderId;
use parking_lot::Mutex;
use std::path::Path;

const TREE_DIRECTORIES: &str = "directories";
const TREE_FILES: &str = "files";
const TREE_META: &str = "meta";
const KEY_NEXT_DIRECTORY_ID: &[u8] = b"next_directory_id";

/// Which tree an undo entry belongs to.
#[derive(Clone, Copy)]
enum JournalTree {
    Directories,
    Files,
}

/// One reversible write: the key and the value it held before the write.
struct UndoOp {
    tree: JournalTree,
    key: Vec<u8>,
    prior: Option<Vec<u8>>,
}

/// Sled-backed [`DocumentStore`].
pub struct SledDocumentStore {
    db: sled::Db,
    directories: sled::Tree,
    files: sled::Tree,
    meta: sled::Tree,
    journal: Mutex<Option<Vec<UndoOp>>>,
}

impl SledDocumentStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path)
            .map_err(|e| StoreError::operation("open", path.display().to_string(), e))?;
        let directories = db
            .open_tree(TREE_DIRECTORIES)
            .map_err(|e| StoreError::operation("open", TREE_DIRECTORIES, e))?;
        let files = db
            .open_tree(TREE_FILES)
            .map_err(|e| StoreError::operation("open", TREE_FILES, e))?;
        let meta = db
            .open_tree(TREE_META)
            .map_err(|e| StoreError::operation("open", TREE_META, e))?;
        Ok(SledDocumentStore {
            db,
            directories,
            files,
            meta,
            journal: Mutex::new(None),
        })
    }

    fn tree(&self, tree: JournalTree) -> &sled::Tree {
        match tree {
            JournalTree::Directories => &self.directories,
            JournalTree::Files => &self.files,
        }
    }

    /// Write `value` (or remove, when `None`) under `key`, journaling the
    /// prior value when a transaction is open.
    fn write(
        &self,
        tree: JournalTree,
        operation: &'static str,
        record: &str,
        key: &[u8],
        value: Option<Vec<u8>>,
    ) -> Result<(), StoreError> {
        let handle = self.tree(tree);
        let mut journal = self.journal.lock();
        if let Some(ops) = journal.as_mut() {
            let prior = handle
                .get(key)
                .map_err(|e| StoreError::operation(operation, record, e))?
                .map(|v| v.to_vec());
            ops.push(UndoOp {
                tree,
                key: key.to_vec(),
                prior,
            });
        }
        let result = match value {
            Some(bytes) => handle.insert(key, bytes).map(|_| ()),
            None => handle.remove(key).map(|_| ()),
        };
        result.map_err(|e| StoreError::operation(operation, record, e))
    }

    fn decode_directory(bytes: &[u8]) -> Result<DirectoryRecord, StoreError> {
        bincode::deserialize(bytes)
            .map_err(|e| StoreError::operation("decode", "directory record", e))
    }

    fn decode_file(bytes: &[u8]) -> Result<FileRecord, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::operation("decode", "file record", e))
    }

    fn encode<T: serde::Serialize>(record: &str, value: &T) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(value).map_err(|e| StoreError::operation("encode", record, e))
    }

    fn read_next_id(&self) -> Result<u64, StoreError> {
        Ok(self
            .meta
            .get(KEY_NEXT_DIRECTORY_ID)
            .map_err(|e| StoreError::operation("get", "next_directory_id", e))?
            .map(|bytes| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                u64::from_be_bytes(buf)
            })
            .unwrap_or(1))
    }

    fn write_next_id(&self, value: u64) -> Result<(), StoreError> {
        self.meta
            .insert(KEY_NEXT_DIRECTORY_ID, value.to_be_bytes().to_vec())
            .map_err(|e| StoreError::operation("update", "next_directory_id", e))?;
        Ok(())
    }

    /// Keep the allocator ahead of explicitly supplied ids.
    fn advance_id_floor(&self, id: FolderId) -> Result<(), StoreError> {
        if id >= self.read_next_id()? {
            self.write_next_id(id + 1)?;
        }
        Ok(())
    }
}

impl DocumentStore for SledDocumentStore {
    fn get_directory(&self, id: FolderId) -> Result<Option<DirectoryRecord>, StoreError> {
        self.directories
            .get(id.to_be_bytes())
            .map_err(|e| StoreError::operation("get", format!("directory {}", id), e))?
            .map(|bytes| Self::decode_directory(&bytes))
            .transpose()
    }

    fn find_directories(
        &self,
        predicate: DirectoryPredicate<'_>,
    ) -> Result<Vec<DirectoryRecord>, StoreError> {
        let mut out = Vec::new();
        for entry in self.directories.iter() {
            let (_, bytes) =
                entry.map_err(|e| StoreError::operation("scan", "directories", e))?;
            let record = Self::decode_directory(&bytes)?;
            if predicate(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn insert_directory(&self, record: &DirectoryRecord) -> Result<(), StoreError> {
        let label = format!("directory {}", record.id);
        if self
            .directories
            .contains_key(record.id.to_be_bytes())
            .map_err(|e| StoreError::operation("insert", label.as_str(), e))?
        {
            return Err(StoreError::operation("insert", label, "key already present"));
        }
        let bytes = Self::encode(&label, record)?;
        self.write(
            JournalTree::Directories,
            "insert",
            &label,
            &record.id.to_be_bytes(),
            Some(bytes),
        )?;
        self.advance_id_floor(record.id)
    }

    fn update_directory(&self, record: &DirectoryRecord) -> Result<(), StoreError> {
        let label = format!("directory {}", record.id);
        if !self
            .directories
            .contains_key(record.id.to_be_bytes())
            .map_err(|e| StoreError::operation("update", label.as_str(), e))?
        {
            return Err(StoreError::operation("update", label, "no such record"));
        }
        let bytes = Self::encode(&label, record)?;
        self.write(
            JournalTree::Directories,
            "update",
            &label,
            &record.id.to_be_bytes(),
            Some(bytes),
        )
    }

    fn delete_directory(&self, id: FolderId) -> Result<(), StoreError> {
        let label = format!("directory {}", id);
        self.write(
            JournalTree::Directories,
            "delete",
            &label,
            &id.to_be_bytes(),
            None,
        )
    }

    fn count_directories(&self) -> Result<u64, StoreError> {
        Ok(self.directories.len() as u64)
    }

    fn allocate_directory_id(&self) -> Result<FolderId, StoreError> {
        // Not journaled: ids are never reused, even across rollback.
        let current = self.read_next_id()?;
        self.write_next_id(current + 1)?;
        Ok(current)
    }

    fn get_file(&self, cid: &str) -> Result<Option<FileRecord>, StoreError> {
        self.files
            .get(cid.as_bytes())
            .map_err(|e| StoreError::operation("get", format!("file {}", cid), e))?
            .map(|bytes| Self::decode_file(&bytes))
            .transpose()
    }

    fn find_files(&self, predicate: FilePredicate<'_>) -> Result<Vec<FileRecord>, StoreError> {
        let mut out = Vec::new();
        for entry in self.files.iter() {
            let (_, bytes) = entry.map_err(|e| StoreError::operation("scan", "files", e))?;
            let record = Self::decode_file(&bytes)?;
            if predicate(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn insert_file(&self, record: &FileRecord) -> Result<(), StoreError> {
        let label = format!("file {}", record.cid);
        if self
            .files
            .contains_key(record.cid.as_bytes())
            .map_err(|e| StoreError::operation("insert", label.as_str(), e))?
        {
            return Err(StoreError::operation("insert", label, "key already present"));
        }
        let bytes = Self::encode(&label, record)?;
        self.write(
            JournalTree::Files,
            "insert",
            &label,
            record.cid.as_bytes(),
            Some(bytes),
        )
    }

    fn update_file(&self, record: &FileRecord) -> Result<(), StoreError> {
        let label = format!("file {}", record.cid);
        if !self
            .files
            .contains_key(record.cid.as_bytes())
            .map_err(|e| StoreError::operation("update", label.as_str(), e))?
        {
            return Err(StoreError::operation("update", label, "no such record"));
        }
        let bytes = Self::encode(&label, record)?;
        self.write(
            JournalTree::Files,
            "update",
            &label,
            record.cid.as_bytes(),
            Some(bytes),
        )
    }

    fn delete_file(&self, cid: &str) -> Result<(), StoreError> {
        let label = format!("file {}", cid);
        self.write(JournalTree::Files, "delete", &label, cid.as_bytes(), None)
    }

    fn count_files(&self) -> Result<u64, StoreError> {
        Ok(self.files.len() as u64)
    }

    fn begin_transaction(&self) -> Result<(), StoreError> {
        let mut journal = self.journal.lock();
        if journal.is_some() {
            return Err(StoreError::transaction(
                "begin",
                "transaction already in progress",
            ));
        }
        *journal = Some(Vec::new());
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut journal = self.journal.lock();
        if journal.is_none() {
            return Err(StoreError::transaction("commit", "no transaction in progress"));
        }
        // Flush before discarding the journal so a failed flush can still
        // be rolled back by the caller.
        self.db
            .flush()
            .map_err(|e| StoreError::transaction("commit", e))?;
        *journal = None;
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut journal = self.journal.lock();
        let ops = match journal.take() {
            Some(ops) => ops,
            None => {
                return Err(StoreError::transaction(
                    "rollback",
                    "no transaction in progress",
                ))
            }
        };
        for op in ops.into_iter().rev() {
            let handle = self.tree(op.tree);
            let result = match op.prior {
                Some(bytes) => handle.insert(op.key.as_slice(), bytes).map(|_| ()),
                None => handle.remove(op.key.as_slice()).map(|_| ()),
            };
            result.map_err(|e| StoreError::transaction("rollback", e))?;
        }
        Ok(())
    }
}
