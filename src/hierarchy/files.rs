//! File Manager
//!
//! Mirrors the folder manager for leaf entities. A file's primary key is
//! its canonical content identifier, so upsert existence is a direct key
//! lookup; identifiers cross this boundary in either encoding and are
//! canonicalized on entry.

use super::{folders, links, tx};
use crate::cid::{self, CidPair};
use crate::concurrency::ParentLockManager;
use crate::error::HierarchyError;
use crate::record::{DirectoryRecord, FileDraft, FileRecord, MetadataVisibility};
use crate::store::DocumentStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct FileManager {
    store: Arc<dyn DocumentStore>,
    locks: Arc<ParentLockManager>,
}

impl FileManager {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<ParentLockManager>) -> Self {
        FileManager { store, locks }
    }

    /// Upsert a file record, keyed by canonical content identifier.
    ///
    /// The target parent must exist (`FolderNotFound` otherwise, the same
    /// policy as folders). A changed parent is a move and rewrites both
    /// parents' `file_refs`. One transaction end to end.
    pub fn configure_file(&self, draft: &FileDraft) -> Result<CidPair, HierarchyError> {
        let pair = cid::parse(&draft.cid)?;
        let existing = self.store.get_file(&pair.modern)?;
        let old_parent = existing.as_ref().and_then(|r| r.parent_id);
        let new_parent = draft.parent_id;

        let locks = self.locks.locks_for(&[old_parent, new_parent]);
        let _guards: Vec<_> = locks.iter().map(|l| l.lock()).collect();

        let store = self.store.as_ref();
        tx::with_transaction(store, || {
            if let Some(parent_id) = new_parent {
                if store.get_directory(parent_id)?.is_none() {
                    return Err(HierarchyError::FolderNotFound(parent_id));
                }
            }

            let now = Utc::now();
            let inserted = existing.is_none();
            match existing {
                Some(mut record) => {
                    record.name = draft.name.clone();
                    record.parent_id = new_parent;
                    record.description = draft.description.clone();
                    record.mime_type_override = draft.mime_type_override.clone();
                    record.tags = draft.tags.clone();
                    record.metadata_visibility = draft.metadata_visibility;
                    record.download_policy = draft.download_policy;
                    record.updated_at = now;
                    store.update_file(&record)?;
                }
                None => {
                    let record = FileRecord {
                        cid: pair.modern.clone(),
                        parent_id: new_parent,
                        name: draft.name.clone(),
                        description: draft.description.clone(),
                        mime_type_override: draft.mime_type_override.clone(),
                        tags: draft.tags.clone(),
                        metadata_visibility: draft.metadata_visibility,
                        download_policy: draft.download_policy,
                        created_at: now,
                        updated_at: now,
                    };
                    store.insert_file(&record)?;
                }
            }

            if inserted {
                if let Some(parent_id) = new_parent {
                    links::attach_file_ref(store, parent_id, &pair.modern)?;
                }
            } else if old_parent != new_parent {
                if let Some(parent_id) = old_parent {
                    links::detach_file_ref(store, parent_id, &pair.modern)?;
                }
                if let Some(parent_id) = new_parent {
                    links::attach_file_ref(store, parent_id, &pair.modern)?;
                }
            }

            info!(cid = %pair.modern, parent = ?new_parent, inserted, "configured file");
            Ok(pair.clone())
        })
    }

    /// Delete a file record. No-op when absent; otherwise detaches the
    /// parent's reference (best-effort) and removes the record, in one
    /// transaction.
    pub fn delete_file(&self, input: &str) -> Result<(), HierarchyError> {
        let pair = cid::parse(input)?;
        let Some(record) = self.store.get_file(&pair.modern)? else {
            return Ok(());
        };

        let locks = self.locks.locks_for(&[record.parent_id]);
        let _guards: Vec<_> = locks.iter().map(|l| l.lock()).collect();

        let store = self.store.as_ref();
        tx::with_transaction(store, || {
            delete_file_record(store, &pair.modern, true)?;
            info!(cid = %pair.modern, "deleted file");
            Ok(())
        })
    }

    /// Plain lookup; accepts either encoding.
    pub fn try_get_file(&self, input: &str) -> Result<Option<FileRecord>, HierarchyError> {
        let pair = cid::parse(input)?;
        Ok(self.store.get_file(&pair.modern)?)
    }

    /// Ancestor path of the folder holding this file, root-first.
    ///
    /// `None` when the file does not exist or is hidden above the
    /// ceiling; the walk itself follows the folder rules.
    pub fn get_folder_path(
        &self,
        input: &str,
        ceiling: MetadataVisibility,
    ) -> Result<Option<Vec<DirectoryRecord>>, HierarchyError> {
        let pair = cid::parse(input)?;
        let Some(record) = self.store.get_file(&pair.modern)? else {
            return Ok(None);
        };
        if record.metadata_visibility > ceiling {
            return Ok(None);
        }
        folders::walk_path(self.store.as_ref(), record.parent_id, ceiling)
    }

    /// Raw file record count; maintenance statistic, no visibility
    /// filtering.
    pub fn get_file_count(&self) -> Result<u64, HierarchyError> {
        Ok(self.store.count_files()?)
    }

    /// Re-home a file whose parent no longer exists to the virtual root.
    /// Recovery twin of the folder operation.
    pub fn adopt_orphan(&self, input: &str) -> Result<bool, HierarchyError> {
        let pair = cid::parse(input)?;
        let Some(mut record) = self.store.get_file(&pair.modern)? else {
            return Ok(false);
        };
        let Some(parent_id) = record.parent_id else {
            return Ok(false);
        };
        if self.store.get_directory(parent_id)?.is_some() {
            return Ok(false);
        }
        record.parent_id = None;
        record.updated_at = Utc::now();
        self.store.update_file(&record)?;
        warn!(cid = %pair.modern, former_parent = parent_id, "re-homed orphaned file to root");
        Ok(true)
    }
}

/// Remove one file record inside an open transaction.
///
/// `detach` controls whether the parent's `file_refs` is rewritten; the
/// folder cascade passes `false` because the owning record is deleted in
/// the same pass.
pub(crate) fn delete_file_record(
    store: &dyn DocumentStore,
    cid: &str,
    detach: bool,
) -> Result<(), HierarchyError> {
    let Some(record) = store.get_file(cid)? else {
        return Ok(());
    };
    if detach {
        if let Some(parent_id) = record.parent_id {
            links::detach_file_ref(store, parent_id, cid)?;
        }
    }
    store.delete_file(cid)?;
    debug!(cid, "removed file record");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Repository;
    use crate::record::FolderDraft;
    use crate::store::MemoryDocumentStore;

    const LEGACY: &str = "Qmaobf4QpYonZL4dGDhoc68ZQ7SfCwRdcC9fU9TJyQnBpY";
    const MODERN: &str = "bafybeifzgn4th5udmc4u6hnv4b4xeaommqn64g763ifwbc3pa6ihemfx4u";

    fn repo() -> Repository {
        Repository::new(Arc::new(MemoryDocumentStore::new()))
    }

    #[test]
    fn legacy_input_is_stored_under_the_modern_key() {
        let repo = repo();
        let pair = repo
            .files
            .configure_file(&FileDraft::new(LEGACY, "paper.pdf"))
            .unwrap();
        assert_eq!(pair.modern, MODERN);

        // Lookup succeeds under either encoding.
        assert!(repo.files.try_get_file(LEGACY).unwrap().is_some());
        let record = repo.files.try_get_file(MODERN).unwrap().unwrap();
        assert_eq!(record.cid, MODERN);
    }

    #[test]
    fn missing_parent_is_rejected() {
        let repo = repo();
        let mut draft = FileDraft::new(LEGACY, "stray.bin");
        draft.parent_id = Some(77);
        let err = repo.files.configure_file(&draft).unwrap_err();
        assert!(matches!(err, HierarchyError::FolderNotFound(77)));
        assert_eq!(repo.files.get_file_count().unwrap(), 0);
    }

    #[test]
    fn upsert_replaces_metadata() {
        let repo = repo();
        repo.files
            .configure_file(&FileDraft::new(LEGACY, "draft.txt"))
            .unwrap();

        let mut updated = FileDraft::new(MODERN, "final.txt");
        updated.description = Some("camera-ready".to_string());
        repo.files.configure_file(&updated).unwrap();

        let record = repo.files.try_get_file(MODERN).unwrap().unwrap();
        assert_eq!(record.name, "final.txt");
        assert_eq!(record.description.as_deref(), Some("camera-ready"));
        assert_eq!(repo.files.get_file_count().unwrap(), 1);
    }

    #[test]
    fn delete_absent_file_is_a_noop() {
        let repo = repo();
        repo.files.delete_file(LEGACY).unwrap();
    }

    #[test]
    fn garbage_cid_is_invalid() {
        let repo = repo();
        let err = repo.files.try_get_file("junk").unwrap_err();
        assert!(matches!(err, HierarchyError::InvalidCid(_)));
    }

    #[test]
    fn file_path_walks_the_folder_chain() {
        let repo = repo();
        let parent = repo
            .folders
            .configure_folder(&FolderDraft {
                name: Some("papers".to_string()),
                ..FolderDraft::default()
            })
            .unwrap();
        let mut draft = FileDraft::new(LEGACY, "paper.pdf");
        draft.parent_id = Some(parent);
        repo.files.configure_file(&draft).unwrap();

        let path = repo
            .files
            .get_folder_path(MODERN, MetadataVisibility::Public)
            .unwrap()
            .unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].id, parent);
    }
}
