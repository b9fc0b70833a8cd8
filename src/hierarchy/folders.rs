//! Folder Manager
//!
//! Creates, relocates, and deletes directory records while keeping the
//! denormalized parent/child links consistent; computes the virtual
//! root's contents; resolves ancestor paths; repairs stale cached
//! references on read.

use super::{links, repair, tx, FolderContents};
use crate::concurrency::ParentLockManager;
use crate::error::HierarchyError;
use crate::record::{DirectoryRecord, FolderDraft, MetadataVisibility, DEFAULT_FOLDER_NAME};
use crate::store::DocumentStore;
use crate::types::FolderId;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

pub struct FolderManager {
    store: Arc<dyn DocumentStore>,
    locks: Arc<ParentLockManager>,
}

impl FolderManager {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<ParentLockManager>) -> Self {
        FolderManager { store, locks }
    }

    /// Upsert a folder.
    ///
    /// A draft whose id resolves to an existing record updates it (a
    /// changed `parent_id` is a move); any other draft inserts. The
    /// target parent must exist (`FolderNotFound` otherwise), and a move
    /// may not place a folder inside its own subtree. All writes,
    /// including the record itself, run in one transaction.
    pub fn configure_folder(&self, draft: &FolderDraft) -> Result<FolderId, HierarchyError> {
        let existing = match draft.id {
            Some(id) => self.store.get_directory(id)?,
            None => None,
        };
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
                if let Some(record) = existing.as_ref() {
                    ensure_no_cycle(store, record.id, parent_id)?;
                }
            }

            let now = Utc::now();
            let (id, inserted) = match existing {
                Some(mut record) => {
                    if let Some(name) = draft.name.clone() {
                        record.name = name;
                    }
                    record.parent_id = new_parent;
                    record.metadata_visibility = draft.metadata_visibility;
                    record.download_policy = draft.download_policy;
                    record.updated_at = now;
                    store.update_directory(&record)?;
                    (record.id, false)
                }
                None => {
                    let id = match draft.id {
                        Some(id) => id,
                        None => store.allocate_directory_id()?,
                    };
                    let name = draft
                        .name
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| DEFAULT_FOLDER_NAME.to_string());
                    let record = DirectoryRecord {
                        id,
                        name,
                        parent_id: new_parent,
                        metadata_visibility: draft.metadata_visibility,
                        download_policy: draft.download_policy,
                        child_folder_ids: None,
                        file_refs: None,
                        created_at: now,
                        updated_at: now,
                    };
                    store.insert_directory(&record)?;
                    (id, true)
                }
            };

            if inserted {
                if let Some(parent_id) = new_parent {
                    links::attach_child_folder(store, parent_id, id)?;
                }
            } else if old_parent != new_parent {
                if let Some(parent_id) = old_parent {
                    links::detach_child_folder(store, parent_id, id)?;
                }
                if let Some(parent_id) = new_parent {
                    links::attach_child_folder(store, parent_id, id)?;
                }
            }

            info!(folder = id, parent = ?new_parent, inserted, "configured folder");
            Ok(id)
        })
    }

    /// Delete a folder and everything beneath it.
    ///
    /// No-op when the folder is absent. The depth-first cascade (child
    /// folders, directly referenced files, the link back from the parent,
    /// the record itself) runs in a single transaction.
    pub fn delete_folder(&self, id: FolderId) -> Result<(), HierarchyError> {
        let Some(record) = self.store.get_directory(id)? else {
            return Ok(());
        };

        let locks = self.locks.locks_for(&[record.parent_id, Some(id)]);
        let _guards: Vec<_> = locks.iter().map(|l| l.lock()).collect();

        let store = self.store.as_ref();
        tx::with_transaction(store, || {
            let mut seen = HashSet::new();
            delete_subtree(store, id, true, &mut seen)?;
            info!(folder = id, "deleted folder subtree");
            Ok(())
        })
    }

    /// Plain lookup, no side effects.
    pub fn try_get_folder(&self, id: FolderId) -> Result<Option<DirectoryRecord>, HierarchyError> {
        Ok(self.store.get_directory(id)?)
    }

    /// Resolve a folder's cached lists into live records.
    ///
    /// Side effect: any cached reference that no longer resolves is
    /// dropped, and the corrected record is persisted when drift was
    /// found. The corrective write is deliberately outside any
    /// transaction: its failure leaves the stale list intact and
    /// propagates as a store error. The visibility ceiling filters the
    /// returned records, not the repair.
    pub fn try_get_folder_contents(
        &self,
        id: FolderId,
        ceiling: MetadataVisibility,
    ) -> Result<Option<FolderContents>, HierarchyError> {
        let Some(record) = self.store.get_directory(id)? else {
            return Ok(None);
        };

        let mut folders = Vec::new();
        let mut live_folders = HashSet::new();
        for child_id in record.child_folder_ids.iter().flatten() {
            if let Some(child) = self.store.get_directory(*child_id)? {
                live_folders.insert(*child_id);
                folders.push(child);
            }
        }

        let mut files = Vec::new();
        let mut live_files = HashSet::new();
        for cid in record.file_refs.iter().flatten() {
            if let Some(file) = self.store.get_file(cid)? {
                live_files.insert(cid.clone());
                files.push(file);
            }
        }

        let (clean, dirty) = repair::repair(&record, &live_folders, &live_files);
        if dirty {
            self.store.update_directory(&clean)?;
            warn!(folder = id, "dropped dangling references from cached lists");
        }

        folders.retain(|f| f.metadata_visibility <= ceiling);
        files.retain(|f| f.metadata_visibility <= ceiling);
        Ok(Some(FolderContents { folders, files }))
    }

    /// Contents of the virtual root: every record without a parent.
    ///
    /// The root has no record and no cached lists, so this is a predicate
    /// scan and never mutates anything.
    pub fn get_root_folder(
        &self,
        ceiling: MetadataVisibility,
    ) -> Result<FolderContents, HierarchyError> {
        let folders = self
            .store
            .find_directories(&|r| r.parent_id.is_none() && r.metadata_visibility <= ceiling)?;
        let files = self
            .store
            .find_files(&|r| r.parent_id.is_none() && r.metadata_visibility <= ceiling)?;
        Ok(FolderContents { folders, files })
    }

    /// Ancestor path of a folder, root-first; the last element is the
    /// folder itself. `None` id (the virtual root) yields the empty path.
    pub fn get_folder_path(
        &self,
        id: Option<FolderId>,
        ceiling: MetadataVisibility,
    ) -> Result<Option<Vec<DirectoryRecord>>, HierarchyError> {
        walk_path(self.store.as_ref(), id, ceiling)
    }

    /// Re-home a folder whose parent no longer exists to the virtual root.
    ///
    /// Recovery entry point for drift left by out-of-band deletions;
    /// regular configure calls refuse a missing parent instead of
    /// guessing. Returns whether a re-home happened.
    pub fn adopt_orphan(&self, id: FolderId) -> Result<bool, HierarchyError> {
        let Some(mut record) = self.store.get_directory(id)? else {
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
        self.store.update_directory(&record)?;
        warn!(folder = id, former_parent = parent_id, "re-homed orphaned folder to root");
        Ok(true)
    }

    /// Raw directory record count; maintenance statistic.
    pub fn get_folder_count(&self) -> Result<u64, HierarchyError> {
        Ok(self.store.count_directories()?)
    }
}

/// Walk `parent_id` upward from `id`, collect the records, and reverse so
/// index 0 is nearest the root.
///
/// The origin being absent (or hidden above `ceiling`, itself or any
/// ancestor) yields `None`. A missing or revisited *interior* ancestor is
/// the distinct `BrokenAncestryChain` error.
pub(crate) fn walk_path(
    store: &dyn DocumentStore,
    id: Option<FolderId>,
    ceiling: MetadataVisibility,
) -> Result<Option<Vec<DirectoryRecord>>, HierarchyError> {
    let Some(origin) = id else {
        return Ok(Some(Vec::new()));
    };
    let Some(record) = store.get_directory(origin)? else {
        return Ok(None);
    };
    if record.metadata_visibility > ceiling {
        return Ok(None);
    }

    let mut seen = HashSet::from([origin]);
    let mut next = record.parent_id;
    let mut chain = vec![record];
    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            return Err(HierarchyError::BrokenAncestryChain {
                origin,
                missing: parent_id,
            });
        }
        let Some(parent) = store.get_directory(parent_id)? else {
            return Err(HierarchyError::BrokenAncestryChain {
                origin,
                missing: parent_id,
            });
        };
        if parent.metadata_visibility > ceiling {
            return Ok(None);
        }
        next = parent.parent_id;
        chain.push(parent);
    }
    chain.reverse();
    Ok(Some(chain))
}

/// Reject a parent assignment that would place `folder` inside its own
/// subtree.
fn ensure_no_cycle(
    store: &dyn DocumentStore,
    folder: FolderId,
    new_parent: FolderId,
) -> Result<(), HierarchyError> {
    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == folder {
            return Err(HierarchyError::WouldCreateCycle {
                folder,
                parent: new_parent,
            });
        }
        if !seen.insert(current) {
            // Pre-existing cycle upstream; stop the walk.
            break;
        }
        cursor = store.get_directory(current)?.and_then(|r| r.parent_id);
    }
    Ok(())
}

fn delete_subtree(
    store: &dyn DocumentStore,
    id: FolderId,
    detach_from_parent: bool,
    seen: &mut HashSet<FolderId>,
) -> Result<(), HierarchyError> {
    if !seen.insert(id) {
        return Ok(());
    }
    let Some(record) = store.get_directory(id)? else {
        return Ok(());
    };
    for child in record.child_folder_ids.clone().unwrap_or_default() {
        delete_subtree(store, child, false, seen)?;
    }
    for cid in record.file_refs.clone().unwrap_or_default() {
        // The owning record is deleted next; skip rewriting its refs list.
        super::files::delete_file_record(store, &cid, false)?;
    }
    if detach_from_parent {
        if let Some(parent_id) = record.parent_id {
            links::detach_child_folder(store, parent_id, id)?;
        }
    }
    store.delete_directory(id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Repository;
    use crate::store::MemoryDocumentStore;

    fn repo() -> Repository {
        Repository::new(Arc::new(MemoryDocumentStore::new()))
    }

    fn named(name: &str, parent: Option<FolderId>) -> FolderDraft {
        FolderDraft {
            name: Some(name.to_string()),
            parent_id: parent,
            ..FolderDraft::default()
        }
    }

    #[test]
    fn insert_links_child_into_parent() {
        let repo = repo();
        let parent = repo.folders.configure_folder(&named("parent", None)).unwrap();
        let child = repo
            .folders
            .configure_folder(&named("child", Some(parent)))
            .unwrap();

        let record = repo.folders.try_get_folder(parent).unwrap().unwrap();
        assert_eq!(record.child_folder_ids, Some(vec![child]));
    }

    #[test]
    fn missing_parent_is_rejected() {
        let repo = repo();
        let err = repo
            .folders
            .configure_folder(&named("stray", Some(404)))
            .unwrap_err();
        assert!(matches!(err, HierarchyError::FolderNotFound(404)));
        // The rejected insert left nothing behind.
        assert_eq!(repo.folders.get_folder_count().unwrap(), 0);
    }

    #[test]
    fn move_rewrites_both_parents() {
        let repo = repo();
        let a = repo.folders.configure_folder(&named("a", None)).unwrap();
        let b = repo.folders.configure_folder(&named("b", None)).unwrap();
        let child = repo.folders.configure_folder(&named("c", Some(a))).unwrap();

        repo.folders
            .configure_folder(&FolderDraft {
                id: Some(child),
                parent_id: Some(b),
                ..FolderDraft::default()
            })
            .unwrap();

        let a_record = repo.folders.try_get_folder(a).unwrap().unwrap();
        let b_record = repo.folders.try_get_folder(b).unwrap().unwrap();
        assert_eq!(a_record.child_folder_ids, None);
        assert_eq!(b_record.child_folder_ids, Some(vec![child]));
    }

    #[test]
    fn rename_keeps_links_untouched() {
        let repo = repo();
        let parent = repo.folders.configure_folder(&named("parent", None)).unwrap();
        let child = repo
            .folders
            .configure_folder(&named("old", Some(parent)))
            .unwrap();

        repo.folders
            .configure_folder(&FolderDraft {
                id: Some(child),
                name: Some("new".to_string()),
                parent_id: Some(parent),
                ..FolderDraft::default()
            })
            .unwrap();

        let record = repo.folders.try_get_folder(child).unwrap().unwrap();
        assert_eq!(record.name, "new");
        let parent_record = repo.folders.try_get_folder(parent).unwrap().unwrap();
        assert_eq!(parent_record.child_folder_ids, Some(vec![child]));
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let repo = repo();
        let a = repo.folders.configure_folder(&named("a", None)).unwrap();
        let b = repo.folders.configure_folder(&named("b", Some(a))).unwrap();
        let c = repo.folders.configure_folder(&named("c", Some(b))).unwrap();

        let err = repo
            .folders
            .configure_folder(&FolderDraft {
                id: Some(a),
                parent_id: Some(c),
                ..FolderDraft::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            HierarchyError::WouldCreateCycle { folder, parent } if folder == a && parent == c
        ));
    }

    #[test]
    fn blank_name_gets_the_default() {
        let repo = repo();
        let id = repo
            .folders
            .configure_folder(&FolderDraft::default())
            .unwrap();
        let record = repo.folders.try_get_folder(id).unwrap().unwrap();
        assert_eq!(record.name, DEFAULT_FOLDER_NAME);
    }

    #[test]
    fn delete_absent_folder_is_a_noop() {
        let repo = repo();
        repo.folders.delete_folder(99).unwrap();
    }

    #[test]
    fn root_path_is_empty() {
        let repo = repo();
        let path = repo
            .folders
            .get_folder_path(None, MetadataVisibility::Public)
            .unwrap();
        assert_eq!(path, Some(Vec::new()));
    }

    #[test]
    fn hidden_folder_is_invisible_below_its_ceiling() {
        let repo = repo();
        let id = repo
            .folders
            .configure_folder(&FolderDraft {
                name: Some("secret".to_string()),
                metadata_visibility: MetadataVisibility::Private,
                ..FolderDraft::default()
            })
            .unwrap();

        let root = repo
            .folders
            .get_root_folder(MetadataVisibility::Public)
            .unwrap();
        assert!(root.folders.is_empty());

        let path = repo
            .folders
            .get_folder_path(Some(id), MetadataVisibility::Public)
            .unwrap();
        assert_eq!(path, None);

        let root = repo
            .folders
            .get_root_folder(MetadataVisibility::Private)
            .unwrap();
        assert_eq!(root.folders.len(), 1);
    }
}
