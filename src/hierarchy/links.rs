//! Parent-link maintenance.
//!
//! A directory's cached lists duplicate the parent pointers of its
//! members. Every mutation of those lists goes through this module, so
//! the add/remove logic exists at exactly one site.

use crate::error::HierarchyError;
use crate::store::DocumentStore;
use crate::types::FolderId;
use chrono::Utc;
use tracing::debug;

/// Add `child` to the cached children of `parent_id`.
///
/// Fails with [`HierarchyError::FolderNotFound`] when the parent record
/// does not exist; the caller's transaction rolls the operation back.
pub(crate) fn attach_child_folder(
    store: &dyn DocumentStore,
    parent_id: FolderId,
    child: FolderId,
) -> Result<(), HierarchyError> {
    let mut parent = store
        .get_directory(parent_id)?
        .ok_or(HierarchyError::FolderNotFound(parent_id))?;
    let children = parent.child_folder_ids.get_or_insert_with(Vec::new);
    if !children.contains(&child) {
        children.push(child);
        parent.updated_at = Utc::now();
        store.update_directory(&parent)?;
        debug!(parent = parent_id, child, "attached child folder");
    }
    Ok(())
}

/// Remove `child` from the cached children of `parent_id`.
///
/// A missing parent, or a list that never held the id, is a no-op.
pub(crate) fn detach_child_folder(
    store: &dyn DocumentStore,
    parent_id: FolderId,
    child: FolderId,
) -> Result<(), HierarchyError> {
    let Some(mut parent) = store.get_directory(parent_id)? else {
        return Ok(());
    };
    if let Some(children) = parent.child_folder_ids.as_mut() {
        let before = children.len();
        children.retain(|c| *c != child);
        if children.len() != before {
            parent.normalize();
            parent.updated_at = Utc::now();
            store.update_directory(&parent)?;
            debug!(parent = parent_id, child, "detached child folder");
        }
    }
    Ok(())
}

/// Add `cid` to the cached file references of `parent_id`.
pub(crate) fn attach_file_ref(
    store: &dyn DocumentStore,
    parent_id: FolderId,
    cid: &str,
) -> Result<(), HierarchyError> {
    let mut parent = store
        .get_directory(parent_id)?
        .ok_or(HierarchyError::FolderNotFound(parent_id))?;
    let refs = parent.file_refs.get_or_insert_with(Vec::new);
    if !refs.iter().any(|r| r == cid) {
        refs.push(cid.to_string());
        parent.updated_at = Utc::now();
        store.update_directory(&parent)?;
        debug!(parent = parent_id, cid, "attached file reference");
    }
    Ok(())
}

/// Remove `cid` from the cached file references of `parent_id`.
///
/// Best-effort: a missing parent, or a list that never held the cid,
/// leaves the parent untouched.
pub(crate) fn detach_file_ref(
    store: &dyn DocumentStore,
    parent_id: FolderId,
    cid: &str,
) -> Result<(), HierarchyError> {
    let Some(mut parent) = store.get_directory(parent_id)? else {
        return Ok(());
    };
    if let Some(refs) = parent.file_refs.as_mut() {
        let before = refs.len();
        refs.retain(|r| r != cid);
        if refs.len() != before {
            parent.normalize();
            parent.updated_at = Utc::now();
            store.update_directory(&parent)?;
            debug!(parent = parent_id, cid, "detached file reference");
        }
    }
    Ok(())
}
