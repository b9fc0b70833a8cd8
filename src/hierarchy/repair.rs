//! Read-triggered garbage collection.
//!
//! A crash between a record deletion and the matching link-list update
//! leaves a dangling reference in the parent's cache. The repair pass
//! drops such references. It is a pure function so the policy is testable
//! apart from the write that persists the correction.

use crate::record::DirectoryRecord;
use crate::types::FolderId;
use std::collections::HashSet;

/// Drop references to records that no longer exist from `record`'s cached
/// lists.
///
/// Returns the cleaned record and whether anything was dropped. Empty
/// lists are normalized to `None`.
pub fn repair(
    record: &DirectoryRecord,
    live_folders: &HashSet<FolderId>,
    live_files: &HashSet<String>,
) -> (DirectoryRecord, bool) {
    let mut clean = record.clone();
    let mut dirty = false;

    if let Some(children) = clean.child_folder_ids.as_mut() {
        let before = children.len();
        children.retain(|id| live_folders.contains(id));
        dirty |= children.len() != before;
    }
    if let Some(refs) = clean.file_refs.as_mut() {
        let before = refs.len();
        refs.retain(|cid| live_files.contains(cid));
        dirty |= refs.len() != before;
    }
    if dirty {
        clean.normalize();
    }
    (clean, dirty)
}
