//! Tree entries for namespace rendering.
//!
//! Folders and files share the listing surface. The tagged union keeps
//! the common accessors in one place for UI and CLI rendering instead of
//! spreading them over an inheritance-style hierarchy.

use crate::hierarchy::FolderContents;
use crate::record::{DirectoryRecord, FileRecord, MetadataVisibility};
use crate::types::FolderId;
use serde::Serialize;

/// One renderable node of the namespace tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeEntry {
    Folder(DirectoryRecord),
    File(FileRecord),
}

impl TreeEntry {
    pub fn name(&self) -> &str {
        match self {
            TreeEntry::Folder(r) => &r.name,
            TreeEntry::File(r) => &r.name,
        }
    }

    pub fn parent_id(&self) -> Option<FolderId> {
        match self {
            TreeEntry::Folder(r) => r.parent_id,
            TreeEntry::File(r) => r.parent_id,
        }
    }

    /// Display key: the folder id or the canonical content identifier.
    pub fn key(&self) -> String {
        match self {
            TreeEntry::Folder(r) => r.id.to_string(),
            TreeEntry::File(r) => r.cid.clone(),
        }
    }

    pub fn visibility(&self) -> MetadataVisibility {
        match self {
            TreeEntry::Folder(r) => r.metadata_visibility,
            TreeEntry::File(r) => r.metadata_visibility,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, TreeEntry::Folder(_))
    }
}

/// Flatten resolved contents into entries ordered folders-first, then by
/// name, then by key for a stable tie-break.
pub fn entries(contents: &FolderContents) -> Vec<TreeEntry> {
    let mut out: Vec<TreeEntry> = contents
        .folders
        .iter()
        .cloned()
        .map(TreeEntry::Folder)
        .chain(contents.files.iter().cloned().map(TreeEntry::File))
        .collect();
    out.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name().cmp(b.name()))
            .then_with(|| a.key().cmp(&b.key()))
    });
    out
}
