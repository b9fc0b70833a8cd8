//! Persisted record types for the folder namespace.
//!
//! A directory record is the persisted representation of a folder; a file
//! record holds a stored file's metadata (its bytes live in the external
//! content store, keyed by the canonical content identifier). Both carry a
//! parent pointer, and directories additionally cache the reverse
//! relationship in denormalized link lists.

use crate::types::FolderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name given to a folder when the caller leaves it blank.
pub const DEFAULT_FOLDER_NAME: &str = "New Folder";

/// Visibility ceiling for metadata reads.
///
/// Ordered: a record is included in a read when its own level is at or
/// below the ceiling of the query.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetadataVisibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

/// Whether the content bytes behind a record may be fetched from the
/// content store. Carried per record, independent of visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPolicy {
    #[default]
    Allow,
    Deny,
}

/// Directory record: the persisted representation of a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub id: FolderId,
    pub name: String,
    /// `None` means the folder lives at the virtual root.
    pub parent_id: Option<FolderId>,
    pub metadata_visibility: MetadataVisibility,
    pub download_policy: DownloadPolicy,
    /// Cached ids of directory records whose `parent_id` is this record.
    /// Empty is normalized to `None`.
    pub child_folder_ids: Option<Vec<FolderId>>,
    /// Cached canonical content identifiers of file records whose
    /// `parent_id` is this record. Empty is normalized to `None`.
    pub file_refs: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DirectoryRecord {
    /// Collapse empty cached lists to `None`.
    pub(crate) fn normalize(&mut self) {
        if self.child_folder_ids.as_ref().is_some_and(Vec::is_empty) {
            self.child_folder_ids = None;
        }
        if self.file_refs.as_ref().is_some_and(Vec::is_empty) {
            self.file_refs = None;
        }
    }
}

/// File record: the persisted metadata of one stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Canonical (modern form) content identifier; the primary key.
    pub cid: String,
    /// `None` means the file lives at the virtual root.
    pub parent_id: Option<FolderId>,
    pub name: String,
    pub description: Option<String>,
    pub mime_type_override: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub metadata_visibility: MetadataVisibility,
    pub download_policy: DownloadPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied folder state for upserts.
///
/// A draft whose `id` resolves to an existing record updates it; any other
/// draft inserts. An explicit unknown id is preserved on insert so bulk
/// import can replay exported trees.
#[derive(Debug, Clone, Default)]
pub struct FolderDraft {
    pub id: Option<FolderId>,
    pub name: Option<String>,
    pub parent_id: Option<FolderId>,
    pub metadata_visibility: MetadataVisibility,
    pub download_policy: DownloadPolicy,
}

/// Caller-supplied file state for upserts. The content identifier may be
/// given in either encoding; it is canonicalized on entry.
#[derive(Debug, Clone)]
pub struct FileDraft {
    pub cid: String,
    pub name: String,
    pub parent_id: Option<FolderId>,
    pub description: Option<String>,
    pub mime_type_override: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub metadata_visibility: MetadataVisibility,
    pub download_policy: DownloadPolicy,
}

impl FileDraft {
    pub fn new(cid: impl Into<String>, name: impl Into<String>) -> Self {
        FileDraft {
            cid: cid.into(),
            name: name.into(),
            parent_id: None,
            description: None,
            mime_type_override: None,
            tags: None,
            metadata_visibility: MetadataVisibility::default(),
            download_policy: DownloadPolicy::default(),
        }
    }
}
