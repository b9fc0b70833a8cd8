//! Core identifier types for the folder namespace.

/// FolderId: opaque integer key of a directory record, assigned at creation
/// and stable for the record's lifetime.
pub type FolderId = u64;
