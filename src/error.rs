//! Error types for the repository engine.

use crate::types::FolderId;
use thiserror::Error;

/// Failure of a document-store primitive.
///
/// Always records which primitive failed and on which record, so a failed
/// multi-record mutation can be traced to the write that broke it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An insert/update/delete/lookup/count primitive reported failure.
    #[error("{operation} failed for {record}: {message}")]
    OperationFailed {
        operation: &'static str,
        record: String,
        message: String,
    },

    /// A begin/commit/rollback primitive reported failure.
    #[error("transaction {action} failed: {message}")]
    Transaction {
        action: &'static str,
        message: String,
    },
}

impl StoreError {
    pub(crate) fn operation(
        operation: &'static str,
        record: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        StoreError::OperationFailed {
            operation,
            record: record.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn transaction(action: &'static str, message: impl ToString) -> Self {
        StoreError::Transaction {
            action,
            message: message.to_string(),
        }
    }
}

/// Errors surfaced by the folder and file managers.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// A referenced parent folder does not exist where the contract
    /// requires it to.
    #[error("folder {0} not found")]
    FolderNotFound(FolderId),

    /// A move would place a folder inside its own subtree.
    #[error("moving folder {folder} under {parent} would create a cycle")]
    WouldCreateCycle { folder: FolderId, parent: FolderId },

    /// An interior ancestor was missing (or revisited) while walking a
    /// parent chain upward. Distinct from the origin itself being absent.
    #[error("ancestry chain of folder {origin} is broken at folder {missing}")]
    BrokenAncestryChain { origin: FolderId, missing: FolderId },

    /// A content identifier string could not be decoded under either
    /// known scheme.
    #[error(transparent)]
    InvalidCid(#[from] crate::cid::InvalidCid),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A rollback attempted after a primary failure itself failed.
    /// Carries both causes; neither is swallowed.
    #[error("rollback failed after error ({original}); rollback reported: {rollback}")]
    RollbackFailed {
        original: Box<HierarchyError>,
        rollback: StoreError,
    },
}
