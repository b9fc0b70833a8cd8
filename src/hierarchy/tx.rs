//! Transaction discipline shared by the folder and file managers.

use crate::error::HierarchyError;
use crate::store::DocumentStore;

/// Run `op` between `begin_transaction` and `commit`.
///
/// An error from `op` (or from the commit itself) triggers a rollback
/// before the error propagates. A rollback that itself fails must not
/// suppress the original error: both are carried by
/// [`HierarchyError::RollbackFailed`].
pub(crate) fn with_transaction<T>(
    store: &dyn DocumentStore,
    op: impl FnOnce() -> Result<T, HierarchyError>,
) -> Result<T, HierarchyError> {
    store.begin_transaction().map_err(HierarchyError::Store)?;
    let outcome = match op() {
        Ok(value) => match store.commit() {
            Ok(()) => return Ok(value),
            Err(commit_err) => HierarchyError::Store(commit_err),
        },
        Err(op_err) => op_err,
    };
    match store.rollback() {
        Ok(()) => Err(outcome),
        Err(rollback) => Err(HierarchyError::RollbackFailed {
            original: Box::new(outcome),
            rollback,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{DocumentStore, MemoryDocumentStore};

    #[test]
    fn commit_on_success() {
        let store = MemoryDocumentStore::new();
        let result = with_transaction(&store, || Ok(42));
        assert_eq!(result.unwrap(), 42);
        // No transaction left open.
        assert!(store.begin_transaction().is_ok());
    }

    #[test]
    fn rollback_on_error() {
        let store = MemoryDocumentStore::new();
        let result: Result<(), _> = with_transaction(&store, || {
            Err(HierarchyError::Store(StoreError::operation(
                "update",
                "directory 1",
                "boom",
            )))
        });
        assert!(result.is_err());
        assert!(store.begin_transaction().is_ok());
    }
}
