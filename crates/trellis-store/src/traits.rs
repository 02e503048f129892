//! The physical substrate contract.
//!
//! The engine is written once against this seam; the medium underneath may
//! be a flat ordered keyspace, a hierarchical bucket tree, or a relational
//! schema emulating prefix scans. All implementations must satisfy:
//!
//! - keys are opaque byte paths; iteration order is lexicographic;
//! - every logical operation runs inside exactly one transaction, acquired
//!   for its duration and released on completion;
//! - mutations inside one transaction apply atomically relative to other
//!   transactions, or not at all when the operation errors;
//! - a read-only transaction observes a consistent snapshot and rejects
//!   writes;
//! - I/O errors are propagated, never silently ignored.

use crate::error::StoreResult;

/// Transaction access mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Snapshot-consistent reads only.
    ReadOnly,
    /// Read-modify-write access.
    ReadWrite,
}

/// One transaction against the substrate keyspace.
pub trait Transaction {
    /// Read the value at `key`, if present.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Stage a write of `value` at `key`.
    ///
    /// Fails with the conflict kind in a read-only transaction.
    fn put(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Stage removal of `key`. Removing an absent key is a no-op.
    ///
    /// Fails with the conflict kind in a read-only transaction.
    fn delete(&mut self, key: &[u8]) -> StoreResult<()>;

    /// All pairs whose key starts with `prefix`, in lexicographic key
    /// order. Staged mutations of this transaction are visible.
    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// The physical storage substrate.
///
/// Implementations must be thread-safe; concurrent transactions from
/// independent callers are serialized (or isolated) by the backend.
pub trait Substrate: Send + Sync {
    /// Run `op` inside a transaction of the given mode.
    ///
    /// On `Ok`, staged mutations are committed; on `Err`, they are
    /// discarded and the error is returned to the caller.
    fn transaction(
        &self,
        mode: Mode,
        op: &mut dyn FnMut(&mut dyn Transaction) -> StoreResult<()>,
    ) -> StoreResult<()>;
}
