//! In-memory substrate for tests, development, and embedding.
//!
//! [`MemorySubstrate`] keeps the whole keyspace in a `BTreeMap` behind an
//! `RwLock`: reads take the shared lock for a consistent snapshot, writes
//! take the exclusive lock and stage their mutations, applying them only
//! when the transaction closure succeeds. Data is lost when the substrate
//! is dropped.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::{Mode, Substrate, Transaction};

/// A flat, ordered, prefix-scannable keyspace held in memory.
pub struct MemorySubstrate {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemorySubstrate {
    /// Create an empty substrate.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().expect("lock poisoned").is_empty()
    }
}

impl Default for MemorySubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemorySubstrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySubstrate")
            .field("keys", &self.len())
            .finish()
    }
}

impl Substrate for MemorySubstrate {
    fn transaction(
        &self,
        mode: Mode,
        op: &mut dyn FnMut(&mut dyn Transaction) -> StoreResult<()>,
    ) -> StoreResult<()> {
        match mode {
            Mode::ReadOnly => {
                let guard = self.data.read().expect("lock poisoned");
                let mut tx = ReadTransaction { data: &guard };
                op(&mut tx)
            }
            Mode::ReadWrite => {
                let mut guard = self.data.write().expect("lock poisoned");
                let staged = {
                    let mut tx = WriteTransaction {
                        base: &guard,
                        staged: BTreeMap::new(),
                    };
                    op(&mut tx)?;
                    tx.staged
                };
                for (key, change) in staged {
                    match change {
                        Some(value) => {
                            guard.insert(key, value);
                        }
                        None => {
                            guard.remove(&key);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

struct ReadTransaction<'a> {
    data: &'a BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Transaction for ReadTransaction<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], _value: &[u8]) -> StoreResult<()> {
        Err(StoreError::Conflict(format!(
            "write to {} in a read-only transaction",
            String::from_utf8_lossy(key)
        )))
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        Err(StoreError::Conflict(format!(
            "delete of {} in a read-only transaction",
            String::from_utf8_lossy(key)
        )))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Read-modify-write transaction: mutations accumulate in `staged`
/// (`None` marks a deletion) and commit only on success.
struct WriteTransaction<'a> {
    base: &'a BTreeMap<Vec<u8>, Vec<u8>>,
    staged: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Transaction for WriteTransaction<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if let Some(change) = self.staged.get(key) {
            return Ok(change.clone());
        }
        Ok(self.base.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.staged.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.staged.insert(key.to_vec(), None);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .base
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, change) in self
            .staged
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match change {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(substrate: &MemorySubstrate, key: &[u8], value: &[u8]) {
        substrate
            .transaction(Mode::ReadWrite, &mut |tx| tx.put(key, value))
            .unwrap();
    }

    fn get(substrate: &MemorySubstrate, key: &[u8]) -> Option<Vec<u8>> {
        let mut out = None;
        substrate
            .transaction(Mode::ReadOnly, &mut |tx| {
                out = tx.get(key)?;
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn put_then_get() {
        let substrate = MemorySubstrate::new();
        put(&substrate, b"a/b/~item", b"payload");
        assert_eq!(get(&substrate, b"a/b/~item").as_deref(), Some(&b"payload"[..]));
        assert_eq!(get(&substrate, b"a/b/~meta"), None);
    }

    #[test]
    fn delete_is_idempotent() {
        let substrate = MemorySubstrate::new();
        put(&substrate, b"a", b"1");
        substrate
            .transaction(Mode::ReadWrite, &mut |tx| tx.delete(b"a"))
            .unwrap();
        substrate
            .transaction(Mode::ReadWrite, &mut |tx| tx.delete(b"a"))
            .unwrap();
        assert_eq!(get(&substrate, b"a"), None);
    }

    #[test]
    fn read_only_rejects_writes() {
        let substrate = MemorySubstrate::new();
        let err = substrate
            .transaction(Mode::ReadOnly, &mut |tx| tx.put(b"a", b"1"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn failed_transaction_discards_mutations() {
        let substrate = MemorySubstrate::new();
        put(&substrate, b"keep", b"old");

        let err = substrate.transaction(Mode::ReadWrite, &mut |tx| {
            tx.put(b"keep", b"new")?;
            tx.put(b"extra", b"x")?;
            Err(StoreError::Internal("boom".into()))
        });
        assert!(err.is_err());

        assert_eq!(get(&substrate, b"keep").as_deref(), Some(&b"old"[..]));
        assert_eq!(get(&substrate, b"extra"), None);
    }

    #[test]
    fn scan_prefix_is_ordered() {
        let substrate = MemorySubstrate::new();
        put(&substrate, b"col/3", b"c");
        put(&substrate, b"col/1", b"a");
        put(&substrate, b"col/2", b"b");
        put(&substrate, b"other/1", b"x");

        let mut keys = Vec::new();
        substrate
            .transaction(Mode::ReadOnly, &mut |tx| {
                keys = tx
                    .scan_prefix(b"col/")?
                    .into_iter()
                    .map(|(key, _)| key)
                    .collect();
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, vec![b"col/1".to_vec(), b"col/2".to_vec(), b"col/3".to_vec()]);
    }

    #[test]
    fn staged_mutations_visible_within_transaction() {
        let substrate = MemorySubstrate::new();
        put(&substrate, b"col/1", b"a");

        substrate
            .transaction(Mode::ReadWrite, &mut |tx| {
                tx.put(b"col/2", b"b")?;
                tx.delete(b"col/1")?;
                assert_eq!(tx.get(b"col/2")?.as_deref(), Some(&b"b"[..]));
                assert_eq!(tx.get(b"col/1")?, None);
                let scanned = tx.scan_prefix(b"col/")?;
                assert_eq!(scanned.len(), 1);
                assert_eq!(scanned[0].0, b"col/2".to_vec());
                Ok(())
            })
            .unwrap();
    }
}
