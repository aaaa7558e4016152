//! File-backed store: every store trait over in-memory tables that are read
//! from and flushed to a single bincode file.

use dexf_store::{FarmStore, GovernanceStore, MetaStore, StoreError, TimelockStore};
use dexf_types::{Address, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::NodeError;

#[derive(Default, Serialize, Deserialize)]
struct Tables {
    meta: BTreeMap<String, Vec<u8>>,
    stakes: BTreeMap<Address, Vec<u8>>,
    proposals: BTreeMap<u64, Vec<u8>>,
    receipts: BTreeMap<(u64, Address), Vec<u8>>,
    queued: BTreeMap<TxHash, Vec<u8>>,
}

pub struct SnapshotStore {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl SnapshotStore {
    /// Open the snapshot at `path`. A missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let bytes = std::fs::read(&path)?;
            bincode::deserialize(&bytes).map_err(|e| NodeError::Snapshot(e.to_string()))?
        } else {
            Tables::default()
        };
        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> Result<bool, NodeError> {
        Ok(self.lock()?.meta.is_empty())
    }

    /// Write all tables to disk, replacing the previous snapshot atomically.
    pub fn flush(&self) -> Result<(), NodeError> {
        let bytes = bincode::serialize(&*self.lock()?)
            .map_err(|e| NodeError::Snapshot(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot flushed");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("snapshot mutex poisoned".into()))
    }
}

impl MetaStore for SnapshotStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.lock()?.meta.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.meta.get(key).cloned())
    }
}

impl FarmStore for SnapshotStore {
    fn get_stakes(&self, account: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.stakes.get(account).cloned())
    }

    fn put_stakes(&self, account: &Address, stakes: &[u8]) -> Result<(), StoreError> {
        self.lock()?.stakes.insert(account.clone(), stakes.to_vec());
        Ok(())
    }

    fn iter_stakes(&self) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()?
            .stakes
            .iter()
            .map(|(a, b)| (a.clone(), b.clone()))
            .collect())
    }
}

impl GovernanceStore for SnapshotStore {
    fn put_proposal(&self, id: u64, data: &[u8]) -> Result<(), StoreError> {
        self.lock()?.proposals.insert(id, data.to_vec());
        Ok(())
    }

    fn get_proposal(&self, id: u64) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.proposals.get(&id).cloned())
    }

    fn iter_proposals(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()?
            .proposals
            .iter()
            .map(|(id, b)| (*id, b.clone()))
            .collect())
    }

    fn put_receipt(&self, id: u64, voter: &Address, data: &[u8]) -> Result<(), StoreError> {
        self.lock()?
            .receipts
            .insert((id, voter.clone()), data.to_vec());
        Ok(())
    }

    fn get_receipts(&self, id: u64) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()?
            .receipts
            .range((id, Address::zero())..)
            .take_while(|((pid, _), _)| *pid == id)
            .map(|((_, voter), b)| (voter.clone(), b.clone()))
            .collect())
    }
}

impl TimelockStore for SnapshotStore {
    fn put_queued(&self, hash: &TxHash, data: &[u8]) -> Result<(), StoreError> {
        self.lock()?.queued.insert(*hash, data.to_vec());
        Ok(())
    }

    fn delete_queued(&self, hash: &TxHash) -> Result<(), StoreError> {
        self.lock()?.queued.remove(hash);
        Ok(())
    }

    fn iter_queued(&self) -> Result<Vec<(TxHash, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()?
            .queued
            .iter()
            .map(|(h, b)| (*h, b.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("state.bin")).unwrap();
        assert!(store.is_empty().unwrap());
        assert!(store.iter_stakes().unwrap().is_empty());
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let alice = Address::from_index(1);
        let hash = TxHash::new([7; 32]);
        {
            let store = SnapshotStore::open(&path).unwrap();
            store.put_meta("k", b"v").unwrap();
            store.put_stakes(&alice, b"stakes").unwrap();
            store.put_receipt(3, &alice, b"r").unwrap();
            store.put_receipt(4, &alice, b"other").unwrap();
            store.put_queued(&hash, b"q").unwrap();
            store.flush().unwrap();
        }
        let store = SnapshotStore::open(&path).unwrap();
        assert_eq!(store.get_meta("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get_stakes(&alice).unwrap(), Some(b"stakes".to_vec()));
        assert_eq!(store.get_receipts(3).unwrap(), vec![(alice, b"r".to_vec())]);
        assert_eq!(store.iter_queued().unwrap().len(), 1);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        std::fs::write(&path, b"\xff\xff\xff").unwrap();
        assert!(matches!(
            SnapshotStore::open(&path),
            Err(NodeError::Snapshot(_))
        ));
    }
}
