//! Nullable store: thread-safe in-memory storage for testing.

use dexf_store::{FarmStore, GovernanceStore, MetaStore, StoreError, TimelockStore};
use dexf_types::{Address, TxHash};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// An in-memory implementation of every store trait.
#[derive(Default)]
pub struct NullStore {
    meta: Mutex<BTreeMap<String, Vec<u8>>>,
    stakes: Mutex<BTreeMap<Address, Vec<u8>>>,
    proposals: Mutex<BTreeMap<u64, Vec<u8>>>,
    receipts: Mutex<BTreeMap<(u64, Address), Vec<u8>>>,
    queued: Mutex<BTreeMap<TxHash, Vec<u8>>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of metadata entries (used by tests to check what got persisted).
    pub fn meta_len(&self) -> usize {
        self.meta.lock().map(|m| m.len()).unwrap_or(0)
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    m.lock()
        .map_err(|_| StoreError::Backend("null store mutex poisoned".into()))
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        lock(&self.meta)?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(lock(&self.meta)?.get(key).cloned())
    }
}

impl FarmStore for NullStore {
    fn get_stakes(&self, account: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(lock(&self.stakes)?.get(account).cloned())
    }

    fn put_stakes(&self, account: &Address, stakes: &[u8]) -> Result<(), StoreError> {
        lock(&self.stakes)?.insert(account.clone(), stakes.to_vec());
        Ok(())
    }

    fn iter_stakes(&self) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        Ok(lock(&self.stakes)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl GovernanceStore for NullStore {
    fn put_proposal(&self, id: u64, data: &[u8]) -> Result<(), StoreError> {
        lock(&self.proposals)?.insert(id, data.to_vec());
        Ok(())
    }

    fn get_proposal(&self, id: u64) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(lock(&self.proposals)?.get(&id).cloned())
    }

    fn iter_proposals(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        Ok(lock(&self.proposals)?
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    fn put_receipt(&self, id: u64, voter: &Address, data: &[u8]) -> Result<(), StoreError> {
        lock(&self.receipts)?.insert((id, voter.clone()), data.to_vec());
        Ok(())
    }

    fn get_receipts(&self, id: u64) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        Ok(lock(&self.receipts)?
            .iter()
            .filter(|((pid, _), _)| *pid == id)
            .map(|((_, voter), data)| (voter.clone(), data.clone()))
            .collect())
    }
}

impl TimelockStore for NullStore {
    fn put_queued(&self, hash: &TxHash, data: &[u8]) -> Result<(), StoreError> {
        lock(&self.queued)?.insert(*hash, data.to_vec());
        Ok(())
    }

    fn delete_queued(&self, hash: &TxHash) -> Result<(), StoreError> {
        lock(&self.queued)?.remove(hash);
        Ok(())
    }

    fn iter_queued(&self) -> Result<Vec<(TxHash, Vec<u8>)>, StoreError> {
        Ok(lock(&self.queued)?
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }
}
