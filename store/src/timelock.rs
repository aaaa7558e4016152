//! Timelock storage trait.

use crate::{MetaStore, StoreError};
use dexf_types::TxHash;

/// Trait for storing the queued-transaction set.
pub trait TimelockStore: MetaStore {
    fn put_queued(&self, hash: &TxHash, data: &[u8]) -> Result<(), StoreError>;
    fn delete_queued(&self, hash: &TxHash) -> Result<(), StoreError>;
    fn iter_queued(&self) -> Result<Vec<(TxHash, Vec<u8>)>, StoreError>;
}
