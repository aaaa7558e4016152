//! Farming storage trait.

use crate::{MetaStore, StoreError};
use dexf_types::Address;

/// Persists per-account stake lists. Checkpoint ledgers and counters go
/// through the [`MetaStore`] supertrait.
pub trait FarmStore: MetaStore {
    fn get_stakes(&self, account: &Address) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_stakes(&self, account: &Address, stakes: &[u8]) -> Result<(), StoreError>;
    fn iter_stakes(&self) -> Result<Vec<(Address, Vec<u8>)>, StoreError>;
}
