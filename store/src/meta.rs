//! Metadata storage trait.

use crate::StoreError;

/// Generic key-value store for engine bookkeeping that doesn't belong in any
/// keyed table: checkpoint ledgers, counters, configuration snapshots.
pub trait MetaStore {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value, `None` if absent.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}
