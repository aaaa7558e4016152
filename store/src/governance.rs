//! Governance storage trait.

use crate::{MetaStore, StoreError};
use dexf_types::Address;

/// Trait for storing governance state (proposals and vote receipts).
pub trait GovernanceStore: MetaStore {
    /// Store a proposal.
    fn put_proposal(&self, id: u64, data: &[u8]) -> Result<(), StoreError>;

    /// Get a proposal by id.
    fn get_proposal(&self, id: u64) -> Result<Option<Vec<u8>>, StoreError>;

    /// All stored proposals, in id order.
    fn iter_proposals(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError>;

    /// Store a voter's receipt on a proposal.
    fn put_receipt(&self, id: u64, voter: &Address, data: &[u8]) -> Result<(), StoreError>;

    /// All receipts recorded for a proposal.
    fn get_receipts(&self, id: u64) -> Result<Vec<(Address, Vec<u8>)>, StoreError>;
}
