//! The external balance-holding token contract, seen from the engine.
//!
//! Balance bookkeeping, transfer limits, blacklists and pool allocation all
//! live behind this trait. The engine only moves principal in and out of its
//! custody and pays rewards from the staking pool.

use crate::address::Address;
use crate::asset::Asset;
use crate::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient {asset} balance for {account}: need {needed}, available {available}")]
    InsufficientBalance {
        asset: Asset,
        account: Address,
        needed: u128,
        available: u128,
    },

    #[error("staking reward pool exhausted: need {needed}, remaining {remaining}")]
    RewardPoolExhausted { needed: u128, remaining: u128 },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::External
    }
}

/// Token movements the engine needs from the ledger.
///
/// Implementations must apply each call atomically: a failed call leaves
/// every balance untouched.
pub trait Ledger {
    /// Pull `amount` of `asset` from `from` into engine custody.
    ///
    /// Returns the number of units actually received, which may be lower
    /// than `amount` for tokens that charge a fee on transfer.
    fn transfer_in(&mut self, asset: &Asset, from: &Address, amount: u128)
        -> Result<u128, LedgerError>;

    /// Return `amount` of `asset` from engine custody to `to`.
    fn transfer_out(&mut self, asset: &Asset, to: &Address, amount: u128)
        -> Result<(), LedgerError>;

    /// Pay a staking reward out of the staking pool.
    fn release_reward(&mut self, to: &Address, amount: u128) -> Result<(), LedgerError>;
}
