//! Stake positions.

use dexf_types::{Address, Asset, EpochId};
use serde::{Deserialize, Serialize};

/// Position of a stake in its owner's list. Stable for the life of the stake.
pub type StakeIndex = usize;

/// A fixed-term stake.
///
/// Owned by the farming engine and indexed by `(owner, index)`. Once closed,
/// only bookkeeping fields change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub owner: Address,
    pub asset: Asset,
    /// Principal in raw units.
    pub amount: u128,
    pub lock_weeks: u16,
    /// Scaled multiplier resolved when the stake was opened.
    pub multiplier: u16,
    /// `amount × multiplier`, this stake's contribution to the total.
    pub weighted_amount: u128,
    /// Voting power contributed under the engine's policy.
    pub voting_power: u128,
    pub start_epoch: EpochId,
    /// First epoch at which `unstake` is allowed.
    pub unlock_epoch: EpochId,
    /// Set exactly once when the stake is closed.
    pub end_epoch: Option<EpochId>,
    pub last_claim_epoch: EpochId,
    pub claimed_amount: u128,
}

impl Stake {
    pub fn is_open(&self) -> bool {
        self.end_epoch.is_none()
    }

    pub fn is_unlocked(&self, current: EpochId) -> bool {
        current >= self.unlock_epoch
    }

    /// Last epoch (exclusive) this stake can earn for, given `upto`.
    pub fn accrual_end(&self, upto: EpochId) -> EpochId {
        match self.end_epoch {
            Some(end) => end.min(upto),
            None => upto,
        }
    }
}
