//! Source of historical voting power.

use crate::error::GovernanceError;
use dexf_farming::FarmingEngine;
use dexf_types::{Address, EpochId, Timestamp};

/// Read-only view of per-account voting power over time.
pub trait VotingPower {
    fn current_epoch(&self, now: Timestamp) -> Result<EpochId, GovernanceError>;

    /// First second of `epoch`. Power recorded for an epoch is final from
    /// the start of the next one.
    fn epoch_start(&self, epoch: EpochId) -> Result<Timestamp, GovernanceError>;

    /// Voting power of `account` as of `epoch`.
    fn prior_votes(&self, account: &Address, epoch: EpochId) -> u128;
}

impl VotingPower for FarmingEngine {
    fn current_epoch(&self, now: Timestamp) -> Result<EpochId, GovernanceError> {
        Ok(FarmingEngine::current_epoch(self, now)?)
    }

    fn epoch_start(&self, epoch: EpochId) -> Result<Timestamp, GovernanceError> {
        Ok(self.clock().epoch_start(epoch)?)
    }

    fn prior_votes(&self, account: &Address, epoch: EpochId) -> u128 {
        FarmingEngine::prior_votes(self, account, epoch)
    }
}
