//! Reward integration over historical stake shares.

use crate::checkpoint::CheckpointLedger;
use crate::error::FarmError;
use crate::stake::Stake;
use dexf_types::EpochId;
use primitive_types::U256;

/// Computes what a stake has earned from the emission and total-multiplier
/// histories.
///
/// For every epoch `e` in `[stake.last_claim_epoch, upto)`:
/// `emission(e) × stake.weighted_amount / total(e)`, floored per epoch and
/// zero when `total(e)` is zero.
///
/// Both histories are piecewise constant, so the sum is evaluated one run
/// of unchanged `(emission, total)` at a time: a run of `n` identical epochs
/// contributes exactly `n × floor(per-epoch share)`.
pub struct RewardDistributor<'a> {
    totals: &'a CheckpointLedger,
    emission: &'a CheckpointLedger,
}

impl<'a> RewardDistributor<'a> {
    pub fn new(totals: &'a CheckpointLedger, emission: &'a CheckpointLedger) -> Self {
        Self { totals, emission }
    }

    /// Reward share of a single epoch.
    pub fn epoch_reward(&self, stake: &Stake, epoch: EpochId) -> Result<u128, FarmError> {
        share(
            self.emission.query(epoch),
            stake.weighted_amount,
            self.totals.query(epoch),
        )
    }

    /// Unclaimed reward accrued up to (but excluding) epoch `upto`.
    ///
    /// Pure: calling it twice without a mutation in between yields the same
    /// amount. Closed stakes stop accruing at their end epoch.
    pub fn claimable(&self, stake: &Stake, upto: EpochId) -> Result<u128, FarmError> {
        let end = stake.accrual_end(upto);
        let mut epoch = stake.last_claim_epoch;
        let mut total: u128 = 0;
        while epoch < end {
            let next = [
                self.totals.next_change_after(epoch),
                self.emission.next_change_after(epoch),
            ]
            .into_iter()
            .flatten()
            .fold(end, EpochId::min);
            let per_epoch = self.epoch_reward(stake, epoch)?;
            let run = per_epoch
                .checked_mul(u128::from(next - epoch))
                .ok_or(FarmError::Overflow)?;
            total = total.checked_add(run).ok_or(FarmError::Overflow)?;
            epoch = next;
        }
        Ok(total)
    }
}

/// `emission × weight / total` with a 256-bit intermediate.
fn share(emission: u128, weight: u128, total: u128) -> Result<u128, FarmError> {
    if total == 0 || emission == 0 || weight == 0 {
        return Ok(0);
    }
    let scaled = U256::from(emission) * U256::from(weight) / U256::from(total);
    if scaled > U256::from(u128::MAX) {
        return Err(FarmError::Overflow);
    }
    Ok(scaled.low_u128())
}
