//! Append-only, epoch-ordered snapshot store with as-of queries.
//!
//! Both the total multiplier-weighted stake and every account's voting power
//! are kept in a [`CheckpointLedger`]; so is the emission rate. Reward and
//! governance integrity both reduce to this structure being exact.

use crate::error::FarmError;
use dexf_types::EpochId;
use serde::{Deserialize, Serialize};

/// One recorded `(epoch, value)` snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointPoint {
    pub epoch: EpochId,
    pub value: u128,
}

/// Strictly epoch-increasing sequence of checkpoints.
///
/// A value is stable from its epoch until the next point, so queries are
/// forward-filled: before the first point the value is zero, at or after the
/// last point it is the last value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointLedger {
    points: Vec<CheckpointPoint>,
}

impl CheckpointLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[CheckpointPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_epoch(&self) -> Option<EpochId> {
        self.points.last().map(|p| p.epoch)
    }

    /// Latest recorded value (zero when empty).
    pub fn latest(&self) -> u128 {
        self.points.last().map(|p| p.value).unwrap_or(0)
    }

    /// Record `value` at `epoch`.
    ///
    /// Same epoch as the latest point overwrites it; a later epoch appends.
    /// An earlier epoch is a contract violation and is refused.
    pub fn record(&mut self, epoch: EpochId, value: u128) -> Result<(), FarmError> {
        match self.points.last_mut() {
            Some(last) if last.epoch == epoch => last.value = value,
            Some(last) if last.epoch > epoch => {
                return Err(FarmError::EpochRegression {
                    last: last.epoch,
                    attempted: epoch,
                })
            }
            _ => self.points.push(CheckpointPoint { epoch, value }),
        }
        Ok(())
    }

    /// Add `delta` to the latest value and record the result at `epoch`.
    pub fn increase(&mut self, epoch: EpochId, delta: u128) -> Result<u128, FarmError> {
        let value = self.latest().checked_add(delta).ok_or(FarmError::Overflow)?;
        self.record(epoch, value)?;
        Ok(value)
    }

    /// Subtract `delta` from the latest value and record the result at `epoch`.
    pub fn decrease(&mut self, epoch: EpochId, delta: u128) -> Result<u128, FarmError> {
        let value = self.latest().checked_sub(delta).ok_or(FarmError::Overflow)?;
        self.record(epoch, value)?;
        Ok(value)
    }

    /// Value as of `epoch`: the point with the greatest epoch `<= epoch`.
    pub fn query(&self, epoch: EpochId) -> u128 {
        match self.points.partition_point(|p| p.epoch <= epoch) {
            0 => 0,
            i => self.points[i - 1].value,
        }
    }

    /// Smallest stored epoch strictly greater than `epoch`, if any.
    ///
    /// The value returned by [`query`](Self::query) is constant on
    /// `[epoch, next_change_after(epoch))`.
    pub fn next_change_after(&self, epoch: EpochId) -> Option<EpochId> {
        let i = self.points.partition_point(|p| p.epoch <= epoch);
        self.points.get(i).map(|p| p.epoch)
    }
}
