//! Wall-clock time → epoch id.

use crate::error::FarmError;
use dexf_types::{EpochId, Timestamp, WEEK_SECS};
use serde::{Deserialize, Serialize};

/// Maps timestamps to integer epochs.
///
/// `epoch_of(t) = max(0, floor((t − epoch1_start) / epoch_duration))`.
/// The duration is fixed at construction. The start is set exactly once by
/// the owner; until then every epoch-dependent operation fails with
/// [`FarmError::NotInitialized`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochClock {
    epoch1_start: Option<Timestamp>,
    epoch_duration: u64,
}

impl EpochClock {
    pub fn new(epoch_duration: u64) -> Result<Self, FarmError> {
        if epoch_duration == 0 {
            return Err(FarmError::InvalidEpochDuration);
        }
        Ok(Self {
            epoch1_start: None,
            epoch_duration,
        })
    }

    /// One-time configuration of the epoch-1 start.
    pub fn initialize(&mut self, start: Timestamp) -> Result<(), FarmError> {
        if self.epoch1_start.is_some() {
            return Err(FarmError::AlreadyInitialized);
        }
        self.epoch1_start = Some(start);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.epoch1_start.is_some()
    }

    pub fn epoch1_start(&self) -> Option<Timestamp> {
        self.epoch1_start
    }

    pub fn epoch_duration(&self) -> u64 {
        self.epoch_duration
    }

    pub fn epoch_of(&self, ts: Timestamp) -> Result<EpochId, FarmError> {
        let start = self.epoch1_start.ok_or(FarmError::NotInitialized)?;
        Ok(start.elapsed_since(ts) / self.epoch_duration)
    }

    /// First second of `epoch`.
    pub fn epoch_start(&self, epoch: EpochId) -> Result<Timestamp, FarmError> {
        let start = self.epoch1_start.ok_or(FarmError::NotInitialized)?;
        epoch
            .checked_mul(self.epoch_duration)
            .and_then(|offset| start.checked_add_secs(offset))
            .ok_or(FarmError::Overflow)
    }

    /// Number of epochs that cover one week, rounded up.
    pub fn epochs_per_week(&self) -> u64 {
        WEEK_SECS.div_ceil(self.epoch_duration).max(1)
    }

    /// Number of epochs a lock of `weeks` weeks lasts.
    pub fn lock_epochs(&self, weeks: u16) -> u64 {
        u64::from(weeks) * self.epochs_per_week()
    }
}
