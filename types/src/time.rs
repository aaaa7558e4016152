//! Timestamps and epoch identifiers.
//!
//! Timestamps are Unix epoch seconds (UTC) as supplied by the execution
//! environment. The engine never reads the wall clock itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds in one day.
pub const DAY_SECS: u64 = 24 * 3600;

/// Seconds in one week.
pub const WEEK_SECS: u64 = 7 * DAY_SECS;

/// Integer epoch number, counted from the configured epoch-1 start.
pub type EpochId = u64;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    pub fn checked_add_secs(&self, secs: u64) -> Option<Self> {
        self.0.checked_add(secs).map(Self)
    }

    pub fn saturating_add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
