//! Timelock delay bounds and configuration.

use dexf_types::DAY_SECS;
use serde::{Deserialize, Serialize};

/// How long after `eta` a queued transaction stays executable. Fixed for
/// every deployment; only the delay is configurable.
pub const GRACE_PERIOD: u64 = 14 * DAY_SECS;
pub const MINIMUM_DELAY: u64 = 2 * DAY_SECS;
pub const MAXIMUM_DELAY: u64 = 30 * DAY_SECS;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockConfig {
    /// Minimum seconds between queueing and `eta`.
    #[serde(default = "default_delay")]
    pub delay_secs: u64,
}

fn default_delay() -> u64 {
    3 * DAY_SECS
}

impl Default for TimelockConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay(),
        }
    }
}

impl TimelockConfig {
    pub fn delay_in_bounds(delay: u64) -> bool {
        (MINIMUM_DELAY..=MAXIMUM_DELAY).contains(&delay)
    }
}
