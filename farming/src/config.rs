//! Farming configuration.

use crate::stake::Stake;
use dexf_types::{DAY_SECS, UNIT};
use serde::{Deserialize, Serialize};

/// How a stake translates into governance voting power.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingPowerPolicy {
    /// One unit of principal is one vote.
    #[default]
    StakedAmount,
    /// `amount × multiplier` (scaled ×100), same weight as for rewards.
    MultiplierWeighted,
}

impl VotingPowerPolicy {
    pub fn power_of(&self, stake: &Stake) -> u128 {
        match self {
            Self::StakedAmount => stake.amount,
            Self::MultiplierWeighted => stake.weighted_amount,
        }
    }
}

/// Farming parameters. Every field has a default so an empty TOML table is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Length of one epoch in seconds. Immutable once the engine exists.
    #[serde(default = "default_epoch_duration")]
    pub epoch_duration_secs: u64,

    /// Epoch-1 start (Unix seconds). Usually left unset and configured later
    /// by the owner.
    #[serde(default)]
    pub epoch1_start: Option<u64>,

    /// Staking emission per epoch, in whole tokens.
    #[serde(default = "default_emission_tokens")]
    pub emission_per_epoch_tokens: u64,

    #[serde(default)]
    pub voting_power_policy: VotingPowerPolicy,

    /// Overrides the built-in multiplier table (entry 0 = 4-week lock).
    #[serde(default)]
    pub multipliers: Option<Vec<u16>>,
}

fn default_epoch_duration() -> u64 {
    DAY_SECS
}

fn default_emission_tokens() -> u64 {
    50_000
}

impl FarmConfig {
    /// Emission per epoch in raw units.
    pub fn emission_per_epoch(&self) -> u128 {
        u128::from(self.emission_per_epoch_tokens) * UNIT
    }
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            epoch_duration_secs: default_epoch_duration(),
            epoch1_start: None,
            emission_per_epoch_tokens: default_emission_tokens(),
            voting_power_policy: VotingPowerPolicy::default(),
            multipliers: None,
        }
    }
}
