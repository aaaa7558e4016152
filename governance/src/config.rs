//! Governor parameters.

use dexf_types::{DAY_SECS, UNIT};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Voting power (whole tokens) needed to propose.
    #[serde(default = "default_proposal_threshold")]
    pub proposal_threshold_tokens: u64,

    /// For-votes (whole tokens) a proposal needs to succeed.
    #[serde(default = "default_quorum_votes")]
    pub quorum_votes_tokens: u64,

    /// Seconds between proposing and voting opening.
    #[serde(default = "default_voting_delay")]
    pub voting_delay_secs: u64,

    #[serde(default = "default_voting_period")]
    pub voting_period_secs: u64,

    /// Maximum number of actions in one proposal.
    #[serde(default = "default_max_operations")]
    pub max_operations: usize,
}

fn default_proposal_threshold() -> u64 {
    100_000
}

fn default_quorum_votes() -> u64 {
    400_000
}

fn default_voting_delay() -> u64 {
    DAY_SECS
}

fn default_voting_period() -> u64 {
    3 * DAY_SECS
}

fn default_max_operations() -> usize {
    10
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            proposal_threshold_tokens: default_proposal_threshold(),
            quorum_votes_tokens: default_quorum_votes(),
            voting_delay_secs: default_voting_delay(),
            voting_period_secs: default_voting_period(),
            max_operations: default_max_operations(),
        }
    }
}

impl GovernanceConfig {
    /// Threshold in raw units.
    pub fn proposal_threshold(&self) -> u128 {
        u128::from(self.proposal_threshold_tokens) * UNIT
    }

    /// Quorum in raw units.
    pub fn quorum_votes(&self) -> u128 {
        u128::from(self.quorum_votes_tokens) * UNIT
    }
}
