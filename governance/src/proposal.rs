//! Governance proposals and their lifecycle.

use crate::error::GovernanceError;
use dexf_timelock::TimelockCall;
use dexf_types::{Address, EpochId, Timestamp};
use serde::{Deserialize, Serialize};

/// Sequential proposal id, starting at 1.
pub type ProposalId = u64;

/// Lifecycle state, derived from the stored flags and the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created; voting has not opened yet.
    Pending,
    Active,
    Canceled,
    /// Voting closed without a for-majority that meets quorum.
    Defeated,
    Succeeded,
    /// Handed to the timelock, waiting for its eta.
    Queued,
    /// Queued but not executed within the timelock's grace window.
    Expired,
    Executed,
}

impl ProposalState {
    /// Still open to voting or queueing.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// No further transition is possible.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::Defeated | Self::Expired | Self::Executed
        )
    }
}

/// One call a proposal makes through the timelock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAction {
    pub target: Address,
    pub value: u128,
    pub signature: String,
    pub calldata: Vec<u8>,
}

impl ProposalAction {
    pub fn new(
        target: Address,
        value: u128,
        signature: impl Into<String>,
        calldata: Vec<u8>,
    ) -> Self {
        Self {
            target,
            value,
            signature: signature.into(),
            calldata,
        }
    }

    /// Build actions from parallel lists. All four must be the same length.
    pub fn zip(
        targets: Vec<Address>,
        values: Vec<u128>,
        signatures: Vec<String>,
        calldatas: Vec<Vec<u8>>,
    ) -> Result<Vec<Self>, GovernanceError> {
        let n = targets.len();
        if values.len() != n || signatures.len() != n || calldatas.len() != n {
            return Err(GovernanceError::ArityMismatch);
        }
        Ok(targets
            .into_iter()
            .zip(values)
            .zip(signatures)
            .zip(calldatas)
            .map(|(((target, value), signature), calldata)| Self {
                target,
                value,
                signature,
                calldata,
            })
            .collect())
    }

    /// The timelock transaction for this action at `eta`.
    pub fn to_call(&self, eta: Timestamp) -> TimelockCall {
        TimelockCall::new(
            self.target.clone(),
            self.value,
            self.signature.clone(),
            self.calldata.clone(),
            eta,
        )
    }
}

/// A governance proposal. Immutable after creation except for the tallies
/// and the lifecycle flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub actions: Vec<ProposalAction>,
    pub description: String,
    pub created_at: Timestamp,
    /// Vote weights are read from the voting-power history at this epoch.
    pub snapshot_epoch: EpochId,
    /// Voting opens at `start_time` and closes at `end_time` (exclusive).
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub for_votes: u128,
    pub against_votes: u128,
    pub eta: Option<Timestamp>,
    pub executed: bool,
    pub canceled: bool,
}

impl Proposal {
    /// Derive the lifecycle state at `now`.
    pub fn state(&self, now: Timestamp, quorum_votes: u128, grace_period: u64) -> ProposalState {
        if self.canceled {
            return ProposalState::Canceled;
        }
        if now < self.start_time {
            return ProposalState::Pending;
        }
        if now < self.end_time {
            return ProposalState::Active;
        }
        // For-votes must exceed both the against-votes and the quorum.
        if self.for_votes <= self.against_votes || self.for_votes <= quorum_votes {
            return ProposalState::Defeated;
        }
        let Some(eta) = self.eta else {
            return ProposalState::Succeeded;
        };
        if self.executed {
            ProposalState::Executed
        } else if now > eta.saturating_add_secs(grace_period) {
            ProposalState::Expired
        } else {
            ProposalState::Queued
        }
    }
}

/// A voter's recorded ballot. Its weight never changes after casting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub support: bool,
    pub votes: u128,
}
