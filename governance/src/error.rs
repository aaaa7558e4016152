use crate::proposal::{ProposalId, ProposalState};
use dexf_farming::FarmError;
use dexf_store::StoreError;
use dexf_timelock::{CallError, TimelockError};
use dexf_types::{Address, AuthorityError, ErrorKind, TxHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("proposer votes below proposal threshold: {votes} < {threshold}")]
    BelowThreshold { votes: u128, threshold: u128 },

    #[error("proposal must provide actions")]
    NoActions,

    #[error("too many actions: {count} > {max}")]
    TooManyActions { count: usize, max: usize },

    #[error("proposal function information arity mismatch")]
    ArityMismatch,

    #[error("proposer already has a live proposal {id} ({state:?})")]
    ProposerHasLiveProposal { id: ProposalId, state: ProposalState },

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("voting is closed on proposal {id} ({state:?})")]
    VotingClosed { id: ProposalId, state: ProposalState },

    #[error("voter {voter} already voted on proposal {id}")]
    AlreadyVoted { id: ProposalId, voter: Address },

    #[error("proposal {id} can only be queued if it is succeeded ({state:?})")]
    NotSucceeded { id: ProposalId, state: ProposalState },

    #[error("proposal {id} can only be executed if it is queued ({state:?})")]
    NotQueued { id: ProposalId, state: ProposalState },

    #[error("cannot cancel proposal {id} in state {state:?}")]
    ProposalFinalized { id: ProposalId, state: ProposalState },

    #[error("identical action {hash} already queued at eta")]
    DuplicateAction { hash: TxHash },

    #[error("{caller} may not cancel proposal {id}: proposer above threshold")]
    CancelNotAllowed { id: ProposalId, caller: Address },

    #[error("arithmetic overflow in vote tally")]
    Overflow,

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Timelock(#[from] TimelockError),

    #[error(transparent)]
    Calldata(#[from] CallError),

    #[error(transparent)]
    Farm(#[from] FarmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BelowThreshold { .. } => ErrorKind::Threshold,
            Self::NoActions
            | Self::TooManyActions { .. }
            | Self::ArityMismatch
            | Self::ProposalNotFound(_) => ErrorKind::Validation,
            Self::ProposerHasLiveProposal { .. }
            | Self::VotingClosed { .. }
            | Self::AlreadyVoted { .. }
            | Self::NotSucceeded { .. }
            | Self::NotQueued { .. }
            | Self::ProposalFinalized { .. }
            | Self::DuplicateAction { .. } => ErrorKind::StateConflict,
            Self::Authority(_) | Self::CancelNotAllowed { .. } => ErrorKind::Authorization,
            Self::Timelock(e) => e.kind(),
            Self::Calldata(e) => e.kind(),
            Self::Farm(e) => e.kind(),
            Self::Overflow | Self::Store(_) => ErrorKind::Internal,
        }
    }
}
