//! Farming-specific errors.

use dexf_store::StoreError;
use dexf_types::{Address, AuthorityError, EpochId, ErrorKind, LedgerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FarmError {
    #[error("epoch clock is not initialized: epoch1 start has not been set")]
    NotInitialized,

    #[error("epoch1 start is already set")]
    AlreadyInitialized,

    #[error("epoch duration must be non-zero")]
    InvalidEpochDuration,

    #[error("invalid lock duration: {weeks} weeks (allowed {min}..={max})")]
    InvalidDuration { weeks: u16, min: u16, max: u16 },

    #[error("invalid multiplier table: {0}")]
    InvalidMultiplierTable(String),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("token {0} is not registered for staking")]
    UnregisteredToken(String),

    #[error("insufficient transfer: expected {expected}, received {received}")]
    InsufficientTransfer { expected: u128, received: u128 },

    #[error("stake {index} of {account} not found")]
    StakeNotFound { account: Address, index: usize },

    #[error("lock is not finished: current epoch {current}, unlocks at epoch {unlock}")]
    LockNotFinished { current: EpochId, unlock: EpochId },

    #[error("stake {index} of {account} is already unstaked")]
    AlreadyUnstaked { account: Address, index: usize },

    #[error("checkpoint epoch {attempted} precedes latest checkpoint epoch {last}")]
    EpochRegression { last: EpochId, attempted: EpochId },

    #[error("epoch {epoch} is in the future (current epoch {current})")]
    FutureEpoch { epoch: EpochId, current: EpochId },

    #[error("arithmetic overflow in farming computation")]
    Overflow,

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FarmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authority(_) => ErrorKind::Authorization,
            Self::InvalidEpochDuration
            | Self::InvalidDuration { .. }
            | Self::InvalidMultiplierTable(_)
            | Self::ZeroAmount
            | Self::UnregisteredToken(_)
            | Self::InsufficientTransfer { .. }
            | Self::StakeNotFound { .. }
            | Self::FutureEpoch { .. } => ErrorKind::Validation,
            Self::LockNotFinished { .. } => ErrorKind::TemporalPrecondition,
            Self::NotInitialized | Self::AlreadyInitialized | Self::AlreadyUnstaked { .. } => {
                ErrorKind::StateConflict
            }
            Self::Ledger(_) => ErrorKind::External,
            Self::EpochRegression { .. } | Self::Overflow | Self::Store(_) => ErrorKind::Internal,
        }
    }
}
