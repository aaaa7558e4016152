use crate::call::CallError;
use dexf_store::StoreError;
use dexf_types::{Address, ErrorKind, Timestamp, TxHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimelockError {
    #[error("{caller} is not the timelock admin")]
    NotAdmin { caller: Address },

    #[error("{caller} is not the pending timelock admin")]
    NotPendingAdmin { caller: Address },

    #[error("call must come from the timelock itself, not {caller}")]
    NotSelf { caller: Address },

    #[error("delay {delay}s outside [{min}s, {max}s]")]
    InvalidDelay { delay: u64, min: u64, max: u64 },

    #[error("estimated execution {eta} must satisfy delay (earliest {earliest})")]
    EtaTooEarly { eta: Timestamp, earliest: Timestamp },

    #[error("transaction {0} is not queued")]
    NotQueued(TxHash),

    #[error("transaction hasn't surpassed time lock: eta {eta}, now {now}")]
    NotSurpassed { eta: Timestamp, now: Timestamp },

    #[error("transaction is stale: window closed at {deadline}, now {now}")]
    Stale { deadline: Timestamp, now: Timestamp },

    #[error("unknown timelock function {0}")]
    UnknownSelfCall(String),

    #[error("transaction execution reverted: {0}")]
    Call(#[from] CallError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TimelockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAdmin { .. } | Self::NotPendingAdmin { .. } | Self::NotSelf { .. } => {
                ErrorKind::Authorization
            }
            Self::InvalidDelay { .. } | Self::EtaTooEarly { .. } | Self::UnknownSelfCall(_) => {
                ErrorKind::Validation
            }
            Self::NotSurpassed { .. } | Self::Stale { .. } => ErrorKind::TemporalPrecondition,
            Self::NotQueued(_) => ErrorKind::StateConflict,
            Self::Call(e) => e.kind(),
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}
