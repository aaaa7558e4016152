use dexf_farming::FarmError;
use dexf_governance::GovernanceError;
use dexf_store::StoreError;
use dexf_timelock::{CallError, TimelockError};
use dexf_types::{AuthorityError, ErrorKind, LedgerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("farming error: {0}")]
    Farm(#[from] FarmError),

    #[error("governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("timelock error: {0}")]
    Timelock(#[from] TimelockError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("call error: {0}")]
    Call(#[from] CallError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Farm(e) => e.kind(),
            Self::Governance(e) => e.kind(),
            Self::Timelock(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Call(e) => e.kind(),
            Self::Authority(_) => ErrorKind::Authorization,
            Self::Config(_) => ErrorKind::Validation,
            Self::Store(_) | Self::Io(_) | Self::Snapshot(_) => ErrorKind::Internal,
        }
    }
}
