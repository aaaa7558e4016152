//! Queued calls and the routing seam to their targets.

use dexf_types::{Address, ErrorKind, Timestamp, TxHash};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A call held by the timelock. Its hash is the queue key, so the same
/// call with a different `eta` is a different entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockCall {
    pub target: Address,
    pub value: u128,
    /// Function signature, e.g. `setEmissionPerEpoch(uint256)`.
    pub signature: String,
    /// bincode-encoded arguments.
    pub data: Vec<u8>,
    pub eta: Timestamp,
}

impl TimelockCall {
    pub fn new(
        target: Address,
        value: u128,
        signature: impl Into<String>,
        data: Vec<u8>,
        eta: Timestamp,
    ) -> Self {
        Self {
            target,
            value,
            signature: signature.into(),
            data,
            eta,
        }
    }

    /// Blake2b-256 of the bincode encoding.
    pub fn hash(&self) -> Result<TxHash, CallError> {
        TxHash::of(self).map_err(|e| CallError::InvalidCalldata(e.to_string()))
    }
}

/// Why a routed call failed.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("no contract at {0}")]
    UnknownTarget(Address),

    #[error("{target} has no function {signature}")]
    UnknownSignature { target: Address, signature: String },

    #[error("invalid calldata: {0}")]
    InvalidCalldata(String),

    #[error("call reverted: {0}")]
    Reverted(String),
}

impl CallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTarget(_) | Self::UnknownSignature { .. } | Self::InvalidCalldata(_) => {
                ErrorKind::Validation
            }
            Self::Reverted(_) => ErrorKind::External,
        }
    }
}

/// Dispatches a call to whatever lives at `target`.
///
/// `caller` is the address the target sees as the sender: the timelock's
/// own address for executed transactions.
pub trait CallRouter {
    fn call(
        &mut self,
        caller: &Address,
        target: &Address,
        value: u128,
        signature: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, CallError>;
}

pub fn encode_args<T: Serialize>(args: &T) -> Result<Vec<u8>, CallError> {
    bincode::serialize(args).map_err(|e| CallError::InvalidCalldata(e.to_string()))
}

pub fn decode_args<T: DeserializeOwned>(data: &[u8]) -> Result<T, CallError> {
    bincode::deserialize(data).map_err(|e| CallError::InvalidCalldata(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_depends_on_eta() {
        let a = TimelockCall::new(Address::from_index(1), 0, "f()", vec![], Timestamp::new(10));
        let mut b = a.clone();
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        b.eta = Timestamp::new(11);
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn test_args_decode_rejects_garbage() {
        let data = encode_args(&42u128).unwrap();
        assert_eq!(decode_args::<u128>(&data).unwrap(), 42);
        assert!(matches!(
            decode_args::<u128>(&[1, 2]),
            Err(CallError::InvalidCalldata(_))
        ));
    }
}
