//! Stakeable assets and raw amount helpers.
//!
//! Amounts are fixed-point integers (`u128`) counted in raw units; one whole
//! token is [`UNIT`] raw units (18 decimals).

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw units per whole token (10^18).
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// What a stake is denominated in.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The execution environment's native asset, attached to the call as value.
    Native,
    /// A registered external token, pulled from the caller via the ledger.
    Token(Address),
}

impl Asset {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Token(addr) => write!(f, "token:{addr}"),
        }
    }
}
