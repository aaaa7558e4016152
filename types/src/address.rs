//! Account and contract address type (`0x` + 40 lowercase hex digits).

use crate::error::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 20-byte account or contract address, rendered as `0x` followed by 40 hex digits.
///
/// Stakers, proposers, voters, the farming engine, the governor, the timelock and
/// the token ledger are all identified by an `Address`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The standard prefix for all addresses.
    pub const PREFIX: &'static str = "0x";

    /// Number of hex digits following the prefix.
    pub const HEX_LEN: usize = 40;

    /// The all-zero address.
    pub fn zero() -> Self {
        Self::from_index(0)
    }

    /// Parse and normalise an address string.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let digits = raw
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| AddressError::MissingPrefix(raw.to_string()))?;
        if digits.len() != Self::HEX_LEN {
            return Err(AddressError::InvalidLength {
                address: raw.to_string(),
                len: digits.len(),
            });
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidHex(raw.to_string()));
        }
        Ok(Self(format!("{}{}", Self::PREFIX, digits.to_ascii_lowercase())))
    }

    /// Deterministic address derived from an integer, zero-padded on the left.
    ///
    /// Handy for well-known contract addresses and test accounts.
    pub fn from_index(n: u64) -> Self {
        Self(format!("{}{:0>40x}", Self::PREFIX, n))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0[Self::PREFIX.len()..].bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}
