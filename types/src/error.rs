//! Error taxonomy shared across crates.

use thiserror::Error;

/// Coarse classification of every failure the engine can report.
///
/// Each crate's error enum maps its variants onto one of these via `kind()`,
/// so callers can react to a class of failure without matching on every
/// domain-specific variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller lacks the required role.
    Authorization,
    /// Bad duration, bad parameters.
    Validation,
    /// Lock not finished, timelock not surpassed, stale transaction.
    TemporalPrecondition,
    /// Already unstaked, already voted, proposal not in the required state.
    StateConflict,
    /// Voting power below proposal threshold, quorum not met.
    Threshold,
    /// A collaborator (ledger, call target) refused the interaction.
    External,
    /// Arithmetic overflow, storage or encoding failure.
    Internal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address {0} must start with 0x")]
    MissingPrefix(String),

    #[error("address {address} has {len} hex digits, expected 40")]
    InvalidLength { address: String, len: usize },

    #[error("address {0} contains non-hex characters")]
    InvalidHex(String),
}
