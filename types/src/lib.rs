//! Fundamental types for the DEXF engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! addresses, assets, hashes, timestamps, the two-step `Authority` record, the
//! error taxonomy, and the `Ledger` trait through which the engine talks to the
//! external balance-holding token contract.

pub mod address;
pub mod asset;
pub mod authority;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod time;

pub use address::Address;
pub use asset::{Asset, UNIT};
pub use authority::{Authority, AuthorityError};
pub use error::{AddressError, ErrorKind};
pub use hash::TxHash;
pub use ledger::{Ledger, LedgerError};
pub use time::{EpochId, Timestamp, DAY_SECS, WEEK_SECS};
