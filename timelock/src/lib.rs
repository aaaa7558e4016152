//! Timelock: the delay-enforcing execution gate.
//!
//! Privileged configuration changes are queued with an `eta` at least
//! `delay` seconds in the future and may only run inside
//! `[eta, eta + grace_period]`. A single admin (the governor, once the
//! handover completes) queues, cancels and executes.
//!
//! The governor talks to the timelock only through [`TimelockController`],
//! and the timelock talks to call targets only through [`CallRouter`], so
//! each side can be tested against a stand-in for the other.

pub mod call;
pub mod config;
pub mod error;
pub mod timelock;

pub use call::{decode_args, encode_args, CallError, CallRouter, TimelockCall};
pub use config::{TimelockConfig, GRACE_PERIOD, MAXIMUM_DELAY, MINIMUM_DELAY};
pub use error::TimelockError;
pub use timelock::{Timelock, TimelockController};
