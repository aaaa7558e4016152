//! Governance for the DEXF engine.
//!
//! Stakers propose batches of calls, vote with the voting power they held at
//! the epoch the proposal was created, and successful proposals run through
//! the timelock.
//!
//! Lifecycle: Pending → Active → {Defeated, Succeeded} → Queued → Executed,
//! with Canceled reachable from any live state and Expired reachable from
//! Queued once the timelock grace window closes. State is derived from the
//! clock at query time; only votes and the queued/executed/canceled flags are
//! stored.

pub mod config;
pub mod error;
pub mod governor;
pub mod power;
pub mod proposal;

pub use config::GovernanceConfig;
pub use error::GovernanceError;
pub use governor::GovernorEngine;
pub use power::VotingPower;
pub use proposal::{Proposal, ProposalAction, ProposalId, ProposalState, Receipt};
