//! Liquidity farming: the checkpointed epoch-accounting engine.
//!
//! Stakers lock principal for a whole number of weeks and earn a share of a
//! per-epoch emission proportional to `amount × multiplier`, where the
//! multiplier grows with the lock length.
//!
//! This crate handles:
//! - Mapping wall-clock time to epochs ([`EpochClock`])
//! - Resolving lock durations to multipliers ([`MultiplierTable`])
//! - Append-only, epoch-ordered history with as-of queries ([`CheckpointLedger`])
//! - Stake lifecycle: stake, claim, unstake, emergency withdraw ([`FarmingEngine`])
//! - Reward integration over historical shares ([`RewardDistributor`])
//! - Per-account voting power history consumed by governance

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod multiplier;
pub mod reward;
pub mod stake;

pub use checkpoint::{CheckpointLedger, CheckpointPoint};
pub use config::{FarmConfig, VotingPowerPolicy};
pub use engine::{FarmingEngine, UnstakeReceipt};
pub use epoch::EpochClock;
pub use error::FarmError;
pub use multiplier::{MultiplierTable, MIN_LOCK_WEEKS, MULTIPLIER_SCALE};
pub use reward::RewardDistributor;
pub use stake::{Stake, StakeIndex};
