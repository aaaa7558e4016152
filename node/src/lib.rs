//! DEXF node: wires the protocol components together.
//!
//! The node owns one instance of each component and coordinates them:
//! - Farming engine (stakes, epoch checkpoints, rewards, voting power)
//! - Governor (proposals, snapshot voting, guardian)
//! - Timelock (delayed execution of governance actions)
//! - Token ledger (balances, custody, staking pool, release amounts)
//!
//! Calls executed by the timelock reach the farming engine and the token
//! ledger through [`Router`]. Every operation on [`Protocol`] is atomic.

pub mod config;
pub mod error;
pub mod protocol;
pub mod router;
pub mod script;
pub mod snapshot;
pub mod token;

pub use config::{AddressBook, LedgerConfig, NodeConfig};
pub use dexf_utils::{init_logging, LogFormat};
pub use error::NodeError;
pub use protocol::Protocol;
pub use router::{encode_json_args, Router};
pub use script::{run_script, Operation, ScriptAction, Step, StepOutcome};
pub use snapshot::SnapshotStore;
pub use token::TokenLedger;
