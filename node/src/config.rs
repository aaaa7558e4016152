//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dexf_farming::{FarmConfig, MultiplierTable};
use dexf_governance::GovernanceConfig;
use dexf_timelock::{TimelockConfig, MAXIMUM_DELAY, MINIMUM_DELAY};
use dexf_types::{Address, UNIT};
use dexf_utils::LogFormat;

use crate::NodeError;

/// Configuration for a DEXF node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where the simulator persists engine state between runs.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    #[serde(default)]
    pub farm: FarmConfig,

    #[serde(default)]
    pub governance: GovernanceConfig,

    #[serde(default)]
    pub timelock: TimelockConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub addresses: AddressBook,
}

/// Genesis parameters of the in-process token ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Tokens available for staking rewards.
    #[serde(default = "default_staking_pool")]
    pub staking_pool_tokens: u64,

    #[serde(default)]
    pub daily_release_treasury_tokens: u64,

    #[serde(default)]
    pub daily_release_staking_tokens: u64,
}

/// Well-known addresses of the deployed components.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    /// Initial owner of the farming engine and the token ledger, guardian of
    /// the governor and first timelock admin.
    #[serde(default = "default_deployer")]
    pub deployer: Address,

    #[serde(default = "default_farming")]
    pub farming: Address,

    #[serde(default = "default_governor")]
    pub governor: Address,

    #[serde(default = "default_timelock")]
    pub timelock: Address,

    #[serde(default = "default_token")]
    pub token: Address,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}

fn default_staking_pool() -> u64 {
    50_000_000
}

fn default_deployer() -> Address {
    Address::from_index(0xd0)
}

fn default_farming() -> Address {
    Address::from_index(0xfa)
}

fn default_governor() -> Address {
    Address::from_index(0x60)
}

fn default_timelock() -> Address {
    Address::from_index(0x71)
}

fn default_token() -> Address {
    Address::from_index(0xde)
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations the engines would refuse or misbehave under.
    pub fn validate(&self) -> Result<(), NodeError> {
        let epoch = self.farm.epoch_duration_secs;
        if epoch == 0 {
            return Err(NodeError::Config("farm.epoch_duration_secs must be non-zero".into()));
        }
        if let Some(table) = &self.farm.multipliers {
            MultiplierTable::new(table.clone())?;
        }
        if !TimelockConfig::delay_in_bounds(self.timelock.delay_secs) {
            return Err(NodeError::Config(format!(
                "timelock.delay_secs {} outside [{MINIMUM_DELAY}, {MAXIMUM_DELAY}]",
                self.timelock.delay_secs
            )));
        }
        if self.governance.voting_period_secs == 0 {
            return Err(NodeError::Config("governance.voting_period_secs must be non-zero".into()));
        }
        // The snapshot epoch must be over before anyone can vote with it.
        if self.governance.voting_delay_secs < epoch {
            return Err(NodeError::Config(format!(
                "governance.voting_delay_secs {} is shorter than one epoch ({epoch}s)",
                self.governance.voting_delay_secs
            )));
        }
        if self.governance.max_operations == 0 {
            return Err(NodeError::Config("governance.max_operations must be non-zero".into()));
        }
        let a = &self.addresses;
        let distinct: BTreeSet<&Address> =
            [&a.deployer, &a.farming, &a.governor, &a.timelock, &a.token].into_iter().collect();
        if distinct.len() != 5 {
            return Err(NodeError::Config("addresses must be distinct".into()));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            state_file: None,
            farm: FarmConfig::default(),
            governance: GovernanceConfig::default(),
            timelock: TimelockConfig::default(),
            ledger: LedgerConfig::default(),
            addresses: AddressBook::default(),
        }
    }
}

impl LedgerConfig {
    pub fn staking_pool(&self) -> u128 {
        u128::from(self.staking_pool_tokens) * UNIT
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            staking_pool_tokens: default_staking_pool(),
            daily_release_treasury_tokens: 0,
            daily_release_staking_tokens: 0,
        }
    }
}

impl Default for AddressBook {
    fn default() -> Self {
        Self {
            deployer: default_deployer(),
            farming: default_farming(),
            governor: default_governor(),
            timelock: default_timelock(),
            token: default_token(),
        }
    }
}
