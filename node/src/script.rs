//! Scripted scenarios: a time-ordered list of operations applied to a
//! [`Protocol`], as read from JSON by the `dexf simulate` command.

use dexf_farming::StakeIndex;
use dexf_governance::{ProposalAction, ProposalId};
use dexf_types::{Address, Asset, EpochId, Timestamp, UNIT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::protocol::Protocol;
use crate::router::encode_json_args;
use crate::NodeError;

/// One proposal action with JSON arguments, encoded on submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptAction {
    pub target: Address,
    pub signature: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Token amounts in scripts are whole tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Mint {
        to: Address,
        tokens: u64,
        #[serde(default)]
        token: Option<Address>,
    },
    SetEpoch1Start {
        start: u64,
    },
    RegisterToken {
        token: Address,
    },
    ManualEpochInit {
        epoch: EpochId,
    },
    TransferOwnership {
        target: Address,
        to: Address,
    },
    HandOverTimelock,
    Stake {
        account: Address,
        tokens: u64,
        weeks: u16,
        #[serde(default)]
        token: Option<Address>,
    },
    Claim {
        account: Address,
        index: StakeIndex,
    },
    Unstake {
        account: Address,
        index: StakeIndex,
    },
    EmergencyWithdraw {
        account: Address,
        index: StakeIndex,
    },
    Propose {
        proposer: Address,
        actions: Vec<ScriptAction>,
        #[serde(default)]
        description: String,
    },
    CastVote {
        voter: Address,
        proposal: ProposalId,
        support: bool,
    },
    Queue {
        proposal: ProposalId,
    },
    Execute {
        proposal: ProposalId,
    },
    Cancel {
        proposal: ProposalId,
    },
    State {
        proposal: ProposalId,
    },
    Balance {
        account: Address,
        #[serde(default)]
        token: Option<Address>,
    },
    Votes {
        account: Address,
    },
    Claimable {
        account: Address,
        index: StakeIndex,
    },
}

/// An operation and the Unix time it runs at. Owner-only operations and
/// `cancel` run as the configured deployer unless `caller` is given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub at: u64,
    #[serde(default)]
    pub caller: Option<Address>,
    #[serde(flatten)]
    pub op: Operation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub at: u64,
    pub op: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::SetEpoch1Start { .. } => "set_epoch1_start",
            Self::RegisterToken { .. } => "register_token",
            Self::ManualEpochInit { .. } => "manual_epoch_init",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::HandOverTimelock => "hand_over_timelock",
            Self::Stake { .. } => "stake",
            Self::Claim { .. } => "claim",
            Self::Unstake { .. } => "unstake",
            Self::EmergencyWithdraw { .. } => "emergency_withdraw",
            Self::Propose { .. } => "propose",
            Self::CastVote { .. } => "cast_vote",
            Self::Queue { .. } => "queue",
            Self::Execute { .. } => "execute",
            Self::Cancel { .. } => "cancel",
            Self::State { .. } => "state",
            Self::Balance { .. } => "balance",
            Self::Votes { .. } => "votes",
            Self::Claimable { .. } => "claimable",
        }
    }
}

fn asset_of(token: &Option<Address>) -> Asset {
    match token {
        Some(t) => Asset::Token(t.clone()),
        None => Asset::Native,
    }
}

/// Amounts leave as decimal strings so JSON consumers keep full precision.
fn amount(raw: u128) -> Value {
    Value::String(raw.to_string())
}

impl Protocol {
    /// Apply one scripted operation at `now`, with `caller` for owner-only
    /// operations.
    pub fn apply(
        &mut self,
        caller: &Address,
        op: &Operation,
        now: Timestamp,
    ) -> Result<Value, NodeError> {
        let value = match op {
            Operation::Mint { to, tokens, token } => {
                let raw = u128::from(*tokens) * UNIT;
                self.mint(caller, &asset_of(token), to, raw)?;
                amount(raw)
            }
            Operation::SetEpoch1Start { start } => {
                self.set_epoch1_start(caller, Timestamp::new(*start))?;
                Value::Null
            }
            Operation::RegisterToken { token } => {
                self.register_token(caller, token.clone())?;
                Value::Null
            }
            Operation::ManualEpochInit { epoch } => {
                self.manual_epoch_init(*epoch, now)?;
                Value::Null
            }
            Operation::TransferOwnership { target, to } => {
                self.transfer_ownership(caller, target, to.clone())?;
                Value::Null
            }
            Operation::HandOverTimelock => {
                self.hand_over_timelock(caller)?;
                Value::Null
            }
            Operation::Stake {
                account,
                tokens,
                weeks,
                token,
            } => {
                let raw = u128::from(*tokens) * UNIT;
                let index = match token {
                    Some(t) => self.stake_token(account, t, raw, *weeks, now)?,
                    None => self.stake(account, raw, *weeks, now)?,
                };
                json!({ "index": index })
            }
            Operation::Claim { account, index } => amount(self.claim(account, *index, now)?),
            Operation::Unstake { account, index } => {
                let receipt = self.unstake(account, *index, now)?;
                json!({
                    "principal": amount(receipt.principal),
                    "reward": amount(receipt.reward),
                })
            }
            Operation::EmergencyWithdraw { account, index } => {
                amount(self.emergency_withdraw(account, *index, now)?)
            }
            Operation::Propose {
                proposer,
                actions,
                description,
            } => {
                let actions = actions
                    .iter()
                    .map(|a| -> Result<ProposalAction, NodeError> {
                        let calldata = encode_json_args(&a.signature, &a.args)?;
                        Ok(ProposalAction::new(a.target.clone(), 0, a.signature.clone(), calldata))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let id = self.propose(proposer, actions, description.clone(), now)?;
                json!({ "proposal": id })
            }
            Operation::CastVote {
                voter,
                proposal,
                support,
            } => {
                let receipt = self.cast_vote(voter, *proposal, *support, now)?;
                json!({ "support": receipt.support, "votes": amount(receipt.votes) })
            }
            Operation::Queue { proposal } => {
                let eta = self.queue(*proposal, now)?;
                json!({ "eta": eta.as_secs() })
            }
            Operation::Execute { proposal } => {
                self.execute(*proposal, now)?;
                Value::Null
            }
            Operation::Cancel { proposal } => {
                self.cancel(caller, *proposal, now)?;
                Value::Null
            }
            Operation::State { proposal } => {
                let state = self.proposal_state(*proposal, now)?;
                json!(format!("{state:?}"))
            }
            Operation::Balance { account, token } => {
                amount(self.token().balance(&asset_of(token), account))
            }
            Operation::Votes { account } => amount(self.farming().current_votes(account)),
            Operation::Claimable { account, index } => {
                amount(self.farming().claimable(account, *index, now)?)
            }
        };
        Ok(value)
    }
}

/// Run `steps` in order. Steps must not go back in time. A failing step is
/// recorded in its outcome; with `fail_fast` it also stops the run.
pub fn run_script(
    protocol: &mut Protocol,
    deployer: &Address,
    steps: &[Step],
    fail_fast: bool,
) -> Result<Vec<StepOutcome>, NodeError> {
    let mut outcomes = Vec::with_capacity(steps.len());
    let mut last = 0;
    for (i, step) in steps.iter().enumerate() {
        if step.at < last {
            return Err(NodeError::Config(format!(
                "step {i} at {} is earlier than the previous step at {last}",
                step.at
            )));
        }
        last = step.at;
        let caller = step.caller.as_ref().unwrap_or(deployer);
        let op = step.op.name().to_string();
        match protocol.apply(caller, &step.op, Timestamp::new(step.at)) {
            Ok(result) => {
                info!(step = i, op = %op, at = step.at, "step applied");
                outcomes.push(StepOutcome {
                    at: step.at,
                    op,
                    result: Some(result),
                    error: None,
                });
            }
            Err(e) => {
                warn!(step = i, op = %op, at = step.at, error = %e, "step failed");
                outcomes.push(StepOutcome {
                    at: step.at,
                    op,
                    result: None,
                    error: Some(e.to_string()),
                });
                if fail_fast {
                    break;
                }
            }
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use dexf_types::DAY_SECS;

    const START: u64 = 1_700_000_000;

    fn parse(raw: &str) -> Vec<Step> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_step_parses_flattened_operation() {
        let steps = parse(
            r#"[
                {"at": 1, "op": "set_epoch1_start", "start": 1700000000},
                {"at": 2, "op": "stake", "account": "0x00000000000000000000000000000000000000a1", "tokens": 5, "weeks": 4},
                {"at": 3, "op": "hand_over_timelock"}
            ]"#,
        );
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].op, Operation::SetEpoch1Start { start: START });
        assert_eq!(steps[1].op.name(), "stake");
        assert!(steps[2].caller.is_none());
    }

    #[test]
    fn test_run_script_records_failures() {
        let config = NodeConfig::default();
        let deployer = config.addresses.deployer.clone();
        let mut protocol = Protocol::new(&config).unwrap();
        let alice = Address::from_index(0xa1);
        let steps = vec![
            Step {
                at: START - 10,
                caller: None,
                op: Operation::SetEpoch1Start { start: START },
            },
            Step {
                at: START,
                caller: None,
                op: Operation::Mint {
                    to: alice.clone(),
                    tokens: 10,
                    token: None,
                },
            },
            Step {
                at: START,
                caller: None,
                op: Operation::Stake {
                    account: alice.clone(),
                    tokens: 20,
                    weeks: 4,
                    token: None,
                },
            },
            Step {
                at: START + DAY_SECS,
                caller: None,
                op: Operation::Stake {
                    account: alice.clone(),
                    tokens: 10,
                    weeks: 4,
                    token: None,
                },
            },
        ];
        let outcomes = run_script(&mut protocol, &deployer, &steps, false).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[2].error.is_some());
        assert_eq!(outcomes[3].result, Some(json!({ "index": 0 })));

        let mut fresh = Protocol::new(&config).unwrap();
        let outcomes = run_script(&mut fresh, &deployer, &steps[..3], true).unwrap();
        assert_eq!(outcomes.len(), 3);
        let outcomes = run_script(&mut fresh, &deployer, &steps[2..], true).unwrap();
        assert_eq!(outcomes.len(), 1);
    }

    #[test]
    fn test_run_script_rejects_time_travel() {
        let config = NodeConfig::default();
        let mut protocol = Protocol::new(&config).unwrap();
        let steps = vec![
            Step {
                at: 10,
                caller: None,
                op: Operation::HandOverTimelock,
            },
            Step {
                at: 5,
                caller: None,
                op: Operation::Votes {
                    account: Address::from_index(1),
                },
            },
        ];
        let err = run_script(&mut protocol, &config.addresses.deployer, &steps, false).unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }
}
