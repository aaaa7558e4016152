//! Dispatch of timelock-executed calls to the farming engine and the token
//! ledger.
//!
//! Call data is the bincode encoding of the argument tuple, with `uint256`
//! carried as `u128`, `uint256[]` as `Vec<u128>` and `address` as
//! [`Address`]. [`encode_json_args`] builds it from JSON for scripts.

use dexf_farming::FarmingEngine;
use dexf_timelock::{decode_args, encode_args, CallError, CallRouter};
use dexf_types::{Address, Timestamp};
use serde_json::Value;
use tracing::debug;

use crate::token::TokenLedger;

pub const SET_MULTIPLIERS: &str = "setMultipliers(uint256[])";
pub const SET_EMISSION_PER_EPOCH: &str = "setEmissionPerEpoch(uint256)";
pub const REGISTER_TOKEN: &str = "registerToken(address)";
pub const UNREGISTER_TOKEN: &str = "unregisterToken(address)";
pub const TRANSFER_OWNERSHIP: &str = "transferOwnership(address)";
pub const ACCEPT_OWNERSHIP: &str = "acceptOwnership()";
pub const SET_DAILY_RELEASE_TREASURY: &str = "setDailyReleaseAmountTreasury(uint256)";
pub const SET_DAILY_RELEASE_STAKING: &str = "setDailyReleaseAmountStaking(uint256)";

/// Routes calls by target address. Borrowed for the duration of one
/// execution so the governor and timelock can be borrowed alongside it.
pub struct Router<'a> {
    pub farming: &'a mut FarmingEngine,
    pub token: &'a mut TokenLedger,
    pub now: Timestamp,
}

impl<'a> Router<'a> {
    pub fn new(farming: &'a mut FarmingEngine, token: &'a mut TokenLedger, now: Timestamp) -> Self {
        Self { farming, token, now }
    }

    fn call_farming(
        &mut self,
        caller: &Address,
        signature: &str,
        data: &[u8],
    ) -> Result<(), CallError> {
        let result = match signature {
            SET_MULTIPLIERS => {
                let raw: Vec<u128> = decode_args(data)?;
                let table = raw
                    .into_iter()
                    .map(|m| {
                        u16::try_from(m).map_err(|_| {
                            CallError::InvalidCalldata(format!("multiplier {m} out of range"))
                        })
                    })
                    .collect::<Result<Vec<u16>, _>>()?;
                self.farming.set_multipliers(caller, table)
            }
            SET_EMISSION_PER_EPOCH => {
                self.farming
                    .set_emission_per_epoch(caller, decode_args(data)?, self.now)
            }
            REGISTER_TOKEN => self.farming.register_token(caller, decode_args(data)?),
            UNREGISTER_TOKEN => {
                let token: Address = decode_args(data)?;
                self.farming.unregister_token(caller, &token)
            }
            TRANSFER_OWNERSHIP => self.farming.transfer_ownership(caller, decode_args(data)?),
            ACCEPT_OWNERSHIP => self.farming.accept_ownership(caller),
            other => {
                return Err(CallError::UnknownSignature {
                    target: self.farming.address().clone(),
                    signature: other.to_string(),
                })
            }
        };
        result.map_err(|e| CallError::Reverted(e.to_string()))
    }

    fn call_token(
        &mut self,
        caller: &Address,
        signature: &str,
        data: &[u8],
    ) -> Result<(), CallError> {
        let result = match signature {
            SET_DAILY_RELEASE_TREASURY => self
                .token
                .set_daily_release_amount_treasury(caller, decode_args(data)?),
            SET_DAILY_RELEASE_STAKING => self
                .token
                .set_daily_release_amount_staking(caller, decode_args(data)?),
            TRANSFER_OWNERSHIP => self.token.transfer_ownership(caller, decode_args(data)?),
            ACCEPT_OWNERSHIP => self.token.accept_ownership(caller),
            other => {
                return Err(CallError::UnknownSignature {
                    target: self.token.address().clone(),
                    signature: other.to_string(),
                })
            }
        };
        result.map_err(|e| CallError::Reverted(e.to_string()))
    }
}

impl CallRouter for Router<'_> {
    fn call(
        &mut self,
        caller: &Address,
        target: &Address,
        value: u128,
        signature: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, CallError> {
        if value != 0 {
            return Err(CallError::Reverted(format!("{signature} is not payable")));
        }
        debug!(%caller, %target, signature, "routing call");
        if target == self.farming.address() {
            self.call_farming(caller, signature, data)?;
        } else if target == self.token.address() {
            self.call_token(caller, signature, data)?;
        } else {
            return Err(CallError::UnknownTarget(target.clone()));
        }
        Ok(Vec::new())
    }
}

/// Encode JSON arguments as call data for `signature`.
pub fn encode_json_args(signature: &str, args: &[Value]) -> Result<Vec<u8>, CallError> {
    let params = param_types(signature)?;
    if params.len() != args.len() {
        return Err(CallError::InvalidCalldata(format!(
            "{signature} takes {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }
    let mut data = Vec::new();
    for (param, arg) in params.iter().zip(args) {
        let encoded = match *param {
            "uint256" => encode_args(&json_uint(arg)?)?,
            "uint256[]" => {
                let items = arg
                    .as_array()
                    .ok_or_else(|| CallError::InvalidCalldata(format!("expected array, got {arg}")))?;
                let values = items.iter().map(json_uint).collect::<Result<Vec<u128>, _>>()?;
                encode_args(&values)?
            }
            "address" => {
                let raw = arg
                    .as_str()
                    .ok_or_else(|| CallError::InvalidCalldata(format!("expected address, got {arg}")))?;
                let address =
                    Address::parse(raw).map_err(|e| CallError::InvalidCalldata(e.to_string()))?;
                encode_args(&address)?
            }
            "bool" => {
                let flag = arg
                    .as_bool()
                    .ok_or_else(|| CallError::InvalidCalldata(format!("expected bool, got {arg}")))?;
                encode_args(&flag)?
            }
            other => {
                return Err(CallError::InvalidCalldata(format!(
                    "unsupported parameter type {other}"
                )))
            }
        };
        data.extend(encoded);
    }
    Ok(data)
}

fn param_types(signature: &str) -> Result<Vec<&str>, CallError> {
    let inner = signature
        .split_once('(')
        .and_then(|(_, rest)| rest.strip_suffix(')'))
        .ok_or_else(|| CallError::InvalidCalldata(format!("malformed signature {signature}")))?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(',').map(str::trim).collect())
}

/// Integers may be given as JSON numbers or as decimal strings (for values
/// beyond 2^53).
fn json_uint(value: &Value) -> Result<u128, CallError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| CallError::InvalidCalldata(format!("expected unsigned integer, got {n}"))),
        Value::String(s) => s
            .parse::<u128>()
            .map_err(|e| CallError::InvalidCalldata(format!("{s}: {e}"))),
        other => Err(CallError::InvalidCalldata(format!(
            "expected unsigned integer, got {other}"
        ))),
    }
}
