//! In-process token ledger.
//!
//! Stands in for the external balance-holding token contract: per-asset
//! balances, the engine's custody account, the staking reward pool and the
//! owner-tunable daily release amounts that governance proposals target.

use dexf_types::{Address, Asset, Authority, Ledger, LedgerError, UNIT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::LedgerConfig;
use crate::NodeError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    address: Address,
    /// Account holding staked principal (the farming engine).
    custody: Address,
    owner: Authority,
    balances: BTreeMap<(Asset, Address), u128>,
    staking_pool: u128,
    daily_release_treasury: u128,
    daily_release_staking: u128,
}

impl TokenLedger {
    pub fn new(address: Address, custody: Address, owner: Address, config: &LedgerConfig) -> Self {
        Self {
            address,
            custody,
            owner: Authority::new(owner),
            balances: BTreeMap::new(),
            staking_pool: config.staking_pool(),
            daily_release_treasury: u128::from(config.daily_release_treasury_tokens) * UNIT,
            daily_release_staking: u128::from(config.daily_release_staking_tokens) * UNIT,
        }
    }

    // ── Owner operations ────────────────────────────────────────────────

    /// Credit `amount` of `asset` to `to`. Owner only.
    pub fn mint(
        &mut self,
        caller: &Address,
        asset: &Asset,
        to: &Address,
        amount: u128,
    ) -> Result<(), NodeError> {
        self.owner.ensure_owner(caller)?;
        self.credit(asset, to, amount)?;
        info!(%asset, %to, amount, "minted");
        Ok(())
    }

    pub fn set_daily_release_amount_treasury(
        &mut self,
        caller: &Address,
        amount: u128,
    ) -> Result<(), NodeError> {
        self.owner.ensure_owner(caller)?;
        self.daily_release_treasury = amount;
        info!(amount, "daily treasury release updated");
        Ok(())
    }

    pub fn set_daily_release_amount_staking(
        &mut self,
        caller: &Address,
        amount: u128,
    ) -> Result<(), NodeError> {
        self.owner.ensure_owner(caller)?;
        self.daily_release_staking = amount;
        info!(amount, "daily staking release updated");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, next: Address) -> Result<(), NodeError> {
        self.owner.transfer(caller, next)?;
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> Result<(), NodeError> {
        self.owner.accept(caller)?;
        info!(owner = %caller, "token ownership accepted");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> Option<&Address> {
        self.owner.owner()
    }

    pub fn balance(&self, asset: &Asset, account: &Address) -> u128 {
        self.balances
            .get(&(asset.clone(), account.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn custody_balance(&self, asset: &Asset) -> u128 {
        self.balance(asset, &self.custody)
    }

    pub fn staking_pool(&self) -> u128 {
        self.staking_pool
    }

    pub fn daily_release_amount_treasury(&self) -> u128 {
        self.daily_release_treasury
    }

    pub fn daily_release_amount_staking(&self) -> u128 {
        self.daily_release_staking
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn credit(&mut self, asset: &Asset, to: &Address, amount: u128) -> Result<(), LedgerError> {
        let balance = self.balance(asset, to);
        let next = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Rejected(format!("{asset} balance of {to} overflows")))?;
        self.balances.insert((asset.clone(), to.clone()), next);
        Ok(())
    }

    fn debit(&mut self, asset: &Asset, from: &Address, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance(asset, from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset: asset.clone(),
                account: from.clone(),
                needed: amount,
                available,
            });
        }
        if available == amount {
            self.balances.remove(&(asset.clone(), from.clone()));
        } else {
            self.balances
                .insert((asset.clone(), from.clone()), available - amount);
        }
        Ok(())
    }
}

impl Ledger for TokenLedger {
    fn transfer_in(
        &mut self,
        asset: &Asset,
        from: &Address,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        self.debit(asset, from, amount)?;
        let custody = self.custody.clone();
        self.credit(asset, &custody, amount)?;
        debug!(%asset, %from, amount, "transferred into custody");
        Ok(amount)
    }

    fn transfer_out(
        &mut self,
        asset: &Asset,
        to: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let custody = self.custody.clone();
        self.debit(asset, &custody, amount)?;
        self.credit(asset, to, amount)?;
        debug!(%asset, %to, amount, "transferred out of custody");
        Ok(())
    }

    fn release_reward(&mut self, to: &Address, amount: u128) -> Result<(), LedgerError> {
        if amount > self.staking_pool {
            return Err(LedgerError::RewardPoolExhausted {
                needed: amount,
                remaining: self.staking_pool,
            });
        }
        self.credit(&Asset::Native, to, amount)?;
        self.staking_pool -= amount;
        debug!(%to, amount, remaining = self.staking_pool, "staking reward released");
        Ok(())
    }
}
