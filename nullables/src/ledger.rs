//! Nullable ledger: an in-memory token ledger for testing the engine's
//! collaborator calls.

use dexf_types::{Address, Asset, Ledger, LedgerError};
use std::collections::HashMap;

/// An in-memory balance book implementing [`Ledger`].
///
/// Principal held by the engine is tracked under `custody`. Rewards are paid
/// from a finite staking pool into a separate per-account reward balance.
#[derive(Clone, Debug)]
pub struct NullLedger {
    custody: Address,
    balances: HashMap<(Asset, Address), u128>,
    rewards: HashMap<Address, u128>,
    reward_pool: u128,
    transfer_fee_bps: HashMap<Address, u32>,
    fail_next: Option<LedgerError>,
}

impl NullLedger {
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            balances: HashMap::new(),
            rewards: HashMap::new(),
            reward_pool: 0,
            transfer_fee_bps: HashMap::new(),
            fail_next: None,
        }
    }

    /// Credit `amount` of `asset` to `account` out of thin air.
    pub fn mint(&mut self, asset: &Asset, account: &Address, amount: u128) {
        *self
            .balances
            .entry((asset.clone(), account.clone()))
            .or_default() += amount;
    }

    pub fn balance(&self, asset: &Asset, account: &Address) -> u128 {
        self.balances
            .get(&(asset.clone(), account.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Principal currently held by the engine.
    pub fn custody_balance(&self, asset: &Asset) -> u128 {
        self.balance(asset, &self.custody)
    }

    pub fn fund_reward_pool(&mut self, amount: u128) {
        self.reward_pool += amount;
    }

    pub fn reward_pool(&self) -> u128 {
        self.reward_pool
    }

    /// Total rewards paid to `account` so far.
    pub fn rewards_of(&self, account: &Address) -> u128 {
        self.rewards.get(account).copied().unwrap_or(0)
    }

    /// Charge a fee (basis points) on every `transfer_in` of `token`.
    pub fn set_transfer_fee_bps(&mut self, token: &Address, bps: u32) {
        self.transfer_fee_bps.insert(token.clone(), bps);
    }

    /// Make the next ledger call fail with `err`.
    pub fn fail_next_call(&mut self, err: LedgerError) {
        self.fail_next = Some(err);
    }

    fn take_failure(&mut self) -> Result<(), LedgerError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn debit(&mut self, asset: &Asset, account: &Address, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance(asset, account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset: asset.clone(),
                account: account.clone(),
                needed: amount,
                available,
            });
        }
        self.balances
            .insert((asset.clone(), account.clone()), available - amount);
        Ok(())
    }
}

impl Ledger for NullLedger {
    fn transfer_in(
        &mut self,
        asset: &Asset,
        from: &Address,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        self.take_failure()?;
        self.debit(asset, from, amount)?;
        let fee = match asset {
            Asset::Token(token) => {
                let bps = self.transfer_fee_bps.get(token).copied().unwrap_or(0);
                amount * bps as u128 / 10_000
            }
            Asset::Native => 0,
        };
        let received = amount - fee;
        let custody = self.custody.clone();
        self.mint(asset, &custody, received);
        Ok(received)
    }

    fn transfer_out(
        &mut self,
        asset: &Asset,
        to: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.take_failure()?;
        let custody = self.custody.clone();
        self.debit(asset, &custody, amount)?;
        self.mint(asset, to, amount);
        Ok(())
    }

    fn release_reward(&mut self, to: &Address, amount: u128) -> Result<(), LedgerError> {
        self.take_failure()?;
        if self.reward_pool < amount {
            return Err(LedgerError::RewardPoolExhausted {
                needed: amount,
                remaining: self.reward_pool,
            });
        }
        self.reward_pool -= amount;
        *self.rewards.entry(to.clone()).or_default() += amount;
        Ok(())
    }
}
