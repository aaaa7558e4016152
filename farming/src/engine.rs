//! Core farming engine: the stake registry.
//!
//! Every mutation follows checks → effects → interactions: the stake is
//! closed and the checkpoint ledgers are updated before any principal or
//! reward leaves custody through the [`Ledger`].

use crate::checkpoint::CheckpointLedger;
use crate::config::{FarmConfig, VotingPowerPolicy};
use crate::epoch::EpochClock;
use crate::error::FarmError;
use crate::multiplier::MultiplierTable;
use crate::reward::RewardDistributor;
use crate::stake::{Stake, StakeIndex};
use dexf_store::{decode, decode_required, encode, FarmStore};
use dexf_types::{Address, Asset, Authority, EpochId, Ledger, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

const SETTINGS_KEY: &str = "farm/settings";
const TOTAL_MULTIPLIER_KEY: &str = "farm/total_multiplier";
const EMISSION_KEY: &str = "farm/emission";
const VOTING_POWER_KEY: &str = "farm/voting_power";

/// What an unstake paid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeReceipt {
    pub principal: u128,
    pub reward: u128,
}

/// Engine-wide settings persisted as a single meta record.
#[derive(Serialize, Deserialize)]
struct FarmSettings {
    address: Address,
    authority: Authority,
    clock: EpochClock,
    multipliers: MultiplierTable,
    policy: VotingPowerPolicy,
    registered_tokens: BTreeSet<Address>,
}

/// The farming engine. Owns every stake and the checkpoint ledgers derived
/// from them.
///
/// Invariant: for every epoch `e`, `total_multiplier.query(e)` equals the sum
/// of `weighted_amount` over stakes open during `e`, and each account's
/// voting-power ledger equals the sum of its open stakes' `voting_power`.
#[derive(Clone, Debug)]
pub struct FarmingEngine {
    address: Address,
    authority: Authority,
    clock: EpochClock,
    multipliers: MultiplierTable,
    policy: VotingPowerPolicy,
    registered_tokens: BTreeSet<Address>,
    stakes: BTreeMap<Address, Vec<Stake>>,
    total_multiplier: CheckpointLedger,
    voting_power: BTreeMap<Address, CheckpointLedger>,
    emission: CheckpointLedger,
}

impl FarmingEngine {
    /// Create an engine at `address` owned by `owner`.
    pub fn new(address: Address, owner: Address, config: &FarmConfig) -> Result<Self, FarmError> {
        let mut clock = EpochClock::new(config.epoch_duration_secs)?;
        if let Some(start) = config.epoch1_start {
            clock.initialize(Timestamp::new(start))?;
        }
        let multipliers = match &config.multipliers {
            Some(table) => MultiplierTable::new(table.clone())?,
            None => MultiplierTable::default(),
        };
        let mut emission = CheckpointLedger::new();
        emission.record(0, config.emission_per_epoch())?;

        Ok(Self {
            address,
            authority: Authority::new(owner),
            clock,
            multipliers,
            policy: config.voting_power_policy,
            registered_tokens: BTreeSet::new(),
            stakes: BTreeMap::new(),
            total_multiplier: CheckpointLedger::new(),
            voting_power: BTreeMap::new(),
            emission,
        })
    }

    // ── Owner operations ────────────────────────────────────────────────

    /// One-time configuration of the epoch-1 start.
    pub fn set_epoch1_start(&mut self, caller: &Address, start: Timestamp) -> Result<(), FarmError> {
        self.authority.ensure_owner(caller)?;
        self.clock.initialize(start)?;
        info!(start = start.as_secs(), "epoch1 start configured");
        Ok(())
    }

    /// Replace the multiplier table. Open stakes keep the multiplier they
    /// were created with.
    pub fn set_multipliers(&mut self, caller: &Address, table: Vec<u16>) -> Result<(), FarmError> {
        self.authority.ensure_owner(caller)?;
        self.multipliers = MultiplierTable::new(table)?;
        info!(
            max_weeks = self.multipliers.max_weeks(),
            "multiplier table replaced"
        );
        Ok(())
    }

    /// Change the per-epoch emission from the current epoch onwards.
    pub fn set_emission_per_epoch(
        &mut self,
        caller: &Address,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), FarmError> {
        self.authority.ensure_owner(caller)?;
        let epoch = match self.clock.epoch_of(now) {
            Ok(epoch) => epoch,
            Err(FarmError::NotInitialized) => 0,
            Err(e) => return Err(e),
        };
        self.emission.record(epoch, amount)?;
        info!(epoch, amount, "emission per epoch changed");
        Ok(())
    }

    pub fn register_token(&mut self, caller: &Address, token: Address) -> Result<(), FarmError> {
        self.authority.ensure_owner(caller)?;
        info!(%token, "token registered for staking");
        self.registered_tokens.insert(token);
        Ok(())
    }

    /// Stop accepting new stakes of `token`. Existing stakes are unaffected.
    pub fn unregister_token(&mut self, caller: &Address, token: &Address) -> Result<(), FarmError> {
        self.authority.ensure_owner(caller)?;
        self.registered_tokens.remove(token);
        info!(%token, "token unregistered");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, next: Address) -> Result<(), FarmError> {
        self.authority.transfer(caller, next)?;
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> Result<(), FarmError> {
        self.authority.accept(caller)?;
        info!(owner = %caller, "farming ownership accepted");
        Ok(())
    }

    /// Materialise the forward-filled total at `epoch` as a stored point.
    ///
    /// No-op when a point at or after `epoch` already exists.
    pub fn manual_epoch_init(&mut self, epoch: EpochId, now: Timestamp) -> Result<(), FarmError> {
        let current = self.clock.epoch_of(now)?;
        if epoch > current {
            return Err(FarmError::FutureEpoch { epoch, current });
        }
        if self.total_multiplier.last_epoch().is_some_and(|last| last >= epoch) {
            return Ok(());
        }
        let value = self.total_multiplier.latest();
        self.total_multiplier.record(epoch, value)?;
        debug!(epoch, value, "epoch checkpoint initialised");
        Ok(())
    }

    // ── Staking ─────────────────────────────────────────────────────────

    /// Stake the native asset for `weeks` weeks.
    pub fn stake(
        &mut self,
        account: &Address,
        amount: u128,
        weeks: u16,
        now: Timestamp,
        ledger: &mut dyn Ledger,
    ) -> Result<StakeIndex, FarmError> {
        self.open_stake(account, Asset::Native, amount, weeks, now, ledger)
    }

    /// Stake a registered external token for `weeks` weeks.
    pub fn stake_token(
        &mut self,
        account: &Address,
        token: &Address,
        amount: u128,
        weeks: u16,
        now: Timestamp,
        ledger: &mut dyn Ledger,
    ) -> Result<StakeIndex, FarmError> {
        if !self.registered_tokens.contains(token) {
            return Err(FarmError::UnregisteredToken(token.to_string()));
        }
        self.open_stake(account, Asset::Token(token.clone()), amount, weeks, now, ledger)
    }

    fn open_stake(
        &mut self,
        account: &Address,
        asset: Asset,
        amount: u128,
        weeks: u16,
        now: Timestamp,
        ledger: &mut dyn Ledger,
    ) -> Result<StakeIndex, FarmError> {
        if amount == 0 {
            return Err(FarmError::ZeroAmount);
        }
        let multiplier = self.multipliers.get(weeks)?;
        let epoch = self.clock.epoch_of(now)?;
        self.ensure_writable(account, epoch)?;
        let weighted_amount = amount
            .checked_mul(u128::from(multiplier))
            .ok_or(FarmError::Overflow)?;
        self.total_multiplier
            .latest()
            .checked_add(weighted_amount)
            .ok_or(FarmError::Overflow)?;

        let received = ledger.transfer_in(&asset, account, amount)?;
        if received < amount {
            ledger.transfer_out(&asset, account, received)?;
            return Err(FarmError::InsufficientTransfer {
                expected: amount,
                received,
            });
        }

        let mut stake = Stake {
            owner: account.clone(),
            asset,
            amount,
            lock_weeks: weeks,
            multiplier,
            weighted_amount,
            voting_power: 0,
            start_epoch: epoch,
            unlock_epoch: epoch.saturating_add(self.clock.lock_epochs(weeks)),
            end_epoch: None,
            last_claim_epoch: epoch,
            claimed_amount: 0,
        };
        stake.voting_power = self.policy.power_of(&stake);

        let total = self.total_multiplier.increase(epoch, weighted_amount)?;
        self.voting_power
            .entry(account.clone())
            .or_default()
            .increase(epoch, stake.voting_power)?;

        let list = self.stakes.entry(account.clone()).or_default();
        list.push(stake);
        let index = list.len() - 1;
        info!(
            %account,
            index,
            epoch,
            amount,
            weeks,
            multiplier,
            total_multiplier = total,
            "stake opened"
        );
        Ok(index)
    }

    /// Pay out the reward accrued by an open stake up to the current epoch.
    pub fn claim(
        &mut self,
        account: &Address,
        index: StakeIndex,
        now: Timestamp,
        ledger: &mut dyn Ledger,
    ) -> Result<u128, FarmError> {
        let current = self.clock.epoch_of(now)?;
        let stake = self.require_open(account, index)?;
        let reward = self.distributor().claimable(stake, current)?;
        let claimed = stake
            .claimed_amount
            .checked_add(reward)
            .ok_or(FarmError::Overflow)?;

        let stake = self.stake_mut(account, index)?;
        stake.last_claim_epoch = stake.last_claim_epoch.max(current);
        stake.claimed_amount = claimed;

        if reward > 0 {
            ledger.release_reward(account, reward)?;
        }
        debug!(%account, index, epoch = current, reward, "reward claimed");
        Ok(reward)
    }

    /// Close a stake whose lock has finished, returning principal plus the
    /// full reward accrued up to the current epoch.
    pub fn unstake(
        &mut self,
        account: &Address,
        index: StakeIndex,
        now: Timestamp,
        ledger: &mut dyn Ledger,
    ) -> Result<UnstakeReceipt, FarmError> {
        let current = self.clock.epoch_of(now)?;
        let stake = self.require_open(account, index)?;
        if !stake.is_unlocked(current) {
            return Err(FarmError::LockNotFinished {
                current,
                unlock: stake.unlock_epoch,
            });
        }
        let reward = self.distributor().claimable(stake, current)?;
        let claimed = stake
            .claimed_amount
            .checked_add(reward)
            .ok_or(FarmError::Overflow)?;
        let asset = stake.asset.clone();
        let principal = stake.amount;
        self.ensure_writable(account, current)?;

        self.close(account, index, current, claimed)?;

        ledger.transfer_out(&asset, account, principal)?;
        if reward > 0 {
            ledger.release_reward(account, reward)?;
        }
        info!(%account, index, epoch = current, principal, reward, "stake unstaked");
        Ok(UnstakeReceipt { principal, reward })
    }

    /// Close a stake immediately, lock or not. Returns principal only; any
    /// unclaimed reward is forfeited.
    pub fn emergency_withdraw(
        &mut self,
        account: &Address,
        index: StakeIndex,
        now: Timestamp,
        ledger: &mut dyn Ledger,
    ) -> Result<u128, FarmError> {
        let current = self.clock.epoch_of(now)?;
        let stake = self.require_open(account, index)?;
        let asset = stake.asset.clone();
        let principal = stake.amount;
        let claimed = stake.claimed_amount;
        self.ensure_writable(account, current)?;

        self.close(account, index, current, claimed)?;

        ledger.transfer_out(&asset, account, principal)?;
        info!(%account, index, epoch = current, principal, "stake emergency-withdrawn");
        Ok(principal)
    }

    /// Effects shared by unstake and emergency withdraw.
    fn close(
        &mut self,
        account: &Address,
        index: StakeIndex,
        epoch: EpochId,
        claimed: u128,
    ) -> Result<(), FarmError> {
        let stake = self.stake_mut(account, index)?;
        stake.end_epoch = Some(epoch);
        stake.last_claim_epoch = stake.last_claim_epoch.max(epoch);
        stake.claimed_amount = claimed;
        let weighted = stake.weighted_amount;
        let power = stake.voting_power;

        self.total_multiplier.decrease(epoch, weighted)?;
        self.voting_power
            .entry(account.clone())
            .or_default()
            .decrease(epoch, power)?;
        Ok(())
    }

    fn distributor(&self) -> RewardDistributor<'_> {
        RewardDistributor::new(&self.total_multiplier, &self.emission)
    }

    fn require_open(&self, account: &Address, index: StakeIndex) -> Result<&Stake, FarmError> {
        let stake = self
            .get_stake(account, index)
            .ok_or_else(|| FarmError::StakeNotFound {
                account: account.clone(),
                index,
            })?;
        if !stake.is_open() {
            return Err(FarmError::AlreadyUnstaked {
                account: account.clone(),
                index,
            });
        }
        Ok(stake)
    }

    fn stake_mut(&mut self, account: &Address, index: StakeIndex) -> Result<&mut Stake, FarmError> {
        self.stakes
            .get_mut(account)
            .and_then(|list| list.get_mut(index))
            .ok_or_else(|| FarmError::StakeNotFound {
                account: account.clone(),
                index,
            })
    }

    /// Refuse to write at an epoch older than what the ledgers already hold,
    /// before any funds move.
    fn ensure_writable(&self, account: &Address, epoch: EpochId) -> Result<(), FarmError> {
        let account_last = self.voting_power.get(account).and_then(|l| l.last_epoch());
        for last in [self.total_multiplier.last_epoch(), account_last]
            .into_iter()
            .flatten()
        {
            if last > epoch {
                return Err(FarmError::EpochRegression {
                    last,
                    attempted: epoch,
                });
            }
        }
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Reward an account could claim on stake `index` right now.
    pub fn claimable(
        &self,
        account: &Address,
        index: StakeIndex,
        now: Timestamp,
    ) -> Result<u128, FarmError> {
        let current = self.clock.epoch_of(now)?;
        let stake = self
            .get_stake(account, index)
            .ok_or_else(|| FarmError::StakeNotFound {
                account: account.clone(),
                index,
            })?;
        self.distributor().claimable(stake, current)
    }

    pub fn get_stake(&self, account: &Address, index: StakeIndex) -> Option<&Stake> {
        self.stakes.get(account).and_then(|list| list.get(index))
    }

    /// An account's stakes in creation order. The iterator is cheap to clone,
    /// so callers can restart it.
    pub fn get_stakes(&self, account: &Address) -> std::slice::Iter<'_, Stake> {
        self.stakes
            .get(account)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
    }

    /// Accounts with at least one stake.
    pub fn stakers(&self) -> impl Iterator<Item = &Address> + '_ {
        self.stakes.keys()
    }

    pub fn current_epoch(&self, now: Timestamp) -> Result<EpochId, FarmError> {
        self.clock.epoch_of(now)
    }

    /// Total multiplier-weighted stake as of `epoch`.
    pub fn total_multiplier_at(&self, epoch: EpochId) -> u128 {
        self.total_multiplier.query(epoch)
    }

    /// Total multiplier-weighted stake as of the epoch containing `ts`.
    pub fn prior_total_multiplier(&self, ts: Timestamp) -> Result<u128, FarmError> {
        Ok(self.total_multiplier.query(self.clock.epoch_of(ts)?))
    }

    pub fn current_total_multiplier(&self) -> u128 {
        self.total_multiplier.latest()
    }

    /// Voting power of `account` as of `epoch`.
    pub fn prior_votes(&self, account: &Address, epoch: EpochId) -> u128 {
        self.voting_power
            .get(account)
            .map(|l| l.query(epoch))
            .unwrap_or(0)
    }

    pub fn current_votes(&self, account: &Address) -> u128 {
        self.voting_power
            .get(account)
            .map(CheckpointLedger::latest)
            .unwrap_or(0)
    }

    pub fn emission_at(&self, epoch: EpochId) -> u128 {
        self.emission.query(epoch)
    }

    pub fn total_multiplier_ledger(&self) -> &CheckpointLedger {
        &self.total_multiplier
    }

    pub fn voting_power_ledger(&self, account: &Address) -> Option<&CheckpointLedger> {
        self.voting_power.get(account)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> Option<&Address> {
        self.authority.owner()
    }

    pub fn clock(&self) -> &EpochClock {
        &self.clock
    }

    pub fn multipliers(&self) -> &MultiplierTable {
        &self.multipliers
    }

    pub fn policy(&self) -> VotingPowerPolicy {
        self.policy
    }

    pub fn is_registered(&self, token: &Address) -> bool {
        self.registered_tokens.contains(token)
    }
}

impl FarmingEngine {
    /// Persist all engine state to a farm store.
    pub fn save_to_store(&self, store: &dyn FarmStore) -> Result<(), FarmError> {
        let settings = FarmSettings {
            address: self.address.clone(),
            authority: self.authority.clone(),
            clock: self.clock.clone(),
            multipliers: self.multipliers.clone(),
            policy: self.policy,
            registered_tokens: self.registered_tokens.clone(),
        };
        put(store, SETTINGS_KEY, &settings)?;
        put(store, TOTAL_MULTIPLIER_KEY, &self.total_multiplier)?;
        put(store, EMISSION_KEY, &self.emission)?;
        put(store, VOTING_POWER_KEY, &self.voting_power)?;

        for (account, stakes) in &self.stakes {
            store.put_stakes(account, &encode(stakes)?)?;
        }
        Ok(())
    }

    /// Restore engine state from a farm store.
    pub fn load_from_store(store: &dyn FarmStore) -> Result<Self, FarmError> {
        let settings: FarmSettings =
            decode_required(SETTINGS_KEY, store.get_meta(SETTINGS_KEY)?)?;
        let total_multiplier = get(store, TOTAL_MULTIPLIER_KEY)?.unwrap_or_default();
        let emission = get(store, EMISSION_KEY)?.unwrap_or_default();
        let voting_power = get(store, VOTING_POWER_KEY)?.unwrap_or_default();

        let mut stakes = BTreeMap::new();
        for (account, bytes) in store.iter_stakes()? {
            let list: Vec<Stake> = decode(account.as_str(), &bytes)?;
            stakes.insert(account, list);
        }

        Ok(Self {
            address: settings.address,
            authority: settings.authority,
            clock: settings.clock,
            multipliers: settings.multipliers,
            policy: settings.policy,
            registered_tokens: settings.registered_tokens,
            stakes,
            total_multiplier,
            voting_power,
            emission,
        })
    }
}

fn put<T: Serialize>(store: &dyn FarmStore, key: &str, value: &T) -> Result<(), FarmError> {
    Ok(store.put_meta(key, &encode(value)?)?)
}

fn get<T: DeserializeOwned>(store: &dyn FarmStore, key: &str) -> Result<Option<T>, FarmError> {
    match store.get_meta(key)? {
        Some(bytes) => Ok(Some(decode(key, &bytes)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexf_nullables::{NullLedger, NullStore};
    use dexf_store::StoreError;
    use dexf_types::{LedgerError, DAY_SECS, UNIT, WEEK_SECS};

    const START: u64 = 1_700_000_000;
    const EMISSION: u128 = 1_000;

    fn owner() -> Address {
        Address::from_index(0xd0)
    }

    fn alice() -> Address {
        Address::from_index(1)
    }

    fn bob() -> Address {
        Address::from_index(2)
    }

    fn engine_address() -> Address {
        Address::from_index(0xfa)
    }

    /// Timestamp in the middle of `epoch` for weekly epochs.
    fn at(epoch: EpochId) -> Timestamp {
        Timestamp::new(START + epoch * WEEK_SECS + 60)
    }

    fn weekly_engine() -> FarmingEngine {
        let config = FarmConfig {
            epoch_duration_secs: WEEK_SECS,
            epoch1_start: Some(START),
            emission_per_epoch_tokens: 0,
            ..FarmConfig::default()
        };
        let mut engine = FarmingEngine::new(engine_address(), owner(), &config).unwrap();
        engine
            .set_emission_per_epoch(&owner(), EMISSION, at(0))
            .unwrap();
        engine
    }

    fn funded_ledger() -> NullLedger {
        let mut ledger = NullLedger::new(engine_address());
        for who in [alice(), bob()] {
            ledger.mint(&Asset::Native, &who, 1_000 * UNIT);
        }
        ledger.fund_reward_pool(u128::MAX / 2);
        ledger
    }

    #[test]
    fn test_stake_records_position_and_checkpoint() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();

        let idx = engine.stake(&alice(), UNIT, 4, at(0), &mut ledger).unwrap();
        assert_eq!(idx, 0);

        let stake = engine.get_stake(&alice(), 0).unwrap();
        assert_eq!(stake.amount, UNIT);
        assert_eq!(stake.multiplier, 100);
        assert_eq!(stake.start_epoch, 0);
        assert_eq!(stake.unlock_epoch, 4);
        assert!(stake.is_open());
        assert_eq!(engine.total_multiplier_at(0), UNIT * 100);
        assert_eq!(ledger.custody_balance(&Asset::Native), UNIT);
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        let err = engine.stake(&alice(), UNIT, 3, at(0), &mut ledger).unwrap_err();
        assert!(matches!(err, FarmError::InvalidDuration { weeks: 3, .. }));
        // Nothing left custody.
        assert_eq!(ledger.custody_balance(&Asset::Native), 0);
    }

    #[test]
    fn test_stake_before_epoch_start_configured_fails() {
        let mut engine =
            FarmingEngine::new(engine_address(), owner(), &FarmConfig::default()).unwrap();
        let mut ledger = funded_ledger();
        assert!(matches!(
            engine.stake(&alice(), UNIT, 4, Timestamp::new(START), &mut ledger),
            Err(FarmError::NotInitialized)
        ));

        engine
            .set_epoch1_start(&owner(), Timestamp::new(START))
            .unwrap();
        assert!(engine
            .stake(&alice(), UNIT, 4, Timestamp::new(START), &mut ledger)
            .is_ok());
    }

    #[test]
    fn test_four_week_stake_unstakes_at_epoch_four() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), UNIT, 4, at(0), &mut ledger).unwrap();

        for epoch in 0..4 {
            assert!(matches!(
                engine.unstake(&alice(), 0, at(epoch), &mut ledger),
                Err(FarmError::LockNotFinished { unlock: 4, .. })
            ));
        }

        let receipt = engine.unstake(&alice(), 0, at(4), &mut ledger).unwrap();
        assert_eq!(receipt.principal, UNIT);
        // Sole staker: the whole emission of epochs 0..=3.
        assert_eq!(receipt.reward, 4 * EMISSION);

        let stake = engine.get_stake(&alice(), 0).unwrap();
        assert_eq!(stake.end_epoch, Some(4));
        assert_eq!(stake.last_claim_epoch, 4);
        assert_eq!(stake.claimed_amount, 4 * EMISSION);
        assert_eq!(ledger.balance(&Asset::Native, &alice()), 1_000 * UNIT);
        assert_eq!(ledger.rewards_of(&alice()), 4 * EMISSION);
        assert_eq!(engine.total_multiplier_at(4), 0);
        assert_eq!(engine.total_multiplier_at(3), UNIT * 100);
    }

    #[test]
    fn test_closed_stake_cannot_be_closed_again() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), UNIT, 4, at(0), &mut ledger).unwrap();
        engine.stake(&alice(), UNIT, 5, at(0), &mut ledger).unwrap();

        engine.unstake(&alice(), 0, at(4), &mut ledger).unwrap();
        engine.emergency_withdraw(&alice(), 1, at(4), &mut ledger).unwrap();

        for idx in [0, 1] {
            assert!(matches!(
                engine.unstake(&alice(), idx, at(9), &mut ledger),
                Err(FarmError::AlreadyUnstaked { .. })
            ));
            assert!(matches!(
                engine.emergency_withdraw(&alice(), idx, at(9), &mut ledger),
                Err(FarmError::AlreadyUnstaked { .. })
            ));
            assert!(matches!(
                engine.claim(&alice(), idx, at(9), &mut ledger),
                Err(FarmError::AlreadyUnstaked { .. })
            ));
        }
    }

    #[test]
    fn test_two_stakers_split_by_weight() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.set_multipliers(&owner(), vec![100, 150]).unwrap();

        engine.stake(&alice(), 1_000, 4, at(0), &mut ledger).unwrap();
        engine.stake(&bob(), 1_000, 5, at(0), &mut ledger).unwrap();
        assert_eq!(engine.total_multiplier_at(0), 100_000 + 150_000);

        // Per epoch: alice 1000 × 100k / 250k = 400, bob 600.
        assert_eq!(engine.claimable(&alice(), 0, at(3)).unwrap(), 3 * 400);
        assert_eq!(engine.claimable(&bob(), 0, at(3)).unwrap(), 3 * 600);

        let a = engine.unstake(&alice(), 0, at(4), &mut ledger).unwrap();
        assert_eq!(a.reward, 4 * 400);
        // Bob is alone from epoch 4.
        let b = engine.unstake(&bob(), 0, at(5), &mut ledger).unwrap();
        assert_eq!(b.reward, 4 * 600 + EMISSION);
    }

    #[test]
    fn test_claim_advances_and_claimable_is_idempotent() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), UNIT, 10, at(0), &mut ledger).unwrap();

        let first = engine.claimable(&alice(), 0, at(2)).unwrap();
        let second = engine.claimable(&alice(), 0, at(2)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, 2 * EMISSION);

        assert_eq!(engine.claim(&alice(), 0, at(2), &mut ledger).unwrap(), first);
        assert_eq!(engine.get_stake(&alice(), 0).unwrap().last_claim_epoch, 2);
        assert_eq!(engine.claimable(&alice(), 0, at(2)).unwrap(), 0);
        assert_eq!(engine.claim(&alice(), 0, at(2), &mut ledger).unwrap(), 0);

        assert_eq!(engine.claimable(&alice(), 0, at(3)).unwrap(), EMISSION);
        assert_eq!(ledger.rewards_of(&alice()), 2 * EMISSION);
    }

    #[test]
    fn test_emergency_withdraw_forfeits_reward() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), UNIT, 8, at(0), &mut ledger).unwrap();

        let principal = engine.emergency_withdraw(&alice(), 0, at(3), &mut ledger).unwrap();
        assert_eq!(principal, UNIT);
        assert_eq!(ledger.rewards_of(&alice()), 0);
        assert_eq!(engine.claimable(&alice(), 0, at(5)).unwrap(), 0);

        let stake = engine.get_stake(&alice(), 0).unwrap();
        assert_eq!(stake.end_epoch, Some(3));
        assert_eq!(engine.total_multiplier_at(3), 0);
        assert_eq!(engine.current_votes(&alice()), 0);
    }

    #[test]
    fn test_emergency_withdraw_in_epoch_zero_closes() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), UNIT, 4, at(0), &mut ledger).unwrap();
        engine.emergency_withdraw(&alice(), 0, at(0), &mut ledger).unwrap();
        assert!(!engine.get_stake(&alice(), 0).unwrap().is_open());
        assert!(matches!(
            engine.emergency_withdraw(&alice(), 0, at(0), &mut ledger),
            Err(FarmError::AlreadyUnstaked { .. })
        ));
    }

    #[test]
    fn test_token_stake_requires_registration() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        let token = Address::from_index(0x70);
        ledger.mint(&Asset::Token(token.clone()), &bob(), 100);

        assert!(matches!(
            engine.stake_token(&bob(), &token, 100, 4, at(0), &mut ledger),
            Err(FarmError::UnregisteredToken(_))
        ));
        assert!(engine.register_token(&bob(), token.clone()).is_err());
        engine.register_token(&owner(), token.clone()).unwrap();

        let idx = engine
            .stake_token(&bob(), &token, 100, 4, at(0), &mut ledger)
            .unwrap();
        let stake = engine.get_stake(&bob(), idx).unwrap();
        assert_eq!(stake.asset, Asset::Token(token.clone()));

        engine.unstake(&bob(), idx, at(4), &mut ledger).unwrap();
        assert_eq!(ledger.balance(&Asset::Token(token), &bob()), 100);
    }

    #[test]
    fn test_short_transfer_is_refunded_and_rejected() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        let token = Address::from_index(0x71);
        let asset = Asset::Token(token.clone());
        ledger.mint(&asset, &bob(), 10_000);
        ledger.set_transfer_fee_bps(&token, 100);
        engine.register_token(&owner(), token.clone()).unwrap();

        let err = engine
            .stake_token(&bob(), &token, 10_000, 4, at(0), &mut ledger)
            .unwrap_err();
        assert!(matches!(
            err,
            FarmError::InsufficientTransfer {
                expected: 10_000,
                received: 9_900
            }
        ));
        assert_eq!(ledger.custody_balance(&asset), 0);
        assert_eq!(engine.get_stakes(&bob()).count(), 0);
        assert_eq!(engine.current_total_multiplier(), 0);
    }

    #[test]
    fn test_total_multiplier_matches_open_stakes() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), 10, 4, at(0), &mut ledger).unwrap();
        engine.stake(&bob(), 20, 5, at(1), &mut ledger).unwrap();
        engine.stake(&alice(), 30, 6, at(1), &mut ledger).unwrap();
        engine.emergency_withdraw(&bob(), 0, at(2), &mut ledger).unwrap();
        engine.unstake(&alice(), 0, at(4), &mut ledger).unwrap();

        for epoch in 0..8 {
            let expected: u128 = [alice(), bob()]
                .iter()
                .flat_map(|a| engine.get_stakes(a))
                .filter(|s| s.start_epoch <= epoch && s.end_epoch.map_or(true, |e| epoch < e))
                .map(|s| s.weighted_amount)
                .sum();
            assert_eq!(engine.total_multiplier_at(epoch), expected, "epoch {epoch}");
        }
    }

    #[test]
    fn test_prior_total_multiplier_by_timestamp() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        let before = Timestamp::new(START - 10);
        engine.stake(&alice(), 10, 4, at(2), &mut ledger).unwrap();

        assert_eq!(engine.prior_total_multiplier(before).unwrap(), 0);
        assert_eq!(engine.prior_total_multiplier(at(1)).unwrap(), 0);
        assert_eq!(engine.prior_total_multiplier(at(2)).unwrap(), 1_000);
        assert_eq!(engine.prior_total_multiplier(at(50)).unwrap(), 1_000);
    }

    #[test]
    fn test_voting_power_policies() {
        let mut ledger = funded_ledger();
        let mut engine = weekly_engine();
        engine.stake(&alice(), 10, 5, at(1), &mut ledger).unwrap();
        assert_eq!(engine.prior_votes(&alice(), 0), 0);
        assert_eq!(engine.prior_votes(&alice(), 1), 10);

        let config = FarmConfig {
            epoch_duration_secs: WEEK_SECS,
            epoch1_start: Some(START),
            voting_power_policy: VotingPowerPolicy::MultiplierWeighted,
            ..FarmConfig::default()
        };
        let mut weighted = FarmingEngine::new(engine_address(), owner(), &config).unwrap();
        weighted.stake(&alice(), 10, 5, at(1), &mut ledger).unwrap();
        assert_eq!(weighted.prior_votes(&alice(), 1), 10 * 104);
    }

    #[test]
    fn test_voting_power_history_is_immutable() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), 10, 4, at(0), &mut ledger).unwrap();
        engine.stake(&alice(), 15, 4, at(3), &mut ledger).unwrap();
        engine.emergency_withdraw(&alice(), 0, at(5), &mut ledger).unwrap();

        assert_eq!(engine.prior_votes(&alice(), 0), 10);
        assert_eq!(engine.prior_votes(&alice(), 2), 10);
        assert_eq!(engine.prior_votes(&alice(), 3), 25);
        assert_eq!(engine.prior_votes(&alice(), 5), 15);
        assert_eq!(engine.current_votes(&alice()), 15);
    }

    #[test]
    fn test_emission_change_is_not_retroactive() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), UNIT, 10, at(0), &mut ledger).unwrap();
        engine
            .set_emission_per_epoch(&owner(), 3 * EMISSION, at(2))
            .unwrap();

        assert_eq!(engine.emission_at(1), EMISSION);
        assert_eq!(engine.emission_at(2), 3 * EMISSION);
        assert_eq!(
            engine.claimable(&alice(), 0, at(4)).unwrap(),
            2 * EMISSION + 2 * 3 * EMISSION
        );
    }

    #[test]
    fn test_owner_only_operations() {
        let mut engine = weekly_engine();
        let mallory = Address::from_index(9);
        assert!(matches!(
            engine.set_multipliers(&mallory, vec![100]),
            Err(FarmError::Authority(_))
        ));
        assert!(engine
            .set_emission_per_epoch(&mallory, 1, at(0))
            .is_err());
        assert!(matches!(
            engine.set_epoch1_start(&owner(), Timestamp::new(1)),
            Err(FarmError::AlreadyInitialized)
        ));

        engine.transfer_ownership(&owner(), mallory.clone()).unwrap();
        assert_eq!(engine.owner(), Some(&owner()));
        engine.accept_ownership(&mallory).unwrap();
        assert_eq!(engine.owner(), Some(&mallory));
        assert_eq!(
            engine.set_multipliers(&owner(), vec![100]).unwrap_err().kind(),
            dexf_types::ErrorKind::Authorization
        );
    }

    #[test]
    fn test_manual_epoch_init() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), 10, 4, at(0), &mut ledger).unwrap();

        engine.manual_epoch_init(3, at(3)).unwrap();
        assert_eq!(engine.total_multiplier_ledger().last_epoch(), Some(3));
        assert_eq!(engine.total_multiplier_at(3), 1_000);
        // Idempotent.
        engine.manual_epoch_init(3, at(3)).unwrap();
        engine.manual_epoch_init(1, at(3)).unwrap();
        assert_eq!(engine.total_multiplier_ledger().len(), 2);

        assert!(matches!(
            engine.manual_epoch_init(7, at(3)),
            Err(FarmError::FutureEpoch { epoch: 7, current: 3 })
        ));
    }

    #[test]
    fn test_out_of_order_time_moves_no_funds() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), 10, 4, at(3), &mut ledger).unwrap();
        let err = engine.stake(&bob(), 10, 4, at(1), &mut ledger).unwrap_err();
        assert!(matches!(err, FarmError::EpochRegression { last: 3, attempted: 1 }));
        assert_eq!(ledger.balance(&Asset::Native, &bob()), 1_000 * UNIT);
    }

    #[test]
    fn test_ledger_failure_surfaces() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        ledger.fail_next_call(LedgerError::Rejected("paused".into()));
        assert!(matches!(
            engine.stake(&alice(), 10, 4, at(0), &mut ledger),
            Err(FarmError::Ledger(_))
        ));
        assert_eq!(engine.get_stakes(&alice()).count(), 0);
    }

    #[test]
    fn test_daily_epochs_lock_four_weeks() {
        let config = FarmConfig {
            epoch_duration_secs: DAY_SECS,
            epoch1_start: Some(START),
            ..FarmConfig::default()
        };
        let mut engine = FarmingEngine::new(engine_address(), owner(), &config).unwrap();
        let mut ledger = funded_ledger();
        let day = |n: u64| Timestamp::new(START + n * DAY_SECS);

        engine.stake(&alice(), UNIT, 4, day(0), &mut ledger).unwrap();
        assert!(matches!(
            engine.unstake(&alice(), 0, day(27), &mut ledger),
            Err(FarmError::LockNotFinished { current: 27, unlock: 28 })
        ));
        let receipt = engine.unstake(&alice(), 0, day(28), &mut ledger).unwrap();
        assert_eq!(receipt.reward, 28 * config.emission_per_epoch());
        assert_eq!(engine.get_stake(&alice(), 0).unwrap().end_epoch, Some(28));
    }

    #[test]
    fn test_get_stakes_is_restartable() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), 1, 4, at(0), &mut ledger).unwrap();
        engine.stake(&alice(), 2, 5, at(0), &mut ledger).unwrap();

        let iter = engine.get_stakes(&alice());
        let amounts: Vec<u128> = iter.clone().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![1, 2]);
        assert_eq!(iter.count(), 2);
        assert_eq!(engine.get_stakes(&bob()).count(), 0);
    }

    #[test]
    fn test_store_roundtrip() {
        let mut engine = weekly_engine();
        let mut ledger = funded_ledger();
        engine.stake(&alice(), 10, 4, at(0), &mut ledger).unwrap();
        engine.stake(&bob(), 20, 6, at(1), &mut ledger).unwrap();
        engine.register_token(&owner(), Address::from_index(0x70)).unwrap();

        let store = NullStore::new();
        engine.save_to_store(&store).unwrap();
        let restored = FarmingEngine::load_from_store(&store).unwrap();

        assert_eq!(restored.total_multiplier_ledger(), engine.total_multiplier_ledger());
        assert_eq!(restored.prior_votes(&bob(), 1), 20);
        assert_eq!(restored.get_stakes(&alice()).count(), 1);
        assert!(restored.is_registered(&Address::from_index(0x70)));
        assert_eq!(restored.owner(), Some(&owner()));
        assert_eq!(
            restored.claimable(&alice(), 0, at(3)).unwrap(),
            engine.claimable(&alice(), 0, at(3)).unwrap()
        );
    }

    #[test]
    fn test_load_from_empty_store_fails() {
        let store = NullStore::new();
        assert!(matches!(
            FarmingEngine::load_from_store(&store),
            Err(FarmError::Store(StoreError::NotFound(_)))
        ));
    }
}
