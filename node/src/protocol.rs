//! The protocol: farming, governor, timelock and token ledger wired together.
//!
//! Every mutating operation runs inside [`Protocol::transact`], so a failure
//! anywhere (including a failing action halfway through a proposal's
//! execution) leaves all four components exactly as they were.

use dexf_farming::{FarmingEngine, StakeIndex, UnstakeReceipt};
use dexf_governance::{GovernorEngine, ProposalAction, ProposalId, ProposalState, Receipt};
use dexf_store::{decode_required, encode, FarmStore, GovernanceStore, MetaStore, TimelockStore};
use dexf_timelock::{Timelock, TimelockCall, TimelockController};
use dexf_types::{Address, Asset, EpochId, Timestamp, TxHash};
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::router::Router;
use crate::token::TokenLedger;
use crate::NodeError;

const TOKEN_KEY: &str = "token/state";

#[derive(Clone, Debug)]
pub struct Protocol {
    farming: FarmingEngine,
    governor: GovernorEngine,
    timelock: Timelock,
    token: TokenLedger,
}

impl Protocol {
    /// Deploy every component from `config`. The deployer owns the farming
    /// engine and the token ledger, guards the governor and administers the
    /// timelock until it is handed over.
    pub fn new(config: &NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let a = &config.addresses;
        let farming = FarmingEngine::new(a.farming.clone(), a.deployer.clone(), &config.farm)?;
        let governor = GovernorEngine::new(
            a.governor.clone(),
            a.deployer.clone(),
            config.governance.clone(),
        );
        let timelock = Timelock::new(a.timelock.clone(), a.deployer.clone(), &config.timelock)?;
        let token = TokenLedger::new(
            a.token.clone(),
            a.farming.clone(),
            a.deployer.clone(),
            &config.ledger,
        );
        info!(
            farming = %a.farming,
            governor = %a.governor,
            timelock = %a.timelock,
            token = %a.token,
            "protocol deployed"
        );
        Ok(Self {
            farming,
            governor,
            timelock,
            token,
        })
    }

    /// Run `op` against the whole protocol; on error every component is
    /// restored to its state before the call.
    pub fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, NodeError>,
    ) -> Result<T, NodeError> {
        let snapshot = self.clone();
        match op(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "operation reverted");
                *self = snapshot;
                Err(e)
            }
        }
    }

    // ── Token ───────────────────────────────────────────────────────────

    pub fn mint(
        &mut self,
        caller: &Address,
        asset: &Asset,
        to: &Address,
        amount: u128,
    ) -> Result<(), NodeError> {
        self.transact(|p| p.token.mint(caller, asset, to, amount))
    }

    /// Nominate `next` as owner of the farming engine or the token ledger,
    /// whichever lives at `target`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        target: &Address,
        next: Address,
    ) -> Result<(), NodeError> {
        self.transact(|p| {
            if target == p.farming.address() {
                p.farming.transfer_ownership(caller, next)?;
            } else if target == p.token.address() {
                p.token.transfer_ownership(caller, next)?;
            } else {
                return Err(NodeError::Config(format!("{target} has no owner")));
            }
            Ok(())
        })
    }

    // ── Farming ─────────────────────────────────────────────────────────

    pub fn set_epoch1_start(&mut self, caller: &Address, start: Timestamp) -> Result<(), NodeError> {
        self.transact(|p| Ok(p.farming.set_epoch1_start(caller, start)?))
    }

    pub fn set_multipliers(&mut self, caller: &Address, table: Vec<u16>) -> Result<(), NodeError> {
        self.transact(|p| Ok(p.farming.set_multipliers(caller, table)?))
    }

    pub fn register_token(&mut self, caller: &Address, token: Address) -> Result<(), NodeError> {
        self.transact(|p| Ok(p.farming.register_token(caller, token)?))
    }

    pub fn manual_epoch_init(&mut self, epoch: EpochId, now: Timestamp) -> Result<(), NodeError> {
        self.transact(|p| Ok(p.farming.manual_epoch_init(epoch, now)?))
    }

    pub fn stake(
        &mut self,
        account: &Address,
        amount: u128,
        weeks: u16,
        now: Timestamp,
    ) -> Result<StakeIndex, NodeError> {
        self.transact(|p| Ok(p.farming.stake(account, amount, weeks, now, &mut p.token)?))
    }

    pub fn stake_token(
        &mut self,
        account: &Address,
        token: &Address,
        amount: u128,
        weeks: u16,
        now: Timestamp,
    ) -> Result<StakeIndex, NodeError> {
        self.transact(|p| {
            Ok(p.farming
                .stake_token(account, token, amount, weeks, now, &mut p.token)?)
        })
    }

    pub fn claim(
        &mut self,
        account: &Address,
        index: StakeIndex,
        now: Timestamp,
    ) -> Result<u128, NodeError> {
        self.transact(|p| Ok(p.farming.claim(account, index, now, &mut p.token)?))
    }

    pub fn unstake(
        &mut self,
        account: &Address,
        index: StakeIndex,
        now: Timestamp,
    ) -> Result<UnstakeReceipt, NodeError> {
        self.transact(|p| Ok(p.farming.unstake(account, index, now, &mut p.token)?))
    }

    pub fn emergency_withdraw(
        &mut self,
        account: &Address,
        index: StakeIndex,
        now: Timestamp,
    ) -> Result<u128, NodeError> {
        self.transact(|p| {
            Ok(p.farming
                .emergency_withdraw(account, index, now, &mut p.token)?)
        })
    }

    // ── Governance ──────────────────────────────────────────────────────

    pub fn propose(
        &mut self,
        proposer: &Address,
        actions: Vec<ProposalAction>,
        description: impl Into<String>,
        now: Timestamp,
    ) -> Result<ProposalId, NodeError> {
        self.transact(|p| {
            Ok(p.governor
                .propose(proposer, actions, description, now, &p.farming)?)
        })
    }

    pub fn cast_vote(
        &mut self,
        voter: &Address,
        id: ProposalId,
        support: bool,
        now: Timestamp,
    ) -> Result<Receipt, NodeError> {
        self.transact(|p| Ok(p.governor.cast_vote(voter, id, support, now, &p.farming)?))
    }

    pub fn queue(&mut self, id: ProposalId, now: Timestamp) -> Result<Timestamp, NodeError> {
        self.transact(|p| Ok(p.governor.queue(id, now, &mut p.timelock)?))
    }

    /// Execute a queued proposal. All of its actions take effect or none do.
    pub fn execute(&mut self, id: ProposalId, now: Timestamp) -> Result<(), NodeError> {
        self.transact(|p| {
            let mut router = Router::new(&mut p.farming, &mut p.token, now);
            Ok(p.governor.execute(id, now, &mut p.timelock, &mut router)?)
        })
    }

    pub fn cancel(&mut self, caller: &Address, id: ProposalId, now: Timestamp) -> Result<(), NodeError> {
        self.transact(|p| {
            Ok(p.governor
                .cancel(caller, id, now, &p.farming, &mut p.timelock)?)
        })
    }

    pub fn proposal_state(&self, id: ProposalId, now: Timestamp) -> Result<ProposalState, NodeError> {
        Ok(self.governor.state(id, now, &self.timelock)?)
    }

    // ── Timelock ────────────────────────────────────────────────────────

    pub fn queue_transaction(
        &mut self,
        caller: &Address,
        call: TimelockCall,
        now: Timestamp,
    ) -> Result<TxHash, NodeError> {
        self.transact(|p| Ok(p.timelock.queue_transaction(caller, call, now)?))
    }

    pub fn cancel_transaction(
        &mut self,
        caller: &Address,
        call: &TimelockCall,
    ) -> Result<TxHash, NodeError> {
        self.transact(|p| Ok(p.timelock.cancel_transaction(caller, call)?))
    }

    pub fn execute_transaction(
        &mut self,
        caller: &Address,
        call: &TimelockCall,
        now: Timestamp,
    ) -> Result<Vec<u8>, NodeError> {
        self.transact(|p| {
            let mut router = Router::new(&mut p.farming, &mut p.token, now);
            Ok(p.timelock.execute_transaction(caller, call, now, &mut router)?)
        })
    }

    /// Make the governor the timelock admin: the current admin nominates it
    /// and the guardian accepts on its behalf.
    pub fn hand_over_timelock(&mut self, caller: &Address) -> Result<(), NodeError> {
        self.transact(|p| {
            p.timelock
                .set_pending_admin(caller, p.governor.address().clone())?;
            p.governor.accept_timelock_admin(caller, &mut p.timelock)?;
            info!(admin = %p.governor.address(), "timelock handed over to governor");
            Ok(())
        })
    }

    // ── Views ───────────────────────────────────────────────────────────

    pub fn farming(&self) -> &FarmingEngine {
        &self.farming
    }

    pub fn governor(&self) -> &GovernorEngine {
        &self.governor
    }

    pub fn timelock(&self) -> &Timelock {
        &self.timelock
    }

    pub fn token(&self) -> &TokenLedger {
        &self.token
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub fn save_to_store<S>(&self, store: &S) -> Result<(), NodeError>
    where
        S: FarmStore + GovernanceStore + TimelockStore,
    {
        self.farming.save_to_store(store)?;
        self.governor.save_to_store(store)?;
        self.timelock.save_to_store(store)?;
        MetaStore::put_meta(store, TOKEN_KEY, &encode(&self.token)?)?;
        Ok(())
    }

    pub fn load_from_store<S>(store: &S) -> Result<Self, NodeError>
    where
        S: FarmStore + GovernanceStore + TimelockStore,
    {
        let farming = FarmingEngine::load_from_store(store)?;
        let governor = GovernorEngine::load_from_store(store)?;
        let timelock = Timelock::load_from_store(store)?;
        let token = decode_required(TOKEN_KEY, MetaStore::get_meta(store, TOKEN_KEY)?)?;
        Ok(Self {
            farming,
            governor,
            timelock,
            token,
        })
    }
}
