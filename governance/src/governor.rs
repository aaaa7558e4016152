//! The governor: proposal registry and its state machine.

use crate::config::GovernanceConfig;
use crate::error::GovernanceError;
use crate::power::VotingPower;
use crate::proposal::{Proposal, ProposalAction, ProposalId, ProposalState, Receipt};
use dexf_store::{decode, decode_required, encode, GovernanceStore};
use dexf_timelock::{encode_args, CallRouter, TimelockCall, TimelockController};
use dexf_types::{Address, Authority, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

const SETTINGS_KEY: &str = "governance/settings";
const SET_PENDING_ADMIN: &str = "setPendingAdmin(address)";

#[derive(Serialize, Deserialize)]
struct GovernorSettings {
    address: Address,
    guardian: Authority,
    config: GovernanceConfig,
    proposal_count: u64,
    latest_proposal_ids: BTreeMap<Address, ProposalId>,
}

/// Owns every proposal and vote receipt.
///
/// The governor never holds a reference to the timelock or the voting-power
/// source; both are passed into the operations that need them.
#[derive(Clone, Debug)]
pub struct GovernorEngine {
    address: Address,
    guardian: Authority,
    config: GovernanceConfig,
    proposals: BTreeMap<ProposalId, Proposal>,
    receipts: BTreeMap<ProposalId, BTreeMap<Address, Receipt>>,
    latest_proposal_ids: BTreeMap<Address, ProposalId>,
    proposal_count: u64,
}

impl GovernorEngine {
    pub fn new(address: Address, guardian: Address, config: GovernanceConfig) -> Self {
        Self {
            address,
            guardian: Authority::new(guardian),
            config,
            proposals: BTreeMap::new(),
            receipts: BTreeMap::new(),
            latest_proposal_ids: BTreeMap::new(),
            proposal_count: 0,
        }
    }

    /// Open a proposal. The proposer's current voting power must reach the
    /// threshold, and their previous proposal must no longer be live.
    pub fn propose(
        &mut self,
        proposer: &Address,
        actions: Vec<ProposalAction>,
        description: impl Into<String>,
        now: Timestamp,
        power: &dyn VotingPower,
    ) -> Result<ProposalId, GovernanceError> {
        let epoch = power.current_epoch(now)?;
        let votes = power.prior_votes(proposer, epoch);
        let threshold = self.config.proposal_threshold();
        if votes < threshold {
            return Err(GovernanceError::BelowThreshold { votes, threshold });
        }
        if actions.is_empty() {
            return Err(GovernanceError::NoActions);
        }
        if actions.len() > self.config.max_operations {
            return Err(GovernanceError::TooManyActions {
                count: actions.len(),
                max: self.config.max_operations,
            });
        }
        if let Some(latest) = self
            .latest_proposal_ids
            .get(proposer)
            .and_then(|id| self.proposals.get(id))
        {
            // Grace only matters once queued, so zero is fine here.
            let state = latest.state(now, self.config.quorum_votes(), 0);
            if state.is_live() {
                return Err(GovernanceError::ProposerHasLiveProposal {
                    id: latest.id,
                    state,
                });
            }
        }

        // Voting opens only once the snapshot epoch has ended. Before epoch 1
        // starts every timestamp is still epoch 0.
        let next_epoch = epoch.checked_add(1).ok_or(GovernanceError::Overflow)?;
        let sealed_at = power.epoch_start(next_epoch)?;
        let start_time = now
            .checked_add_secs(self.config.voting_delay_secs)
            .ok_or(GovernanceError::Overflow)?
            .max(sealed_at);
        let end_time = start_time
            .checked_add_secs(self.config.voting_period_secs)
            .ok_or(GovernanceError::Overflow)?;
        let id = self.proposal_count + 1;
        let action_count = actions.len();
        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer: proposer.clone(),
                actions,
                description: description.into(),
                created_at: now,
                snapshot_epoch: epoch,
                start_time,
                end_time,
                for_votes: 0,
                against_votes: 0,
                eta: None,
                executed: false,
                canceled: false,
            },
        );
        self.proposal_count = id;
        self.latest_proposal_ids.insert(proposer.clone(), id);

        info!(
            proposal_id = id,
            %proposer,
            snapshot_epoch = epoch,
            start = start_time.as_secs(),
            end = end_time.as_secs(),
            actions = action_count,
            "proposal created"
        );
        Ok(id)
    }

    /// Record a vote. Weight is the voter's power at the proposal's snapshot
    /// epoch, so stake changes after creation never move it.
    pub fn cast_vote(
        &mut self,
        voter: &Address,
        id: ProposalId,
        support: bool,
        now: Timestamp,
        power: &dyn VotingPower,
    ) -> Result<Receipt, GovernanceError> {
        let proposal = self.get(id)?;
        let state = proposal.state(now, self.config.quorum_votes(), 0);
        if state != ProposalState::Active {
            return Err(GovernanceError::VotingClosed { id, state });
        }
        if self
            .receipts
            .get(&id)
            .is_some_and(|r| r.contains_key(voter))
        {
            return Err(GovernanceError::AlreadyVoted {
                id,
                voter: voter.clone(),
            });
        }
        let votes = power.prior_votes(voter, proposal.snapshot_epoch);

        let proposal = self.get_mut(id)?;
        let tally = if support {
            &mut proposal.for_votes
        } else {
            &mut proposal.against_votes
        };
        *tally = tally.checked_add(votes).ok_or(GovernanceError::Overflow)?;

        let receipt = Receipt { support, votes };
        self.receipts
            .entry(id)
            .or_default()
            .insert(voter.clone(), receipt);
        info!(proposal_id = id, %voter, support, votes, "vote cast");
        Ok(receipt)
    }

    /// Current state of proposal `id`.
    pub fn state(
        &self,
        id: ProposalId,
        now: Timestamp,
        timelock: &dyn TimelockController,
    ) -> Result<ProposalState, GovernanceError> {
        Ok(self
            .get(id)?
            .state(now, self.config.quorum_votes(), timelock.grace_period()))
    }

    /// Hand a succeeded proposal's actions to the timelock with
    /// `eta = now + delay`.
    pub fn queue(
        &mut self,
        id: ProposalId,
        now: Timestamp,
        timelock: &mut dyn TimelockController,
    ) -> Result<Timestamp, GovernanceError> {
        let state = self.state(id, now, &*timelock)?;
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::NotSucceeded { id, state });
        }
        let eta = now
            .checked_add_secs(timelock.delay())
            .ok_or(GovernanceError::Overflow)?;
        let calls: Vec<TimelockCall> = self
            .get(id)?
            .actions
            .iter()
            .map(|a| a.to_call(eta))
            .collect();

        let mut seen = BTreeSet::new();
        for call in &calls {
            let hash = call.hash()?;
            if timelock.is_queued(&hash) || !seen.insert(hash) {
                return Err(GovernanceError::DuplicateAction { hash });
            }
        }
        for call in calls {
            timelock.queue_transaction(&self.address, call, now)?;
        }

        self.get_mut(id)?.eta = Some(eta);
        info!(proposal_id = id, eta = eta.as_secs(), "proposal queued");
        Ok(eta)
    }

    /// Execute every action of a queued proposal through the timelock.
    ///
    /// Any failing action fails the whole call. Actions that ran before the
    /// failure are not rolled back here; callers that need all-or-nothing
    /// across components wrap this in their own transaction.
    pub fn execute(
        &mut self,
        id: ProposalId,
        now: Timestamp,
        timelock: &mut dyn TimelockController,
        router: &mut dyn CallRouter,
    ) -> Result<(), GovernanceError> {
        let state = self.state(id, now, &*timelock)?;
        let proposal = self.get(id)?;
        let eta = match (state, proposal.eta) {
            (ProposalState::Queued, Some(eta)) => eta,
            _ => return Err(GovernanceError::NotQueued { id, state }),
        };
        let calls: Vec<TimelockCall> = proposal.actions.iter().map(|a| a.to_call(eta)).collect();

        self.get_mut(id)?.executed = true;
        for call in &calls {
            if let Err(e) = timelock.execute_transaction(&self.address, call, now, router) {
                warn!(proposal_id = id, signature = %call.signature, error = %e, "proposal execution failed");
                self.get_mut(id)?.executed = false;
                return Err(e.into());
            }
        }
        info!(proposal_id = id, actions = calls.len(), "proposal executed");
        Ok(())
    }

    /// Cancel a proposal that has not reached a final state.
    ///
    /// Allowed for the proposer, the guardian, or anyone once the proposer's
    /// voting power has dropped below the threshold. Queued timelock
    /// transactions are canceled too.
    pub fn cancel(
        &mut self,
        caller: &Address,
        id: ProposalId,
        now: Timestamp,
        power: &dyn VotingPower,
        timelock: &mut dyn TimelockController,
    ) -> Result<(), GovernanceError> {
        let state = self.state(id, now, &*timelock)?;
        if state.is_final() {
            return Err(GovernanceError::ProposalFinalized { id, state });
        }
        let proposal = self.get(id)?;
        let allowed = caller == &proposal.proposer
            || self.guardian.is_owner(caller)
            || power.prior_votes(&proposal.proposer, power.current_epoch(now)?)
                < self.config.proposal_threshold();
        if !allowed {
            return Err(GovernanceError::CancelNotAllowed {
                id,
                caller: caller.clone(),
            });
        }
        let calls: Vec<TimelockCall> = match proposal.eta {
            Some(eta) => proposal.actions.iter().map(|a| a.to_call(eta)).collect(),
            None => Vec::new(),
        };

        self.get_mut(id)?.canceled = true;
        for call in &calls {
            timelock.cancel_transaction(&self.address, call)?;
        }
        info!(proposal_id = id, %caller, "proposal canceled");
        Ok(())
    }

    // ── Guardian ────────────────────────────────────────────────────────

    /// Complete the timelock admin handover to this governor.
    pub fn accept_timelock_admin(
        &self,
        caller: &Address,
        timelock: &mut dyn TimelockController,
    ) -> Result<(), GovernanceError> {
        self.guardian.ensure_owner(caller)?;
        timelock.accept_admin(&self.address)?;
        Ok(())
    }

    /// Give up the guardian role permanently.
    pub fn abdicate(&mut self, caller: &Address) -> Result<(), GovernanceError> {
        self.guardian.renounce(caller)?;
        info!(guardian = %caller, "guardian abdicated");
        Ok(())
    }

    pub fn transfer_guardian(&mut self, caller: &Address, next: Address) -> Result<(), GovernanceError> {
        self.guardian.transfer(caller, next)?;
        Ok(())
    }

    pub fn accept_guardian(&mut self, caller: &Address) -> Result<(), GovernanceError> {
        self.guardian.accept(caller)?;
        info!(guardian = %caller, "guardian accepted");
        Ok(())
    }

    /// Queue `setPendingAdmin(new_pending)` on the timelock, used to move
    /// the timelock to a successor governor.
    pub fn queue_set_timelock_pending_admin(
        &self,
        caller: &Address,
        new_pending: &Address,
        eta: Timestamp,
        now: Timestamp,
        timelock: &mut dyn TimelockController,
    ) -> Result<TxHash, GovernanceError> {
        self.guardian.ensure_owner(caller)?;
        let call = set_pending_admin_call(timelock.address(), new_pending, eta)?;
        Ok(timelock.queue_transaction(&self.address, call, now)?)
    }

    pub fn execute_set_timelock_pending_admin(
        &self,
        caller: &Address,
        new_pending: &Address,
        eta: Timestamp,
        now: Timestamp,
        timelock: &mut dyn TimelockController,
        router: &mut dyn CallRouter,
    ) -> Result<(), GovernanceError> {
        self.guardian.ensure_owner(caller)?;
        let call = set_pending_admin_call(timelock.address(), new_pending, eta)?;
        timelock.execute_transaction(&self.address, &call, now, router)?;
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    fn get(&self, id: ProposalId) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    fn get_mut(&mut self, id: ProposalId) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> + '_ {
        self.proposals.values()
    }

    pub fn get_actions(&self, id: ProposalId) -> Result<&[ProposalAction], GovernanceError> {
        Ok(&self.get(id)?.actions)
    }

    pub fn get_receipt(&self, id: ProposalId, voter: &Address) -> Option<Receipt> {
        self.receipts.get(&id).and_then(|r| r.get(voter)).copied()
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposal_count
    }

    pub fn latest_proposal_id(&self, proposer: &Address) -> Option<ProposalId> {
        self.latest_proposal_ids.get(proposer).copied()
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn guardian(&self) -> Option<&Address> {
        self.guardian.owner()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}

fn set_pending_admin_call(
    timelock: &Address,
    new_pending: &Address,
    eta: Timestamp,
) -> Result<TimelockCall, GovernanceError> {
    Ok(TimelockCall::new(
        timelock.clone(),
        0,
        SET_PENDING_ADMIN,
        encode_args(new_pending)?,
        eta,
    ))
}

impl GovernorEngine {
    pub fn save_to_store(&self, store: &dyn GovernanceStore) -> Result<(), GovernanceError> {
        let settings = GovernorSettings {
            address: self.address.clone(),
            guardian: self.guardian.clone(),
            config: self.config.clone(),
            proposal_count: self.proposal_count,
            latest_proposal_ids: self.latest_proposal_ids.clone(),
        };
        store.put_meta(SETTINGS_KEY, &encode(&settings)?)?;

        for (id, proposal) in &self.proposals {
            store.put_proposal(*id, &encode(proposal)?)?;
        }
        for (id, receipts) in &self.receipts {
            for (voter, receipt) in receipts {
                store.put_receipt(*id, voter, &encode(receipt)?)?;
            }
        }
        Ok(())
    }

    pub fn load_from_store(store: &dyn GovernanceStore) -> Result<Self, GovernanceError> {
        let settings: GovernorSettings =
            decode_required(SETTINGS_KEY, store.get_meta(SETTINGS_KEY)?)?;

        let mut proposals = BTreeMap::new();
        let mut receipts = BTreeMap::new();
        for (id, bytes) in store.iter_proposals()? {
            let proposal: Proposal = decode(&format!("proposal {id}"), &bytes)?;
            let mut ballots = BTreeMap::new();
            for (voter, bytes) in store.get_receipts(id)? {
                let receipt: Receipt = decode(&format!("receipt {id}/{voter}"), &bytes)?;
                ballots.insert(voter, receipt);
            }
            if !ballots.is_empty() {
                receipts.insert(id, ballots);
            }
            proposals.insert(id, proposal);
        }

        Ok(Self {
            address: settings.address,
            guardian: settings.guardian,
            config: settings.config,
            proposals,
            receipts,
            latest_proposal_ids: settings.latest_proposal_ids,
            proposal_count: settings.proposal_count,
        })
    }
}
