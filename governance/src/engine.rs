//! Core governance engine: drives proposals through deposit, voting and
//! finalization, keeping the time-ordered queues in step with each status.
//!
//! Every public operation that writes runs as one unit of work via
//! [`atomically`]: either all of its writes reach the store or none do.
//! Events raised along the way are published only after the unit applied to
//! the caller's store, which may itself be an uncommitted batch.

use tessera_store::{atomically, KvRead, KvWrite};
use tessera_types::{Address, Timestamp};
use tessera_utils::format_duration;

use crate::admission::{AdmissionGate, MsgRouter, MsgSubmitProposal};
use crate::collaborators::{
    CollaboratorError, DepositIndex, DepositPolicy, GovHooks, NoHooks, RetainDeposits,
    TallyHandler, VoteIndex,
};
use crate::error::{ConsistencyFault, GovernanceError};
use crate::events::{EventSink, GovEvent, NullEvents};
use crate::invariants;
use crate::params::{self, GovParams};
use crate::proposal::{Proposal, ProposalStatus};
use crate::queue::{EmergencySet, QueueEntry, QueueKind, TimeQueue};
use crate::sequence::ProposalSequence;
use crate::store::{ProposalFilter, ProposalStore};

/// Name of the module account that must sign every proposal message.
pub const GOV_MODULE_NAME: &str = "gov";

/// The block being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockContext {
    pub height: u64,
    /// Block header time; every deadline is derived from it.
    pub time: Timestamp,
}

impl BlockContext {
    pub fn new(height: u64, time: Timestamp) -> Self {
        Self { height, time }
    }
}

/// What one sweep did, in processing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub activated: Vec<u64>,
    /// Subset of `activated` that entered the emergency set.
    pub emergency: Vec<u64>,
    pub dropped: Vec<u64>,
    pub finalized: Vec<(u64, ProposalStatus)>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.dropped.is_empty() && self.finalized.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockReport {
    pub height: u64,
    pub deposit: SweepReport,
    pub voting: SweepReport,
}

pub struct GovernanceEngine {
    gate: AdmissionGate,
    tally: Box<dyn TallyHandler>,
    deposits: Box<dyn DepositPolicy>,
    hooks: Box<dyn GovHooks>,
    events: Box<dyn EventSink>,
    proposals: ProposalStore,
    sequence: ProposalSequence,
    inactive: TimeQueue,
    active: TimeQueue,
    emergency: EmergencySet,
}

impl GovernanceEngine {
    /// An engine whose authority is the `gov` module account.
    pub fn new(router: Box<dyn MsgRouter>, tally: Box<dyn TallyHandler>) -> Self {
        Self::with_authority(Address::for_module(GOV_MODULE_NAME), router, tally)
    }

    pub fn with_authority(
        authority: Address,
        router: Box<dyn MsgRouter>,
        tally: Box<dyn TallyHandler>,
    ) -> Self {
        Self {
            gate: AdmissionGate::new(authority, router),
            tally,
            deposits: Box::new(RetainDeposits),
            hooks: Box::new(NoHooks),
            events: Box::new(NullEvents),
            proposals: ProposalStore,
            sequence: ProposalSequence,
            inactive: TimeQueue::inactive(),
            active: TimeQueue::active(),
            emergency: EmergencySet,
        }
    }

    pub fn with_events(mut self, events: Box<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn GovHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_deposit_policy(mut self, deposits: Box<dyn DepositPolicy>) -> Self {
        self.deposits = deposits;
        self
    }

    pub fn authority(&self) -> Address {
        self.gate.authority()
    }

    // ── Genesis & params ───────────────────────────────────────────────

    /// Persist params and seed the id sequence. Runs once per chain.
    pub fn init_genesis(
        &self,
        store: &mut dyn KvWrite,
        starting_proposal_id: u64,
        params: &GovParams,
    ) -> Result<(), GovernanceError> {
        atomically(store, |kv| {
            self.sequence.seed(kv, starting_proposal_id)?;
            params::save(kv, params)
        })?;
        tracing::info!(
            starting_proposal_id,
            deposit_period = %format_duration(params.deposit_period_secs),
            voting_period = %format_duration(params.voting_period_secs),
            min_deposit = %params.min_deposit,
            "governance genesis initialized"
        );
        Ok(())
    }

    pub fn params(&self, store: &dyn KvRead) -> Result<GovParams, GovernanceError> {
        params::load(store)
    }

    /// Replace the params. Deadlines already queued keep their values.
    pub fn set_params(&self, store: &mut dyn KvWrite, params: &GovParams) -> Result<(), GovernanceError> {
        params::save(store, params)?;
        tracing::info!(
            deposit_period = %format_duration(params.deposit_period_secs),
            voting_period = %format_duration(params.voting_period_secs),
            "governance params updated"
        );
        Ok(())
    }

    // ── Submission & activation ────────────────────────────────────────

    /// Admit a proposal into its deposit period.
    ///
    /// Admission errors are returned before anything is written.
    pub fn submit_proposal(
        &self,
        store: &mut dyn KvWrite,
        ctx: &BlockContext,
        msg: MsgSubmitProposal,
    ) -> Result<Proposal, GovernanceError> {
        let params = self.params(store.as_read())?;
        self.gate.validate(store.as_read(), &params, &msg)?;

        let mut events = Vec::new();
        let proposal = atomically(store, |kv| {
            let id = self.sequence.next(kv)?;
            let deposit_end_time = ctx.time.plus_secs(params.deposit_period_secs);
            let proposal = Proposal::new(
                id,
                msg.messages,
                ctx.time,
                deposit_end_time,
                msg.metadata,
                msg.title,
                msg.summary,
                msg.proposer,
            );
            self.proposals.put(kv, &proposal)?;
            self.inactive.insert(kv, deposit_end_time, id)?;
            self.hooks
                .after_proposal_submission(kv, id)
                .map_err(|e| collaborator("submission hook", e))?;
            events.push(GovEvent::SubmitProposal {
                proposal_id: id,
                messages: proposal.message_type_urls(),
            });
            Ok::<_, GovernanceError>(proposal)
        })?;

        tracing::info!(
            proposal_id = proposal.id,
            proposer = %proposal.proposer,
            messages = proposal.messages.len(),
            deposit_end_time = %proposal.deposit_end_time,
            "proposal submitted"
        );
        self.publish(events);
        Ok(proposal)
    }

    /// Move a proposal into voting as soon as its deposit meets the minimum.
    ///
    /// Meant for the deposit module to call after crediting a deposit.
    /// Returns whether the proposal was activated.
    pub fn try_activate(
        &self,
        store: &mut dyn KvWrite,
        ctx: &BlockContext,
        proposal_id: u64,
    ) -> Result<bool, GovernanceError> {
        let mut events = Vec::new();
        let activated = atomically(store, |kv| {
            let proposal = self.proposals.require(kv.as_read(), proposal_id)?;
            if proposal.status != ProposalStatus::DepositPeriod {
                return Err(GovernanceError::WrongStatus {
                    id: proposal_id,
                    expected: ProposalStatus::DepositPeriod,
                    actual: proposal.status,
                });
            }
            let params = self.params(kv.as_read())?;
            if !proposal.total_deposit.is_all_gte(&params.min_deposit) {
                return Ok(false);
            }
            self.activate(kv, ctx, proposal, &params, &mut events)?;
            Ok::<_, GovernanceError>(true)
        })?;
        self.publish(events);
        Ok(activated)
    }

    /// Start the voting period. Returns whether the proposal is an emergency.
    fn activate(
        &self,
        kv: &mut dyn KvWrite,
        ctx: &BlockContext,
        mut proposal: Proposal,
        params: &GovParams,
        events: &mut Vec<GovEvent>,
    ) -> Result<bool, GovernanceError> {
        let id = proposal.id;
        let voting_end_time = ctx.time.plus_secs(params.voting_period_secs);
        proposal.voting_start_time = Some(ctx.time);
        proposal.voting_end_time = Some(voting_end_time);
        proposal.status = ProposalStatus::VotingPeriod;

        self.proposals.put(kv, &proposal)?;
        self.inactive
            .remove(kv, proposal.deposit_end_time, id)
            .map_err(GovernanceError::escalate)?;
        self.active.insert(kv, voting_end_time, id)?;
        events.push(GovEvent::ProposalActivated {
            proposal_id: id,
            voting_end_time,
        });

        let emergency = proposal
            .total_deposit
            .is_all_gte(&params.emergency_min_deposit);
        if emergency {
            self.emergency.insert(kv, id)?;
            events.push(GovEvent::EmergencyProposal { proposal_id: id });
        }

        tracing::info!(
            proposal_id = id,
            total_deposit = %proposal.total_deposit,
            voting_end_time = %voting_end_time,
            emergency,
            "proposal entered voting period"
        );
        Ok(emergency)
    }

    // ── Periodic sweeps ───────────────────────────────────────────────

    /// Run both sweeps for a block as a single unit of work.
    pub fn end_block(
        &self,
        store: &mut dyn KvWrite,
        ctx: &BlockContext,
    ) -> Result<BlockReport, GovernanceError> {
        let span = tracing::info_span!("end_block", height = ctx.height, time = ctx.time.as_secs());
        let _enter = span.enter();

        let mut events = Vec::new();
        let result: Result<BlockReport, GovernanceError> = atomically(store, |kv| {
            let deposit = self.sweep_deposit_period_in(kv, ctx, &mut events)?;
            let voting = self.sweep_voting_period_in(kv, ctx, &mut events)?;
            Ok(BlockReport {
                height: ctx.height,
                deposit,
                voting,
            })
        });

        match result {
            Ok(report) => {
                if !report.deposit.is_empty() || !report.voting.is_empty() {
                    tracing::debug!(
                        activated = report.deposit.activated.len(),
                        dropped = report.deposit.dropped.len(),
                        finalized = report.voting.finalized.len(),
                        "governance block processed"
                    );
                }
                self.publish(events);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "governance block aborted");
                Err(e)
            }
        }
    }

    /// Activate or drop every proposal whose deposit period has ended.
    pub fn sweep_deposit_period(
        &self,
        store: &mut dyn KvWrite,
        ctx: &BlockContext,
    ) -> Result<SweepReport, GovernanceError> {
        let mut events = Vec::new();
        let report = atomically(store, |kv| self.sweep_deposit_period_in(kv, ctx, &mut events))?;
        self.publish(events);
        Ok(report)
    }

    /// Finalize every proposal whose voting period has ended.
    pub fn sweep_voting_period(
        &self,
        store: &mut dyn KvWrite,
        ctx: &BlockContext,
    ) -> Result<SweepReport, GovernanceError> {
        let mut events = Vec::new();
        let report = atomically(store, |kv| self.sweep_voting_period_in(kv, ctx, &mut events))?;
        self.publish(events);
        Ok(report)
    }

    fn sweep_deposit_period_in(
        &self,
        kv: &mut dyn KvWrite,
        ctx: &BlockContext,
        events: &mut Vec<GovEvent>,
    ) -> Result<SweepReport, GovernanceError> {
        let params = self.params(kv.as_read())?;
        let mut report = SweepReport::default();

        for entry in self.inactive.due(kv.as_read(), ctx.time)? {
            let proposal = self.queued_proposal(kv.as_read(), QueueKind::Inactive, entry)?;
            let id = proposal.id;
            if proposal.total_deposit.is_all_gte(&params.min_deposit) {
                if self.activate(kv, ctx, proposal, &params, events)? {
                    report.emergency.push(id);
                }
                report.activated.push(id);
            } else {
                self.drop_expired(kv, proposal, events)?;
                report.dropped.push(id);
            }
        }
        Ok(report)
    }

    fn drop_expired(
        &self,
        kv: &mut dyn KvWrite,
        proposal: Proposal,
        events: &mut Vec<GovEvent>,
    ) -> Result<(), GovernanceError> {
        let id = proposal.id;
        self.deposits
            .on_deposit_period_expired(kv, &proposal)
            .map_err(|e| collaborator("deposit policy", e))?;
        self.hooks
            .after_proposal_failed_min_deposit(kv, id)
            .map_err(|e| collaborator("min deposit hook", e))?;
        self.remove_proposal(kv, &proposal)?;
        events.push(GovEvent::InactiveProposalDropped { proposal_id: id });
        tracing::info!(
            proposal_id = id,
            total_deposit = %proposal.total_deposit,
            "proposal dropped after deposit period"
        );
        Ok(())
    }

    fn sweep_voting_period_in(
        &self,
        kv: &mut dyn KvWrite,
        ctx: &BlockContext,
        events: &mut Vec<GovEvent>,
    ) -> Result<SweepReport, GovernanceError> {
        let mut report = SweepReport::default();

        for entry in self.active.due(kv.as_read(), ctx.time)? {
            let mut proposal = self.queued_proposal(kv.as_read(), QueueKind::Active, entry)?;
            let id = proposal.id;

            let outcome = self
                .tally
                .tally(kv.as_read(), &proposal)
                .map_err(|e| collaborator("tally", e))?;
            if !outcome.status.is_tally_outcome() {
                return Err(ConsistencyFault::Collaborator {
                    collaborator: "tally",
                    reason: format!("returned non-final status {} for proposal {id}", outcome.status),
                }
                .into());
            }

            self.active
                .remove(kv, entry.time, id)
                .map_err(GovernanceError::escalate)?;
            self.emergency.remove(kv, id)?;
            proposal.status = outcome.status;
            proposal.final_tally_result = Some(outcome.result);
            self.proposals.put(kv, &proposal)?;

            self.deposits
                .on_proposal_finalized(kv, &proposal)
                .map_err(|e| collaborator("deposit policy", e))?;
            self.hooks
                .after_proposal_voting_period_ended(kv, id)
                .map_err(|e| collaborator("voting period hook", e))?;

            events.push(GovEvent::ActiveProposalFinalized {
                proposal_id: id,
                status: proposal.status,
            });
            tracing::info!(proposal_id = id, status = %proposal.status, "proposal finalized");
            report.finalized.push((id, proposal.status));
        }
        Ok(report)
    }

    /// Load the proposal a queue entry points at and check they agree.
    fn queued_proposal(
        &self,
        store: &dyn KvRead,
        kind: QueueKind,
        entry: QueueEntry,
    ) -> Result<Proposal, GovernanceError> {
        let proposal = self
            .proposals
            .get(store, entry.proposal_id)?
            .ok_or(ConsistencyFault::MissingProposal(entry.proposal_id))?;
        let (expected_status, deadline) = match kind {
            QueueKind::Inactive => (ProposalStatus::DepositPeriod, Some(proposal.deposit_end_time)),
            QueueKind::Active => (ProposalStatus::VotingPeriod, proposal.voting_end_time),
        };
        let reason = if proposal.status != expected_status {
            Some(format!("proposal status is {}", proposal.status))
        } else if deadline != Some(entry.time) {
            Some(format!("stored deadline is {deadline:?}"))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ConsistencyFault::QueueDivergence {
                queue: kind.name(),
                time: entry.time,
                id: entry.proposal_id,
                reason,
            }
            .into()),
            None => Ok(proposal),
        }
    }

    // ── Deletion ──────────────────────────────────────────────────────

    /// Remove a proposal and every index entry that refers to it.
    ///
    /// For pruning policies. The proposal must exist.
    pub fn delete_proposal(&self, store: &mut dyn KvWrite, proposal_id: u64) -> Result<(), GovernanceError> {
        atomically(store, |kv| {
            let proposal = self
                .proposals
                .require(kv.as_read(), proposal_id)
                .map_err(GovernanceError::escalate)?;
            self.remove_proposal(kv, &proposal)
        })?;
        tracing::info!(proposal_id, "proposal deleted");
        Ok(())
    }

    /// Queue removal uses the stored deadlines, never recomputed ones.
    fn remove_proposal(&self, kv: &mut dyn KvWrite, proposal: &Proposal) -> Result<(), GovernanceError> {
        let id = proposal.id;
        match proposal.status {
            ProposalStatus::DepositPeriod => self
                .inactive
                .remove(kv, proposal.deposit_end_time, id)
                .map_err(GovernanceError::escalate)?,
            ProposalStatus::VotingPeriod => {
                let end = proposal.voting_end_time.ok_or_else(|| {
                    ConsistencyFault::Invariant(format!(
                        "proposal {id} is in voting period without a voting end time"
                    ))
                })?;
                self.active
                    .remove(kv, end, id)
                    .map_err(GovernanceError::escalate)?;
            }
            _ => {}
        }
        self.emergency.remove(kv, id)?;
        self.proposals
            .delete(kv, id)
            .map_err(GovernanceError::escalate)
    }

    // ── Reads ─────────────────────────────────────────────────────────

    pub fn proposal(&self, store: &dyn KvRead, proposal_id: u64) -> Result<Option<Proposal>, GovernanceError> {
        self.proposals.get(store, proposal_id)
    }

    pub fn proposals(&self, store: &dyn KvRead) -> Result<Vec<Proposal>, GovernanceError> {
        self.proposals.all(store)
    }

    pub fn proposals_filtered(
        &self,
        store: &dyn KvRead,
        filter: &ProposalFilter,
        deposits: &dyn DepositIndex,
        votes: &dyn VoteIndex,
    ) -> Result<Vec<Proposal>, GovernanceError> {
        let params = self.params(store)?;
        self.proposals.filtered(store, &params, filter, deposits, votes)
    }

    /// Proposals currently fast-tracked, in id order.
    pub fn emergency_proposals(&self, store: &dyn KvRead) -> Result<Vec<Proposal>, GovernanceError> {
        let mut proposals = Vec::new();
        for id in self.emergency.ids(store)? {
            let proposal = self
                .proposals
                .get(store, id)?
                .ok_or(ConsistencyFault::MissingProposal(id))?;
            proposals.push(proposal);
        }
        Ok(proposals)
    }

    pub fn is_voting_period(&self, store: &dyn KvRead, proposal_id: u64) -> Result<bool, GovernanceError> {
        self.proposals.is_voting_period(store, proposal_id)
    }

    pub fn next_proposal_id(&self, store: &dyn KvRead) -> Result<u64, GovernanceError> {
        self.sequence.peek(store)
    }

    /// Audit the whole store; returns the first violation found.
    pub fn check_invariants(&self, store: &dyn KvRead) -> Result<(), GovernanceError> {
        invariants::check(store)
    }

    fn publish(&self, events: Vec<GovEvent>) {
        for event in events {
            if let Err(e) = self.events.emit(&event) {
                tracing::warn!(
                    proposal_id = event.proposal_id(),
                    kind = event.kind(),
                    error = %e,
                    "event emission failed"
                );
            }
        }
    }
}

fn collaborator(name: &'static str, e: CollaboratorError) -> GovernanceError {
    ConsistencyFault::Collaborator {
        collaborator: name,
        reason: e.0,
    }
    .into()
}
