//! Contracts for the modules governance delegates to.
//!
//! Tallying, deposit accounting and refund/burn policy live outside this
//! crate. The engine calls them at fixed points in the lifecycle and treats
//! any failure there as a fault that aborts the unit of work.

use thiserror::Error;

use tessera_store::{KvRead, KvWrite, StoreError};
use tessera_types::Address;

use crate::proposal::{Proposal, ProposalStatus, TallyResult};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl From<StoreError> for CollaboratorError {
    fn from(e: StoreError) -> Self {
        CollaboratorError(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallyOutcome {
    /// Must be `Passed`, `Rejected` or `Failed`.
    pub status: ProposalStatus,
    pub result: TallyResult,
}

/// Counts votes for a proposal whose voting period has ended.
///
/// Called exactly once per proposal.
pub trait TallyHandler {
    fn tally(&self, store: &dyn KvRead, proposal: &Proposal) -> Result<TallyOutcome, CollaboratorError>;
}

/// Decides what happens to deposits when a proposal leaves the lifecycle.
pub trait DepositPolicy {
    /// The deposit period ended below the minimum; the proposal is about
    /// to be deleted.
    fn on_deposit_period_expired(
        &self,
        _store: &mut dyn KvWrite,
        _proposal: &Proposal,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// The proposal has just been given its final status.
    fn on_proposal_finalized(
        &self,
        _store: &mut dyn KvWrite,
        _proposal: &Proposal,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Leaves deposits where they are.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetainDeposits;

impl DepositPolicy for RetainDeposits {}

/// Callbacks for modules that track governance activity.
///
/// Hooks run inside the unit of work, so their writes commit or roll back
/// together with the transition that triggered them.
pub trait GovHooks {
    fn after_proposal_submission(
        &self,
        _store: &mut dyn KvWrite,
        _proposal_id: u64,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn after_proposal_failed_min_deposit(
        &self,
        _store: &mut dyn KvWrite,
        _proposal_id: u64,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn after_proposal_voting_period_ended(
        &self,
        _store: &mut dyn KvWrite,
        _proposal_id: u64,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl GovHooks for NoHooks {}

/// Presence of `(proposal_id, depositor)` deposit records.
pub trait DepositIndex {
    fn has_deposit(
        &self,
        store: &dyn KvRead,
        proposal_id: u64,
        depositor: &Address,
    ) -> Result<bool, CollaboratorError>;
}

/// Presence of `(proposal_id, voter)` vote records.
pub trait VoteIndex {
    fn has_vote(
        &self,
        store: &dyn KvRead,
        proposal_id: u64,
        voter: &Address,
    ) -> Result<bool, CollaboratorError>;
}
