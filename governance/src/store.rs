//! Durable proposal records.

use std::ops::{ControlFlow, Range};

use tessera_store::{KvRead, KvWrite};
use tessera_types::Address;

use crate::codec;
use crate::collaborators::{CollaboratorError, DepositIndex, VoteIndex};
use crate::error::{ConsistencyFault, GovernanceError};
use crate::keys::{proposal_key, voting_period_key, PROPOSALS_PREFIX};
use crate::params::GovParams;
use crate::proposal::{Proposal, ProposalStatus};

/// Handle over the proposal records and their voting-period markers.
///
/// The marker under `0x04 | id` exists exactly while the stored status is
/// `VotingPeriod`; [`ProposalStore::put`] re-derives it on every write.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProposalStore;

impl ProposalStore {
    pub fn put(&self, store: &mut dyn KvWrite, proposal: &Proposal) -> Result<(), GovernanceError> {
        store.set(&proposal_key(proposal.id), &codec::encode_proposal(proposal)?)?;
        let marker = voting_period_key(proposal.id);
        if proposal.status == ProposalStatus::VotingPeriod {
            store.set(&marker, &[1])?;
        } else {
            store.delete(&marker)?;
        }
        Ok(())
    }

    pub fn get(&self, store: &dyn KvRead, id: u64) -> Result<Option<Proposal>, GovernanceError> {
        match store.get(&proposal_key(id))? {
            Some(bytes) => Ok(Some(codec::decode_proposal(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Like [`ProposalStore::get`], but absence is a lookup error.
    pub fn require(&self, store: &dyn KvRead, id: u64) -> Result<Proposal, GovernanceError> {
        self.get(store, id)?
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    /// Remove the record and its marker. Queue entries are the caller's job.
    pub fn delete(&self, store: &mut dyn KvWrite, id: u64) -> Result<(), GovernanceError> {
        let key = proposal_key(id);
        if !store.has(&key)? {
            return Err(GovernanceError::ProposalNotFound(id));
        }
        store.delete(&key)?;
        store.delete(&voting_period_key(id))?;
        Ok(())
    }

    pub fn is_voting_period(&self, store: &dyn KvRead, id: u64) -> Result<bool, GovernanceError> {
        Ok(store.has(&voting_period_key(id))?)
    }

    /// Walk every proposal in ascending id order until `f` breaks.
    pub fn iterate(
        &self,
        store: &dyn KvRead,
        mut f: impl FnMut(Proposal) -> ControlFlow<()>,
    ) -> Result<(), GovernanceError> {
        let mut fault = None;
        store.iterate_prefix(&[PROPOSALS_PREFIX], &mut |_: &[u8], value: &[u8]| {
            match codec::decode_proposal(value) {
                Ok(proposal) => f(proposal),
                Err(e) => {
                    fault = Some(e);
                    ControlFlow::Break(())
                }
            }
        })?;
        match fault {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn all(&self, store: &dyn KvRead) -> Result<Vec<Proposal>, GovernanceError> {
        let mut proposals = Vec::new();
        self.iterate(store, |p| {
            proposals.push(p);
            ControlFlow::Continue(())
        })?;
        Ok(proposals)
    }

    /// Proposals matching `filter`, one page at a time.
    pub fn filtered(
        &self,
        store: &dyn KvRead,
        params: &GovParams,
        filter: &ProposalFilter,
        deposits: &dyn DepositIndex,
        votes: &dyn VoteIndex,
    ) -> Result<Vec<Proposal>, GovernanceError> {
        let mut matched = Vec::new();
        let mut failure: Option<CollaboratorError> = None;
        self.iterate(store, |p| match filter.matches(store, &p, deposits, votes) {
            Ok(true) => {
                matched.push(p);
                ControlFlow::Continue(())
            }
            Ok(false) => ControlFlow::Continue(()),
            Err(e) => {
                failure = Some(e);
                ControlFlow::Break(())
            }
        })?;
        if let Some(e) = failure {
            return Err(ConsistencyFault::Collaborator {
                collaborator: "proposal filter",
                reason: e.to_string(),
            }
            .into());
        }

        let page = paginate(
            matched.len(),
            filter.page,
            filter.limit,
            params.default_page_size,
            params.max_page_size,
        );
        Ok(match page {
            Some(range) => matched.drain(range).collect(),
            None => Vec::new(),
        })
    }
}

/// Query filter for [`ProposalStore::filtered`].
///
/// `page` is 1-based. A `limit` of zero means the default page size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub voter: Option<Address>,
    pub depositor: Option<Address>,
    pub page: u64,
    pub limit: u64,
}

impl Default for ProposalFilter {
    fn default() -> Self {
        Self {
            status: None,
            voter: None,
            depositor: None,
            page: 1,
            limit: 0,
        }
    }
}

impl ProposalFilter {
    fn matches(
        &self,
        store: &dyn KvRead,
        proposal: &Proposal,
        deposits: &dyn DepositIndex,
        votes: &dyn VoteIndex,
    ) -> Result<bool, CollaboratorError> {
        if let Some(status) = self.status {
            if proposal.status != status {
                return Ok(false);
            }
        }
        if let Some(depositor) = &self.depositor {
            if !deposits.has_deposit(store, proposal.id, depositor)? {
                return Ok(false);
            }
        }
        if let Some(voter) = &self.voter {
            if !votes.has_vote(store, proposal.id, voter)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Index range of `page` within `total` items, or `None` when the page is
/// out of range.
pub fn paginate(
    total: usize,
    page: u64,
    limit: u64,
    default_limit: u64,
    max_limit: u64,
) -> Option<Range<usize>> {
    if page == 0 {
        return None;
    }
    let limit = (if limit == 0 { default_limit } else { limit }).min(max_limit);
    if limit == 0 {
        return None;
    }
    let start = usize::try_from((page - 1).checked_mul(limit)?).ok()?;
    if start >= total {
        return None;
    }
    let end = start.saturating_add(usize::try_from(limit).ok()?).min(total);
    Some(start..end)
}
