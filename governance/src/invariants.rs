//! Whole-store consistency audit.
//!
//! Walks every proposal and every index and reports the first place where
//! status, deadlines and queue membership disagree. Meant for tests, genesis
//! export and operator tooling; block processing never calls it.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

use tessera_store::KvRead;

use crate::error::{ConsistencyFault, GovernanceError};
use crate::keys::{self, VOTING_PERIOD_PREFIX};
use crate::proposal::{Proposal, ProposalStatus};
use crate::queue::{EmergencySet, QueueEntry, QueueKind, TimeQueue};
use crate::sequence::ProposalSequence;
use crate::store::ProposalStore;

pub fn check(store: &dyn KvRead) -> Result<(), GovernanceError> {
    let next_id = ProposalSequence.peek(store)?;
    let proposals: BTreeMap<u64, Proposal> = ProposalStore
        .all(store)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let inactive: BTreeSet<QueueEntry> = TimeQueue::inactive().entries(store)?.into_iter().collect();
    let active: BTreeSet<QueueEntry> = TimeQueue::active().entries(store)?.into_iter().collect();
    let emergency: BTreeSet<u64> = EmergencySet.ids(store)?.into_iter().collect();
    let markers = voting_markers(store)?;

    for proposal in proposals.values() {
        check_proposal(proposal, next_id, &inactive, &active)?;
        let marked = markers.contains(&proposal.id);
        if marked != (proposal.status == ProposalStatus::VotingPeriod) {
            return Err(violation(format!(
                "proposal {} is {} but voting marker present = {marked}",
                proposal.id, proposal.status
            )));
        }
    }

    for entry in &inactive {
        check_entry(&proposals, QueueKind::Inactive, entry)?;
    }
    for entry in &active {
        check_entry(&proposals, QueueKind::Active, entry)?;
    }

    for id in &emergency {
        let proposal = proposals
            .get(id)
            .ok_or(ConsistencyFault::MissingProposal(*id))?;
        if proposal.status != ProposalStatus::VotingPeriod {
            return Err(violation(format!(
                "proposal {id} is in the emergency set while {}",
                proposal.status
            )));
        }
    }
    for id in &markers {
        if !proposals.contains_key(id) {
            return Err(ConsistencyFault::MissingProposal(*id).into());
        }
    }
    Ok(())
}

fn check_proposal(
    proposal: &Proposal,
    next_id: u64,
    inactive: &BTreeSet<QueueEntry>,
    active: &BTreeSet<QueueEntry>,
) -> Result<(), GovernanceError> {
    let id = proposal.id;
    if id >= next_id {
        return Err(violation(format!("proposal {id} is not below next id {next_id}")));
    }

    let voting_times = (proposal.voting_start_time, proposal.voting_end_time);
    match (proposal.status, voting_times) {
        (ProposalStatus::DepositPeriod, (None, None)) => {}
        (ProposalStatus::DepositPeriod, _) => {
            return Err(violation(format!("proposal {id} has voting times during its deposit period")))
        }
        (_, (Some(start), Some(end))) if start <= end => {}
        (status, _) => {
            return Err(violation(format!(
                "proposal {id} is {status} with voting times {voting_times:?}"
            )))
        }
    }

    match proposal.status {
        ProposalStatus::DepositPeriod => {
            let entry = QueueEntry {
                time: proposal.deposit_end_time,
                proposal_id: id,
            };
            if !inactive.contains(&entry) {
                return Err(missing_entry(QueueKind::Inactive, entry));
            }
        }
        ProposalStatus::VotingPeriod => {
            if let Some(end) = proposal.voting_end_time {
                let entry = QueueEntry {
                    time: end,
                    proposal_id: id,
                };
                if !active.contains(&entry) {
                    return Err(missing_entry(QueueKind::Active, entry));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// A queue entry must point at a proposal in the matching status with the
/// matching stored deadline.
fn check_entry(
    proposals: &BTreeMap<u64, Proposal>,
    kind: QueueKind,
    entry: &QueueEntry,
) -> Result<(), GovernanceError> {
    let proposal = proposals
        .get(&entry.proposal_id)
        .ok_or(ConsistencyFault::MissingProposal(entry.proposal_id))?;
    let agrees = match kind {
        QueueKind::Inactive => {
            proposal.status == ProposalStatus::DepositPeriod
                && proposal.deposit_end_time == entry.time
        }
        QueueKind::Active => {
            proposal.status == ProposalStatus::VotingPeriod
                && proposal.voting_end_time == Some(entry.time)
        }
    };
    if agrees {
        return Ok(());
    }
    Err(ConsistencyFault::QueueDivergence {
        queue: kind.name(),
        time: entry.time,
        id: entry.proposal_id,
        reason: format!("proposal is {}", proposal.status),
    }
    .into())
}

fn voting_markers(store: &dyn KvRead) -> Result<BTreeSet<u64>, GovernanceError> {
    let mut ids = BTreeSet::new();
    let mut malformed = false;
    store.iterate_prefix(&[VOTING_PERIOD_PREFIX], &mut |key: &[u8], _: &[u8]| match keys::split_id_key(key) {
        Some(id) => {
            ids.insert(id);
            ControlFlow::Continue(())
        }
        None => {
            malformed = true;
            ControlFlow::Break(())
        }
    })?;
    if malformed {
        return Err(ConsistencyFault::Decode {
            what: "voting period marker",
            reason: "malformed key".to_string(),
        }
        .into());
    }
    Ok(ids)
}

fn missing_entry(kind: QueueKind, entry: QueueEntry) -> GovernanceError {
    ConsistencyFault::QueueDivergence {
        queue: kind.name(),
        time: entry.time,
        id: entry.proposal_id,
        reason: "proposal is not queued".to_string(),
    }
    .into()
}

fn violation(reason: String) -> GovernanceError {
    ConsistencyFault::Invariant(reason).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_nullables::NullKvStore;
    use tessera_store::KvWrite;
    use tessera_types::{Address, Timestamp};

    fn seeded() -> NullKvStore {
        let mut kv = NullKvStore::new();
        ProposalSequence.seed(&mut kv, 1).unwrap();
        kv
    }

    fn deposit_period(kv: &mut NullKvStore) -> Proposal {
        let id = ProposalSequence.next(kv).unwrap();
        let p = Proposal::new(
            id,
            vec![],
            Timestamp::new(0),
            Timestamp::new(50),
            String::new(),
            "t".into(),
            "s".into(),
            Address::new([3; 20]),
        );
        ProposalStore.put(kv, &p).unwrap();
        TimeQueue::inactive().insert(kv, p.deposit_end_time, id).unwrap();
        p
    }

    #[test]
    fn consistent_store_passes() {
        let mut kv = seeded();
        deposit_period(&mut kv);
        check(&kv).unwrap();
    }

    #[test]
    fn unqueued_deposit_period_is_reported() {
        let mut kv = seeded();
        let p = deposit_period(&mut kv);
        TimeQueue::inactive()
            .remove(&mut kv, p.deposit_end_time, p.id)
            .unwrap();
        assert!(matches!(
            check(&kv),
            Err(GovernanceError::Fatal(ConsistencyFault::QueueDivergence { queue: "inactive", .. }))
        ));
    }

    #[test]
    fn stale_active_entry_is_reported() {
        let mut kv = seeded();
        let p = deposit_period(&mut kv);
        TimeQueue::active().insert(&mut kv, Timestamp::new(90), p.id).unwrap();
        assert!(check(&kv).unwrap_err().is_fatal());
    }

    #[test]
    fn orphan_marker_is_reported() {
        let mut kv = seeded();
        kv.set(&keys::voting_period_key(7), &[1]).unwrap();
        assert!(matches!(
            check(&kv),
            Err(GovernanceError::Fatal(ConsistencyFault::MissingProposal(7)))
        ));
    }

    #[test]
    fn emergency_member_must_be_voting() {
        let mut kv = seeded();
        let p = deposit_period(&mut kv);
        EmergencySet.insert(&mut kv, p.id).unwrap();
        assert!(matches!(
            check(&kv),
            Err(GovernanceError::Fatal(ConsistencyFault::Invariant(_)))
        ));
    }
}
