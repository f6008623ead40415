mod common;

use common::*;
use proptest::prelude::*;

use tessera_governance::{GovernanceError, ProposalStatus, QueueEntry, TimeQueue};
use tessera_nullables::NullKvStore;
use tessera_types::Timestamp;

#[derive(Clone, Debug)]
enum Op {
    Submit,
    /// Deposit into the n-th proposal ever submitted (if it still exists).
    Deposit(usize, u128),
    Advance(u64),
    EndBlock,
    Activate(usize),
    Outcome(usize, ProposalStatus),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Submit),
        3 => (0usize..16, 1u128..6_000).prop_map(|(i, a)| Op::Deposit(i, a)),
        2 => (1u64..80).prop_map(Op::Advance),
        3 => Just(Op::EndBlock),
        1 => (0usize..16).prop_map(Op::Activate),
        1 => (
            0usize..16,
            prop_oneof![
                Just(ProposalStatus::Passed),
                Just(ProposalStatus::Rejected),
                Just(ProposalStatus::Failed)
            ]
        )
            .prop_map(|(i, s)| Op::Outcome(i, s)),
    ]
}

fn run(ops: &[Op]) -> (Harness, Vec<u64>) {
    let mut h = Harness::new();
    let mut submitted = Vec::new();
    for op in ops {
        match op {
            Op::Submit => submitted.push(h.submit_send().id),
            Op::Deposit(i, amount) => {
                if let Some(&id) = submitted.get(*i) {
                    let open = h
                        .proposal(id)
                        .is_some_and(|p| p.status == ProposalStatus::DepositPeriod);
                    if open {
                        h.deposit(id, *amount);
                    }
                }
            }
            Op::Advance(secs) => h.advance(*secs),
            Op::EndBlock => {
                h.end_block().unwrap();
            }
            Op::Activate(i) => {
                if let Some(&id) = submitted.get(*i) {
                    let ctx = h.ctx();
                    match h.engine.try_activate(&mut h.store, &ctx, id) {
                        Ok(_)
                        | Err(GovernanceError::WrongStatus { .. })
                        | Err(GovernanceError::ProposalNotFound(_)) => {}
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            }
            Op::Outcome(i, status) => {
                if let Some(&id) = submitted.get(*i) {
                    h.tally.set_outcome(id, *status);
                }
            }
        }
    }
    (h, submitted)
}

proptest! {
    #[test]
    fn ids_are_dense_and_increasing(ops in prop::collection::vec(op(), 0..60)) {
        let (h, submitted) = run(&ops);
        let expected: Vec<u64> = (1..=submitted.len() as u64).collect();
        prop_assert_eq!(&submitted, &expected);
        prop_assert_eq!(
            h.engine.next_proposal_id(&h.store).unwrap(),
            submitted.len() as u64 + 1
        );
    }

    #[test]
    fn status_always_matches_queue_membership(ops in prop::collection::vec(op(), 0..60)) {
        let (h, _) = run(&ops);
        h.engine.check_invariants(&h.store).unwrap();

        let inactive = TimeQueue::inactive().entries(&h.store).unwrap();
        let active = TimeQueue::active().entries(&h.store).unwrap();
        for p in h.engine.proposals(&h.store).unwrap() {
            let in_inactive = inactive.iter().any(|e| e.proposal_id == p.id);
            let in_active = active.iter().any(|e| e.proposal_id == p.id);
            prop_assert_eq!(in_inactive, p.status == ProposalStatus::DepositPeriod);
            prop_assert_eq!(in_active, p.status == ProposalStatus::VotingPeriod);
            prop_assert!(!(in_inactive && in_active));
        }
    }

    #[test]
    fn tally_runs_once_per_finalized_proposal(ops in prop::collection::vec(op(), 0..60)) {
        let (h, _) = run(&ops);
        let mut calls = h.tally.calls();
        let total = calls.len();
        calls.sort_unstable();
        calls.dedup();
        prop_assert_eq!(calls.len(), total);
        for id in calls {
            let p = h.proposal(id).unwrap();
            prop_assert!(p.status.is_tally_outcome());
        }
    }

    #[test]
    fn due_returns_exactly_entries_at_or_before(
        entries in prop::collection::btree_set((0u64..1_000, 0u64..50), 0..40),
        at in 0u64..1_100,
    ) {
        let mut kv = NullKvStore::new();
        let queue = TimeQueue::active();
        for &(time, id) in &entries {
            queue.insert(&mut kv, Timestamp::new(time), id).unwrap();
        }

        let due = queue.due(&kv, Timestamp::new(at)).unwrap();
        let expected: Vec<QueueEntry> = entries
            .iter()
            .filter(|(time, _)| *time <= at)
            .map(|&(time, id)| QueueEntry { time: Timestamp::new(time), proposal_id: id })
            .collect();
        prop_assert_eq!(due, expected);
    }

    #[test]
    fn second_removal_is_not_found(time in any::<u64>(), id in any::<u64>()) {
        let mut kv = NullKvStore::new();
        let queue = TimeQueue::inactive();
        queue.insert(&mut kv, Timestamp::new(time), id).unwrap();
        queue.remove(&mut kv, Timestamp::new(time), id).unwrap();
        let second = queue.remove(&mut kv, Timestamp::new(time), id);
        let is_not_found = matches!(second, Err(GovernanceError::QueueEntryNotFound { .. }));
        prop_assert!(is_not_found);
        prop_assert!(kv.is_empty());
    }

    #[test]
    fn emergency_needs_the_full_threshold(deposit in 1_000u128..10_000) {
        let mut h = Harness::new();
        let p = h.submit_send();
        h.deposit(p.id, deposit);
        h.advance(50);
        let report = h.end_block().unwrap();
        prop_assert_eq!(report.deposit.activated, vec![p.id]);
        prop_assert_eq!(!report.deposit.emergency.is_empty(), deposit >= 5_000);
    }
}
