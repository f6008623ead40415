//! Proposal id allocation.

use tessera_store::{KvRead, KvWrite};

use crate::error::{ConsistencyFault, GovernanceError};
use crate::keys::{decode_id, encode_id, PROPOSAL_ID_KEY};

/// Handle over the stored "next proposal id" counter.
///
/// Ids are never reused: the counter only moves forward, even when the
/// proposal holding an id is later deleted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProposalSequence;

impl ProposalSequence {
    /// The id the next proposal will receive.
    pub fn peek(&self, store: &dyn KvRead) -> Result<u64, GovernanceError> {
        let bytes = store
            .get(PROPOSAL_ID_KEY)?
            .ok_or(ConsistencyFault::UninitializedSequence)?;
        decode_id(&bytes).ok_or_else(|| {
            ConsistencyFault::Decode {
                what: "proposal id",
                reason: format!("expected 8 bytes, found {}", bytes.len()),
            }
            .into()
        })
    }

    /// Allocate an id and advance the counter.
    pub fn next(&self, store: &mut dyn KvWrite) -> Result<u64, GovernanceError> {
        let id = self.peek(store.as_read())?;
        let following = id.checked_add(1).ok_or_else(|| {
            ConsistencyFault::Invariant("proposal id sequence exhausted".to_string())
        })?;
        store.set(PROPOSAL_ID_KEY, &encode_id(following))?;
        Ok(id)
    }

    pub fn is_seeded(&self, store: &dyn KvRead) -> Result<bool, GovernanceError> {
        Ok(store.has(PROPOSAL_ID_KEY)?)
    }

    /// Set the starting id. Only valid once, at genesis.
    pub fn seed(&self, store: &mut dyn KvWrite, start: u64) -> Result<(), GovernanceError> {
        if self.is_seeded(store.as_read())? {
            let current = self.peek(store.as_read())?;
            return Err(ConsistencyFault::SequenceAlreadySeeded(current).into());
        }
        store.set(PROPOSAL_ID_KEY, &encode_id(start))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_nullables::NullKvStore;

    #[test]
    fn peek_before_seed_is_fatal() {
        let kv = NullKvStore::new();
        let err = ProposalSequence.peek(&kv).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::Fatal(ConsistencyFault::UninitializedSequence)
        ));
    }

    #[test]
    fn next_returns_counter_and_advances() {
        let mut kv = NullKvStore::new();
        let seq = ProposalSequence;
        seq.seed(&mut kv, 1).unwrap();
        assert_eq!(seq.next(&mut kv).unwrap(), 1);
        assert_eq!(seq.next(&mut kv).unwrap(), 2);
        assert_eq!(seq.peek(&kv).unwrap(), 3);
    }

    #[test]
    fn seeding_twice_is_rejected() {
        let mut kv = NullKvStore::new();
        ProposalSequence.seed(&mut kv, 5).unwrap();
        let err = ProposalSequence.seed(&mut kv, 1).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::Fatal(ConsistencyFault::SequenceAlreadySeeded(5))
        ));
    }

    #[test]
    fn exhausted_sequence_does_not_wrap() {
        let mut kv = NullKvStore::new();
        ProposalSequence.seed(&mut kv, u64::MAX).unwrap();
        assert!(ProposalSequence.next(&mut kv).unwrap_err().is_fatal());
        assert_eq!(ProposalSequence.peek(&kv).unwrap(), u64::MAX);
    }
}
