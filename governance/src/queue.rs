//! Time-ordered proposal queues.
//!
//! The inactive queue holds `(deposit_end_time, id)` for every proposal in
//! its deposit period, the active queue `(voting_end_time, id)` for every
//! proposal being voted on. Entries are keys with a marker value, so finding
//! what is due is one ordered range scan.

use std::ops::{Bound, ControlFlow};

use tessera_store::{KvRead, KvWrite};
use tessera_types::Timestamp;

use crate::error::{ConsistencyFault, GovernanceError};
use crate::keys::{
    self, decode_id, encode_id, emergency_key, queue_key, ACTIVE_QUEUE_PREFIX, EMERGENCY_PREFIX,
    INACTIVE_QUEUE_PREFIX,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Keyed by deposit deadline.
    Inactive,
    /// Keyed by voting deadline.
    Active,
}

impl QueueKind {
    pub fn name(self) -> &'static str {
        match self {
            QueueKind::Inactive => "inactive",
            QueueKind::Active => "active",
        }
    }

    fn prefix(self) -> u8 {
        match self {
            QueueKind::Inactive => INACTIVE_QUEUE_PREFIX,
            QueueKind::Active => ACTIVE_QUEUE_PREFIX,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueEntry {
    pub time: Timestamp,
    pub proposal_id: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct TimeQueue {
    kind: QueueKind,
}

impl TimeQueue {
    pub const fn inactive() -> Self {
        Self {
            kind: QueueKind::Inactive,
        }
    }

    pub const fn active() -> Self {
        Self {
            kind: QueueKind::Active,
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn insert(
        &self,
        store: &mut dyn KvWrite,
        time: Timestamp,
        id: u64,
    ) -> Result<(), GovernanceError> {
        store.set(&queue_key(self.kind.prefix(), time, id), &encode_id(id))?;
        Ok(())
    }

    pub fn contains(
        &self,
        store: &dyn KvRead,
        time: Timestamp,
        id: u64,
    ) -> Result<bool, GovernanceError> {
        Ok(store.has(&queue_key(self.kind.prefix(), time, id))?)
    }

    /// Remove the exact `(time, id)` pair; fails if it is not queued.
    pub fn remove(
        &self,
        store: &mut dyn KvWrite,
        time: Timestamp,
        id: u64,
    ) -> Result<(), GovernanceError> {
        let key = queue_key(self.kind.prefix(), time, id);
        if !store.has(&key)? {
            return Err(GovernanceError::QueueEntryNotFound {
                queue: self.kind.name(),
                time,
                id,
            });
        }
        store.delete(&key)?;
        Ok(())
    }

    /// Walk entries due at or before `at`, in `(time, id)` order.
    pub fn iterate_due(
        &self,
        store: &dyn KvRead,
        at: Timestamp,
        mut f: impl FnMut(QueueEntry) -> ControlFlow<()>,
    ) -> Result<(), GovernanceError> {
        let lower = [self.kind.prefix()];
        let upper = keys::queue_due_bound(self.kind.prefix(), at);
        self.walk(
            store,
            Bound::Included(&lower[..]),
            Bound::Included(&upper[..]),
            &mut f,
        )
    }

    /// Every entry due at or before `at`, in `(time, id)` order.
    pub fn due(&self, store: &dyn KvRead, at: Timestamp) -> Result<Vec<QueueEntry>, GovernanceError> {
        let mut entries = Vec::new();
        self.iterate_due(store, at, |entry| {
            entries.push(entry);
            ControlFlow::Continue(())
        })?;
        Ok(entries)
    }

    /// Every queued entry, regardless of deadline.
    pub fn entries(&self, store: &dyn KvRead) -> Result<Vec<QueueEntry>, GovernanceError> {
        self.due(store, Timestamp::new(u64::MAX))
    }

    fn walk(
        &self,
        store: &dyn KvRead,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        f: &mut dyn FnMut(QueueEntry) -> ControlFlow<()>,
    ) -> Result<(), GovernanceError> {
        let mut fault = None;
        store.iterate(lower, upper, &mut |key: &[u8], value: &[u8]| {
            match decode_entry(self.kind, key, value) {
                Ok(entry) => f(entry),
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
}

fn decode_entry(kind: QueueKind, key: &[u8], value: &[u8]) -> Result<QueueEntry, ConsistencyFault> {
    let (time, proposal_id) = keys::split_queue_key(key).ok_or_else(|| ConsistencyFault::Decode {
        what: "queue key",
        reason: format!("{} queue key has length {}", kind.name(), key.len()),
    })?;
    if decode_id(value) != Some(proposal_id) {
        return Err(ConsistencyFault::QueueDivergence {
            queue: kind.name(),
            time,
            id: proposal_id,
            reason: "entry value does not carry its proposal id".to_string(),
        });
    }
    Ok(QueueEntry { time, proposal_id })
}

/// Ids of activated proposals that crossed the emergency deposit threshold.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmergencySet;

impl EmergencySet {
    pub fn insert(&self, store: &mut dyn KvWrite, id: u64) -> Result<(), GovernanceError> {
        store.set(&emergency_key(id), &encode_id(id))?;
        Ok(())
    }

    pub fn contains(&self, store: &dyn KvRead, id: u64) -> Result<bool, GovernanceError> {
        Ok(store.has(&emergency_key(id))?)
    }

    /// Remove `id` if present; returns whether it was a member.
    pub fn remove(&self, store: &mut dyn KvWrite, id: u64) -> Result<bool, GovernanceError> {
        let key = emergency_key(id);
        if !store.has(&key)? {
            return Ok(false);
        }
        store.delete(&key)?;
        Ok(true)
    }

    /// Member ids in ascending order.
    pub fn ids(&self, store: &dyn KvRead) -> Result<Vec<u64>, GovernanceError> {
        let mut ids = Vec::new();
        let mut fault = None;
        store.iterate_prefix(&[EMERGENCY_PREFIX], &mut |key: &[u8], _: &[u8]| match keys::split_id_key(key) {
            Some(id) => {
                ids.push(id);
                ControlFlow::Continue(())
            }
            None => {
                fault = Some(ConsistencyFault::Decode {
                    what: "emergency key",
                    reason: format!("key has length {}", key.len()),
                });
                ControlFlow::Break(())
            }
        })?;
        match fault {
            Some(e) => Err(e.into()),
            None => Ok(ids),
        }
    }
}
