//! Store key layout.
//!
//! All integers are big-endian so lexicographic key order equals numeric
//! order. Queue keys are `prefix | time | id`, which makes "everything due by
//! `t`" a single range scan.

use tessera_types::Timestamp;

pub const PROPOSALS_PREFIX: u8 = 0x00;
pub const ACTIVE_QUEUE_PREFIX: u8 = 0x01;
pub const INACTIVE_QUEUE_PREFIX: u8 = 0x02;
pub const PROPOSAL_ID_KEY: &[u8] = &[0x03];
pub const VOTING_PERIOD_PREFIX: u8 = 0x04;
pub const EMERGENCY_PREFIX: u8 = 0x05;
pub const PARAMS_KEY: &[u8] = &[0x30];

pub const ID_KEY_LEN: usize = 9;
pub const QUEUE_KEY_LEN: usize = 17;

fn id_key(prefix: u8, id: u64) -> [u8; ID_KEY_LEN] {
    let mut key = [0u8; ID_KEY_LEN];
    key[0] = prefix;
    key[1..].copy_from_slice(&id.to_be_bytes());
    key
}

pub fn proposal_key(id: u64) -> [u8; ID_KEY_LEN] {
    id_key(PROPOSALS_PREFIX, id)
}

pub fn voting_period_key(id: u64) -> [u8; ID_KEY_LEN] {
    id_key(VOTING_PERIOD_PREFIX, id)
}

pub fn emergency_key(id: u64) -> [u8; ID_KEY_LEN] {
    id_key(EMERGENCY_PREFIX, id)
}

pub fn queue_key(prefix: u8, time: Timestamp, id: u64) -> [u8; QUEUE_KEY_LEN] {
    let mut key = [0u8; QUEUE_KEY_LEN];
    key[0] = prefix;
    key[1..9].copy_from_slice(&time.to_be_bytes());
    key[9..].copy_from_slice(&id.to_be_bytes());
    key
}

/// Inclusive upper bound covering every entry due at or before `time`.
pub fn queue_due_bound(prefix: u8, time: Timestamp) -> [u8; QUEUE_KEY_LEN] {
    queue_key(prefix, time, u64::MAX)
}

/// Split a queue key back into `(time, id)`. `None` if the key is malformed.
pub fn split_queue_key(key: &[u8]) -> Option<(Timestamp, u64)> {
    if key.len() != QUEUE_KEY_LEN {
        return None;
    }
    let time = Timestamp::from_be_bytes(key[1..9].try_into().ok()?);
    let id = u64::from_be_bytes(key[9..].try_into().ok()?);
    Some((time, id))
}

/// The id suffix of a `prefix | id` key.
pub fn split_id_key(key: &[u8]) -> Option<u64> {
    if key.len() != ID_KEY_LEN {
        return None;
    }
    Some(u64::from_be_bytes(key[1..].try_into().ok()?))
}

pub fn encode_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn decode_id(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}
