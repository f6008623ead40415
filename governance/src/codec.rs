//! Binary encoding of stored records.
//!
//! Records are bincode. A record that was written by this crate and then
//! fails to decode means the store is corrupt, so decode errors are faults.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ConsistencyFault;
use crate::params::GovParams;
use crate::proposal::Proposal;

pub fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<Vec<u8>, ConsistencyFault> {
    bincode::serialize(value).map_err(|e| ConsistencyFault::Encode {
        what,
        reason: e.to_string(),
    })
}

pub fn decode<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> Result<T, ConsistencyFault> {
    bincode::deserialize(bytes).map_err(|e| ConsistencyFault::Decode {
        what,
        reason: e.to_string(),
    })
}

pub fn encode_proposal(proposal: &Proposal) -> Result<Vec<u8>, ConsistencyFault> {
    encode("proposal", proposal)
}

pub fn decode_proposal(bytes: &[u8]) -> Result<Proposal, ConsistencyFault> {
    decode("proposal", bytes)
}

pub fn encode_params(params: &GovParams) -> Result<Vec<u8>, ConsistencyFault> {
    encode("params", params)
}

pub fn decode_params(bytes: &[u8]) -> Result<GovParams, ConsistencyFault> {
    decode("params", bytes)
}
