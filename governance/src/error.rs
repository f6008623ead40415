use thiserror::Error;

use tessera_store::StoreError;
use tessera_types::Timestamp;

use crate::proposal::ProposalStatus;

/// Conditions that mean stored state has diverged or is corrupt.
///
/// Any fault aborts the enclosing unit of work: the block (or submission) is
/// discarded as a whole and never partially applied.
#[derive(Debug, Error)]
pub enum ConsistencyFault {
    #[error("proposal id sequence has not been initialized")]
    UninitializedSequence,

    #[error("proposal id sequence is already seeded (next id {0})")]
    SequenceAlreadySeeded(u64),

    #[error("governance params have not been initialized")]
    MissingParams,

    #[error("proposal {0} is referenced but missing from the store")]
    MissingProposal(u64),

    #[error("{queue} queue entry ({time}, {id}) disagrees with stored proposal: {reason}")]
    QueueDivergence {
        queue: &'static str,
        time: Timestamp,
        id: u64,
        reason: String,
    },

    #[error("failed to decode stored {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("{collaborator} failed: {reason}")]
    Collaborator {
        collaborator: &'static str,
        reason: String,
    },

    #[error("invariant violated: {0}")]
    Invariant(String),
}

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("{field} too long: {len} bytes exceeds maximum of {max}")]
    MetadataTooLong {
        field: &'static str,
        len: usize,
        max: u64,
    },

    #[error("invalid proposal message: {0}")]
    InvalidProposalMessage(String),

    #[error("invalid signer: {0}")]
    InvalidSigner(String),

    #[error("unroutable proposal message: {0}")]
    UnroutableProposalMessage(String),

    #[error("invalid proposal content: {0}")]
    InvalidProposalContent(String),

    #[error("no handler exists for proposal content type {0}")]
    NoProposalHandler(String),

    #[error("proposal {0} not found")]
    ProposalNotFound(u64),

    #[error("{queue} queue has no entry ({time}, {id})")]
    QueueEntryNotFound {
        queue: &'static str,
        time: Timestamp,
        id: u64,
    },

    #[error("proposal {id} is {actual}, expected {expected}")]
    WrongStatus {
        id: u64,
        expected: ProposalStatus,
        actual: ProposalStatus,
    },

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("consistency fault: {0}")]
    Fatal(#[from] ConsistencyFault),
}

impl From<StoreError> for GovernanceError {
    fn from(e: StoreError) -> Self {
        GovernanceError::Fatal(ConsistencyFault::Store(e))
    }
}

impl GovernanceError {
    /// Whether this error must abort the enclosing block.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GovernanceError::Fatal(_))
    }

    /// Whether this is a submission rejection (no state was touched).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GovernanceError::MetadataTooLong { .. }
                | GovernanceError::InvalidProposalMessage(_)
                | GovernanceError::InvalidSigner(_)
                | GovernanceError::UnroutableProposalMessage(_)
                | GovernanceError::InvalidProposalContent(_)
                | GovernanceError::NoProposalHandler(_)
        )
    }

    /// Promote a lookup miss to a fault.
    ///
    /// Inside a sweep or a deletion, every proposal and queue entry touched
    /// was located through another index, so a miss means the indices have
    /// diverged.
    pub fn escalate(self) -> Self {
        match self {
            GovernanceError::ProposalNotFound(id) => ConsistencyFault::MissingProposal(id).into(),
            GovernanceError::QueueEntryNotFound { queue, time, id } => {
                ConsistencyFault::QueueDivergence {
                    queue,
                    time,
                    id,
                    reason: "entry is missing".to_string(),
                }
                .into()
            }
            other => other,
        }
    }
}
