//! On-chain governance proposal lifecycle.
//!
//! Proposals are admitted into a deposit period, move into a time-boxed
//! voting period once their deposit meets the minimum (or are dropped when
//! the deposit deadline passes), and are finalized by a tally when voting
//! ends. Deposits above a second threshold fast-track a proposal into the
//! emergency set.
//!
//! All state lives in a key-ordered byte store passed into each call. Two
//! time-ordered queues (deposit deadlines and voting deadlines) let the
//! per-block sweeps find due proposals with a single range scan.

pub mod admission;
pub mod codec;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod invariants;
pub mod keys;
pub mod params;
pub mod proposal;
pub mod queue;
pub mod sequence;
pub mod store;

pub use admission::{AdmissionGate, MsgRouter, MsgSubmitProposal, RouteError};
pub use collaborators::{
    CollaboratorError, DepositIndex, DepositPolicy, GovHooks, NoHooks, RetainDeposits,
    TallyHandler, TallyOutcome, VoteIndex,
};
pub use config::GovConfig;
pub use engine::{BlockContext, BlockReport, GovernanceEngine, SweepReport, GOV_MODULE_NAME};
pub use error::{ConsistencyFault, GovernanceError};
pub use events::{EventBus, EventError, EventSink, GovEvent, NullEvents, RecordingEvents};
pub use params::GovParams;
pub use proposal::{
    LegacyContent, MsgBody, Proposal, ProposalMsg, ProposalStatus, TallyResult,
    MSG_EXEC_LEGACY_CONTENT,
};
pub use queue::{EmergencySet, QueueEntry, QueueKind, TimeQueue};
pub use sequence::ProposalSequence;
pub use store::{paginate, ProposalFilter, ProposalStore};
