//! Admission checks for incoming proposals.
//!
//! Nothing here writes to the store. Legacy content is dry-run against a
//! throwaway overlay that is dropped when the check returns.

use thiserror::Error;

use tessera_store::{CacheKv, KvRead, KvWrite};
use tessera_types::Address;

use crate::error::GovernanceError;
use crate::params::GovParams;
use crate::proposal::{LegacyContent, ProposalMsg};

/// A proposal submission as received from a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgSubmitProposal {
    pub messages: Vec<ProposalMsg>,
    pub metadata: String,
    pub title: String,
    pub summary: String,
    pub proposer: Address,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no handler exists for proposal content type {0}")]
    NoHandler(String),

    #[error("{0}")]
    Failed(String),
}

/// The message dispatch table, as far as admission needs it.
pub trait MsgRouter {
    fn has_route(&self, type_url: &str) -> bool;

    /// Run legacy content against `store`. Writes are discarded by the caller.
    fn execute_legacy_content(
        &self,
        store: &mut dyn KvWrite,
        content: &LegacyContent,
    ) -> Result<(), RouteError>;
}

pub struct AdmissionGate {
    authority: Address,
    router: Box<dyn MsgRouter>,
}

impl AdmissionGate {
    pub fn new(authority: Address, router: Box<dyn MsgRouter>) -> Self {
        Self { authority, router }
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    /// Run every admission check, in order, stopping at the first failure.
    pub fn validate(
        &self,
        store: &dyn KvRead,
        params: &GovParams,
        msg: &MsgSubmitProposal,
    ) -> Result<(), GovernanceError> {
        check_len("metadata", &msg.metadata, params.max_metadata_len)?;
        check_len("summary", &msg.summary, params.max_metadata_len)?;
        check_len("title", &msg.title, params.max_metadata_len)?;
        for proposal_msg in &msg.messages {
            self.validate_message(store, proposal_msg)?;
        }
        Ok(())
    }

    fn validate_message(&self, store: &dyn KvRead, msg: &ProposalMsg) -> Result<(), GovernanceError> {
        msg.validate_basic()
            .map_err(GovernanceError::InvalidProposalMessage)?;

        let signer = match msg.signers.as_slice() {
            [signer] => signer,
            signers => {
                return Err(GovernanceError::InvalidSigner(format!(
                    "expected one signer for {}, found {}",
                    msg.type_url,
                    signers.len()
                )))
            }
        };
        if *signer != self.authority {
            return Err(GovernanceError::InvalidSigner(format!(
                "expected {} got {signer}",
                self.authority
            )));
        }

        if !self.router.has_route(&msg.type_url) {
            return Err(GovernanceError::UnroutableProposalMessage(msg.type_url.clone()));
        }

        if let Some(content) = msg.legacy_content() {
            let mut scratch = CacheKv::new(store);
            match self.router.execute_legacy_content(&mut scratch, content) {
                Ok(()) => {}
                Err(RouteError::NoHandler(kind)) => {
                    return Err(GovernanceError::NoProposalHandler(kind))
                }
                Err(RouteError::Failed(reason)) => {
                    return Err(GovernanceError::InvalidProposalContent(reason))
                }
            }
            tracing::trace!(content_type = %content.content_type, "legacy content dry run passed");
        }
        Ok(())
    }
}

fn check_len(field: &'static str, value: &str, max: u64) -> Result<(), GovernanceError> {
    let len = value.len();
    if len as u64 > max {
        return Err(GovernanceError::MetadataTooLong { field, len, max });
    }
    Ok(())
}
