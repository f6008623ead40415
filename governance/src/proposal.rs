//! Governance proposals and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use tessera_types::{Address, Coins, Timestamp};

/// Type url of the message that wraps a legacy content proposal.
pub const MSG_EXEC_LEGACY_CONTENT: &str = "/tessera.gov.v1.MsgExecLegacyContent";

pub const MAX_LEGACY_TITLE_LEN: usize = 140;
pub const MAX_LEGACY_DESCRIPTION_LEN: usize = 10_000;

/// Where a proposal is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Collecting deposits until the minimum is met or the deadline passes.
    DepositPeriod,
    /// Open for votes until `voting_end_time`.
    VotingPeriod,
    Passed,
    Rejected,
    /// Passed, but executing its messages failed.
    Failed,
    /// Removed from history by an external pruning policy.
    Pruned,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            ProposalStatus::DepositPeriod | ProposalStatus::VotingPeriod
        )
    }

    /// Statuses a tally is allowed to produce.
    pub fn is_tally_outcome(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Passed | ProposalStatus::Rejected | ProposalStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::DepositPeriod => "deposit_period",
            ProposalStatus::VotingPeriod => "voting_period",
            ProposalStatus::Passed => "passed",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Failed => "failed",
            ProposalStatus::Pruned => "pruned",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-message-era proposal content, executed through a legacy handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyContent {
    /// Routing key for the legacy handler, e.g. `"/tessera.params.v1.ParameterChange"`.
    pub content_type: String,
    pub title: String,
    pub description: String,
    pub value: Vec<u8>,
}

impl LegacyContent {
    pub fn validate_basic(&self) -> Result<(), String> {
        if self.content_type.is_empty() {
            return Err("legacy content type cannot be empty".into());
        }
        if self.title.trim().is_empty() {
            return Err("proposal title cannot be blank".into());
        }
        if self.title.len() > MAX_LEGACY_TITLE_LEN {
            return Err(format!(
                "proposal title is longer than max length of {MAX_LEGACY_TITLE_LEN}"
            ));
        }
        if self.description.trim().is_empty() {
            return Err("proposal description cannot be blank".into());
        }
        if self.description.len() > MAX_LEGACY_DESCRIPTION_LEN {
            return Err(format!(
                "proposal description is longer than max length of {MAX_LEGACY_DESCRIPTION_LEN}"
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgBody {
    ExecLegacyContent(LegacyContent),
    /// Encoded body of any other message; only its router understands it.
    Opaque(Vec<u8>),
}

/// One governance action embedded in a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMsg {
    pub type_url: String,
    pub signers: Vec<Address>,
    pub body: MsgBody,
}

impl ProposalMsg {
    pub fn new(type_url: impl Into<String>, signer: Address, body: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            signers: vec![signer],
            body: MsgBody::Opaque(body),
        }
    }

    pub fn exec_legacy_content(content: LegacyContent, authority: Address) -> Self {
        Self {
            type_url: MSG_EXEC_LEGACY_CONTENT.to_string(),
            signers: vec![authority],
            body: MsgBody::ExecLegacyContent(content),
        }
    }

    pub fn legacy_content(&self) -> Option<&LegacyContent> {
        match &self.body {
            MsgBody::ExecLegacyContent(content) => Some(content),
            MsgBody::Opaque(_) => None,
        }
    }

    /// Stateless checks on the message shape.
    pub fn validate_basic(&self) -> Result<(), String> {
        if !self.type_url.starts_with('/') || self.type_url.len() < 2 {
            return Err(format!("malformed type url {:?}", self.type_url));
        }
        if self.type_url.chars().any(char::is_whitespace) {
            return Err(format!("type url {:?} contains whitespace", self.type_url));
        }
        match &self.body {
            MsgBody::ExecLegacyContent(content) => {
                if self.type_url != MSG_EXEC_LEGACY_CONTENT {
                    return Err(format!(
                        "legacy content carried by {}, expected {MSG_EXEC_LEGACY_CONTENT}",
                        self.type_url
                    ));
                }
                content.validate_basic()
            }
            MsgBody::Opaque(_) if self.type_url == MSG_EXEC_LEGACY_CONTENT => {
                Err("legacy content message has no content".into())
            }
            MsgBody::Opaque(_) => Ok(()),
        }
    }
}

/// Final vote counts, filled in by the tally collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub yes: u128,
    pub abstain: u128,
    pub no: u128,
    pub no_with_veto: u128,
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    /// Immutable after submission.
    pub messages: Vec<ProposalMsg>,
    pub status: ProposalStatus,
    pub final_tally_result: Option<TallyResult>,
    pub submit_time: Timestamp,
    /// Kept after voting starts so the original deadline stays auditable.
    pub deposit_end_time: Timestamp,
    pub total_deposit: Coins,
    pub voting_start_time: Option<Timestamp>,
    pub voting_end_time: Option<Timestamp>,
    pub metadata: String,
    pub title: String,
    pub summary: String,
    pub proposer: Address,
}

impl Proposal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        messages: Vec<ProposalMsg>,
        submit_time: Timestamp,
        deposit_end_time: Timestamp,
        metadata: String,
        title: String,
        summary: String,
        proposer: Address,
    ) -> Self {
        Self {
            id,
            messages,
            status: ProposalStatus::DepositPeriod,
            final_tally_result: None,
            submit_time,
            deposit_end_time,
            total_deposit: Coins::new(),
            voting_start_time: None,
            voting_end_time: None,
            metadata,
            title,
            summary,
            proposer,
        }
    }

    pub fn message_type_urls(&self) -> Vec<String> {
        self.messages.iter().map(|m| m.type_url.clone()).collect()
    }
}
