//! Shared fakes for the governance integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tessera_governance::{
    BlockContext, BlockReport, CollaboratorError, DepositIndex, DepositPolicy, GovHooks,
    GovParams, GovernanceEngine, GovernanceError, LegacyContent, MsgRouter, MsgSubmitProposal,
    Proposal, ProposalMsg, ProposalStatus, ProposalStore, RecordingEvents, RouteError,
    TallyHandler, TallyOutcome, TallyResult, VoteIndex, MSG_EXEC_LEGACY_CONTENT,
};
use tessera_nullables::{NullClock, NullKvStore};
use tessera_store::{KvRead, KvWrite};
use tessera_types::{Address, Coin, Coins};

pub const DENOM: &str = "utes";
pub const MSG_SEND: &str = "/tessera.bank.v1.MsgSend";
pub const TEXT_PROPOSAL: &str = "/tessera.gov.v1.TextProposal";
pub const PARAM_CHANGE: &str = "/tessera.params.v1.ParameterChange";
pub const GENESIS_TIME: u64 = 1_700_000_000;

pub fn coins(amount: u128) -> Coins {
    Coins::from_coins([Coin::new(DENOM, amount)]).unwrap()
}

pub fn gov() -> Address {
    Address::for_module("gov")
}

pub fn proposer() -> Address {
    Address::new([0xaa; 20])
}

/// Deposit 50s, voting 100s, min 1000, emergency 5000.
pub fn test_params() -> GovParams {
    GovParams {
        deposit_period_secs: 50,
        voting_period_secs: 100,
        max_metadata_len: 64,
        default_page_size: 10,
        max_page_size: 50,
        min_deposit: coins(1_000),
        emergency_min_deposit: coins(5_000),
    }
}

// ── Router ────────────────────────────────────────────────────────────

/// Routes the bank send message and legacy content; text proposals pass,
/// parameter changes need a non-empty value, everything else has no handler.
pub struct FakeRouter {
    routes: HashSet<String>,
}

impl FakeRouter {
    pub fn new() -> Self {
        Self {
            routes: [MSG_SEND, MSG_EXEC_LEGACY_CONTENT]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl MsgRouter for FakeRouter {
    fn has_route(&self, type_url: &str) -> bool {
        self.routes.contains(type_url)
    }

    fn execute_legacy_content(
        &self,
        store: &mut dyn KvWrite,
        content: &LegacyContent,
    ) -> Result<(), RouteError> {
        match content.content_type.as_str() {
            TEXT_PROPOSAL => Ok(()),
            PARAM_CHANGE if content.value.is_empty() => {
                Err(RouteError::Failed("empty parameter change".into()))
            }
            PARAM_CHANGE => store
                .set(b"\xffparam", &content.value)
                .map_err(|e| RouteError::Failed(e.to_string())),
            other => Err(RouteError::NoHandler(other.to_string())),
        }
    }
}

// ── Tally ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ScriptedTally {
    outcomes: Arc<Mutex<HashMap<u64, ProposalStatus>>>,
    calls: Arc<Mutex<Vec<u64>>>,
    fail: Arc<Mutex<bool>>,
}

impl ScriptedTally {
    pub fn set_outcome(&self, id: u64, status: ProposalStatus) {
        self.outcomes.lock().unwrap().insert(id, status);
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl TallyHandler for ScriptedTally {
    fn tally(&self, _store: &dyn KvRead, proposal: &Proposal) -> Result<TallyOutcome, CollaboratorError> {
        self.calls.lock().unwrap().push(proposal.id);
        if *self.fail.lock().unwrap() {
            return Err(CollaboratorError("tally store unavailable".into()));
        }
        let status = self
            .outcomes
            .lock()
            .unwrap()
            .get(&proposal.id)
            .copied()
            .unwrap_or(ProposalStatus::Passed);
        Ok(TallyOutcome {
            status,
            result: TallyResult {
                yes: 10,
                ..TallyResult::default()
            },
        })
    }
}

// ── Deposit policy & hooks ────────────────────────────────────────────

/// Records every trigger as `(trigger, proposal_id)`.
#[derive(Clone, Default)]
pub struct TriggerLog {
    log: Arc<Mutex<Vec<(&'static str, u64)>>>,
}

impl TriggerLog {
    pub fn entries(&self) -> Vec<(&'static str, u64)> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, trigger: &'static str, id: u64) {
        self.log.lock().unwrap().push((trigger, id));
    }
}

impl DepositPolicy for TriggerLog {
    fn on_deposit_period_expired(
        &self,
        _store: &mut dyn KvWrite,
        proposal: &Proposal,
    ) -> Result<(), CollaboratorError> {
        self.push("burn", proposal.id);
        Ok(())
    }

    fn on_proposal_finalized(
        &self,
        _store: &mut dyn KvWrite,
        proposal: &Proposal,
    ) -> Result<(), CollaboratorError> {
        self.push("refund", proposal.id);
        Ok(())
    }
}

impl GovHooks for TriggerLog {
    fn after_proposal_submission(
        &self,
        _store: &mut dyn KvWrite,
        proposal_id: u64,
    ) -> Result<(), CollaboratorError> {
        self.push("submitted", proposal_id);
        Ok(())
    }

    fn after_proposal_failed_min_deposit(
        &self,
        _store: &mut dyn KvWrite,
        proposal_id: u64,
    ) -> Result<(), CollaboratorError> {
        self.push("failed_min_deposit", proposal_id);
        Ok(())
    }

    fn after_proposal_voting_period_ended(
        &self,
        _store: &mut dyn KvWrite,
        proposal_id: u64,
    ) -> Result<(), CollaboratorError> {
        self.push("voting_ended", proposal_id);
        Ok(())
    }
}

// ── Deposit / vote records ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordIndex {
    deposits: HashSet<(u64, Address)>,
    votes: HashSet<(u64, Address)>,
}

impl RecordIndex {
    pub fn deposit(&mut self, id: u64, who: Address) {
        self.deposits.insert((id, who));
    }

    pub fn vote(&mut self, id: u64, who: Address) {
        self.votes.insert((id, who));
    }
}

impl DepositIndex for RecordIndex {
    fn has_deposit(&self, _store: &dyn KvRead, id: u64, depositor: &Address) -> Result<bool, CollaboratorError> {
        Ok(self.deposits.contains(&(id, *depositor)))
    }
}

impl VoteIndex for RecordIndex {
    fn has_vote(&self, _store: &dyn KvRead, id: u64, voter: &Address) -> Result<bool, CollaboratorError> {
        Ok(self.votes.contains(&(id, *voter)))
    }
}

// ── Harness ───────────────────────────────────────────────────────────

pub struct Harness {
    pub engine: GovernanceEngine,
    pub store: NullKvStore,
    pub clock: NullClock,
    pub events: RecordingEvents,
    pub tally: ScriptedTally,
    pub triggers: TriggerLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_params(test_params())
    }

    pub fn with_params(params: GovParams) -> Self {
        tessera_utils::init_test_logging();
        let events = RecordingEvents::new();
        let tally = ScriptedTally::default();
        let triggers = TriggerLog::default();
        let engine = GovernanceEngine::new(Box::new(FakeRouter::new()), Box::new(tally.clone()))
            .with_events(Box::new(events.clone()))
            .with_hooks(Box::new(triggers.clone()))
            .with_deposit_policy(Box::new(triggers.clone()));
        let mut store = NullKvStore::new();
        engine.init_genesis(&mut store, 1, &params).unwrap();
        Self {
            engine,
            store,
            clock: NullClock::new(GENESIS_TIME),
            events,
            tally,
            triggers,
        }
    }

    pub fn ctx(&self) -> BlockContext {
        BlockContext::new(self.clock.height(), self.clock.now())
    }

    pub fn submit(&mut self, msg: MsgSubmitProposal) -> Result<Proposal, GovernanceError> {
        let ctx = self.ctx();
        self.engine.submit_proposal(&mut self.store, &ctx, msg)
    }

    /// Submit a valid single-message proposal.
    pub fn submit_send(&mut self) -> Proposal {
        self.submit(submission(vec![send_msg()])).unwrap()
    }

    /// Credit a deposit the way the deposit module would.
    pub fn deposit(&mut self, id: u64, amount: u128) {
        let mut proposal = ProposalStore.require(&self.store, id).unwrap();
        proposal.total_deposit = proposal.total_deposit.checked_add(&coins(amount)).unwrap();
        ProposalStore.put(&mut self.store, &proposal).unwrap();
    }

    pub fn advance(&self, secs: u64) {
        self.clock.advance(secs);
    }

    pub fn end_block(&mut self) -> Result<BlockReport, GovernanceError> {
        let ctx = self.ctx();
        self.engine.end_block(&mut self.store, &ctx)
    }

    pub fn proposal(&self, id: u64) -> Option<Proposal> {
        self.engine.proposal(&self.store, id).unwrap()
    }
}

pub fn send_msg() -> ProposalMsg {
    ProposalMsg::new(MSG_SEND, gov(), vec![1, 2, 3])
}

pub fn legacy_msg(content_type: &str, value: Vec<u8>) -> ProposalMsg {
    ProposalMsg::exec_legacy_content(
        LegacyContent {
            content_type: content_type.to_string(),
            title: "Legacy".into(),
            description: "Legacy content proposal".into(),
            value,
        },
        gov(),
    )
}

pub fn submission(messages: Vec<ProposalMsg>) -> MsgSubmitProposal {
    MsgSubmitProposal {
        messages,
        metadata: "ipfs://meta".into(),
        title: "Fund the relay".into(),
        summary: "Pay relayers from the community pool".into(),
        proposer: proposer(),
    }
}
