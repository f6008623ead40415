//! Events emitted by lifecycle transitions.
//!
//! Events are buffered while a unit of work runs and only published once the
//! engine's unit has been applied to the caller's store. A failed unit
//! publishes nothing. When that store is itself a pending transaction (an
//! LMDB `WriteBatch`), the host still owns the commit: aborting the batch
//! afterwards does not recall events already published.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use tessera_types::Timestamp;

use crate::proposal::ProposalStatus;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GovEvent {
    /// A proposal was admitted.
    SubmitProposal {
        proposal_id: u64,
        /// Type urls of the embedded messages, in order.
        messages: Vec<String>,
    },
    ProposalActivated {
        proposal_id: u64,
        voting_end_time: Timestamp,
    },
    /// An activated proposal met the emergency deposit threshold.
    EmergencyProposal { proposal_id: u64 },
    /// The deposit period ended below the minimum and the proposal was deleted.
    InactiveProposalDropped { proposal_id: u64 },
    ActiveProposalFinalized {
        proposal_id: u64,
        status: ProposalStatus,
    },
}

impl GovEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GovEvent::SubmitProposal { .. } => "submit_proposal",
            GovEvent::ProposalActivated { .. } => "proposal_activated",
            GovEvent::EmergencyProposal { .. } => "emergency_proposal",
            GovEvent::InactiveProposalDropped { .. } => "inactive_proposal",
            GovEvent::ActiveProposalFinalized { .. } => "active_proposal",
        }
    }

    pub fn proposal_id(&self) -> u64 {
        match self {
            GovEvent::SubmitProposal { proposal_id, .. }
            | GovEvent::ProposalActivated { proposal_id, .. }
            | GovEvent::EmergencyProposal { proposal_id }
            | GovEvent::InactiveProposalDropped { proposal_id }
            | GovEvent::ActiveProposalFinalized { proposal_id, .. } => *proposal_id,
        }
    }

    /// Flat key/value form for sinks that index events.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![("proposal_id", self.proposal_id().to_string())];
        match self {
            GovEvent::SubmitProposal { messages, .. } => {
                attrs.push(("proposal_messages", messages.join(",")));
            }
            GovEvent::ProposalActivated {
                voting_end_time, ..
            } => {
                attrs.push(("voting_end_time", voting_end_time.as_secs().to_string()));
            }
            GovEvent::ActiveProposalFinalized { status, .. } => {
                attrs.push(("proposal_result", status.to_string()));
            }
            GovEvent::EmergencyProposal { .. } => {}
            GovEvent::InactiveProposalDropped { .. } => {
                attrs.push(("proposal_result", "proposal_dropped".to_string()));
            }
        }
        attrs
    }
}

#[derive(Debug, Error)]
#[error("failed to emit {kind} event: {reason}")]
pub struct EventError {
    pub kind: &'static str,
    pub reason: String,
}

/// Receives published events. A failing sink never affects state.
pub trait EventSink {
    fn emit(&self, event: &GovEvent) -> Result<(), EventError>;
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEvents;

impl EventSink for NullEvents {
    fn emit(&self, _event: &GovEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the publishing thread; keep handlers fast
/// to avoid stalling block processing.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&GovEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&GovEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &GovEvent) -> Result<(), EventError> {
        for listener in &self.listeners {
            listener(event);
        }
        Ok(())
    }
}

/// Keeps every published event. Clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingEvents {
    log: Arc<Mutex<Vec<GovEvent>>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GovEvent> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(GovEvent::kind).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: &GovEvent) -> Result<(), EventError> {
        let mut log = self.log.lock().map_err(|_| EventError {
            kind: event.kind(),
            reason: "event log poisoned".to_string(),
        })?;
        log.push(event.clone());
        Ok(())
    }
}
