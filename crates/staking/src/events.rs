//! Protocol events
//!
//! Every committed state transition appends one event to the shared
//! [`EventLog`] and mirrors it to `tracing` under the target of the
//! subsystem that produced it.

use curation_types::{AccountId, AllocationId, CurationId, Currency, Epoch, TokenAmount};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProtocolEvent {
    Staked {
        delegator: AccountId,
        curation: CurationId,
        tokens: TokenAmount,
        shares: TokenAmount,
        tax: TokenAmount,
        timestamp: u64,
    },
    UnstakeLocked {
        delegator: AccountId,
        curation: CurationId,
        shares: TokenAmount,
        tokens: TokenAmount,
        unlock_epoch: Epoch,
        timestamp: u64,
    },
    Withdrawn {
        delegator: AccountId,
        curation: CurationId,
        tokens: TokenAmount,
        timestamp: u64,
    },
    FeesCollected {
        allocation: AllocationId,
        curation: CurationId,
        currency: Currency,
        amount: TokenAmount,
        stake_weight: TokenAmount,
        timestamp: u64,
    },
    RebateClaimed {
        allocation: AllocationId,
        currency: Currency,
        amount: TokenAmount,
        timestamp: u64,
    },
    AllocationOpened {
        allocation: AllocationId,
        curation: CurationId,
        owner: AccountId,
        epoch: Epoch,
    },
    AllocationClosed {
        allocation: AllocationId,
        closed_by: AccountId,
        epoch: Epoch,
    },
    ParameterUpdated {
        param: String,
        value: String,
    },
}

impl ProtocolEvent {
    /// Log target of the subsystem that emits this event
    pub fn target(&self) -> &'static str {
        match self {
            ProtocolEvent::Staked { .. }
            | ProtocolEvent::UnstakeLocked { .. }
            | ProtocolEvent::Withdrawn { .. }
            | ProtocolEvent::AllocationOpened { .. }
            | ProtocolEvent::AllocationClosed { .. } => "staking",
            ProtocolEvent::FeesCollected { .. } | ProtocolEvent::RebateClaimed { .. } => "rebates",
            ProtocolEvent::ParameterUpdated { .. } => "governance",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProtocolEvent::Staked { .. } => "staked",
            ProtocolEvent::UnstakeLocked { .. } => "unstake_locked",
            ProtocolEvent::Withdrawn { .. } => "withdrawn",
            ProtocolEvent::FeesCollected { .. } => "fees_collected",
            ProtocolEvent::RebateClaimed { .. } => "rebate_claimed",
            ProtocolEvent::AllocationOpened { .. } => "allocation_opened",
            ProtocolEvent::AllocationClosed { .. } => "allocation_closed",
            ProtocolEvent::ParameterUpdated { .. } => "parameter_updated",
        }
    }
}

/// Append-only event sink shared by the engine, the governance store and the
/// protocol facade.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ProtocolEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProtocolEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        match event.target() {
            "rebates" => info!(target: "rebates", event = event.name(), %payload),
            "governance" => info!(target: "governance", event = event.name(), %payload),
            _ => info!(target: "staking", event = event.name(), %payload),
        }
        self.events.lock().push(event);
    }

    /// Copy of every event emitted so far
    pub fn snapshot(&self) -> Vec<ProtocolEvent> {
        self.events.lock().clone()
    }

    /// Take every event emitted so far, leaving the log empty
    pub fn drain(&self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
