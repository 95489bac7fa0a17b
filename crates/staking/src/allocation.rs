//! Allocations against curation pools
//!
//! An allocation ties a fee stream to one curation pool for a bounded number
//! of epochs. Rebates for it may be claimed once it has been closed for the
//! channel dispute period.

use crate::errors::{Result, StakingError};
use curation_types::{AccountId, AllocationId, CurationId, Epoch};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub curation_id: CurationId,
    pub owner: AccountId,
    pub created_at_epoch: Epoch,
    pub closed_at_epoch: Option<Epoch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStatus {
    Active,
    Closed,
    Claimable,
}

impl Allocation {
    pub fn is_closed(&self) -> bool {
        self.closed_at_epoch.is_some()
    }

    /// Closed for at least `dispute_epochs`
    pub fn is_claimable(&self, current_epoch: Epoch, dispute_epochs: Epoch) -> bool {
        self.closed_at_epoch
            .is_some_and(|closed| current_epoch >= closed.saturating_add(dispute_epochs))
    }

    pub fn status(&self, current_epoch: Epoch, dispute_epochs: Epoch) -> AllocationStatus {
        if self.is_claimable(current_epoch, dispute_epochs) {
            AllocationStatus::Claimable
        } else if self.is_closed() {
            AllocationStatus::Closed
        } else {
            AllocationStatus::Active
        }
    }
}

/// Resolves allocation ids for fee collection and rebate claims
pub trait AllocationRegistry: Send + Sync {
    fn resolve(&self, id: AllocationId) -> Option<Allocation>;
}

#[derive(Debug, Default)]
pub struct AllocationBook {
    allocations: RwLock<HashMap<AllocationId, Allocation>>,
}

impl AllocationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &self,
        id: AllocationId,
        curation_id: CurationId,
        owner: AccountId,
        current_epoch: Epoch,
    ) -> Result<Allocation> {
        if id.is_null() {
            return Err(StakingError::InvalidAllocation(id));
        }
        let mut allocations = self.allocations.write();
        if allocations.contains_key(&id) {
            return Err(StakingError::AllocationState {
                allocation: id,
                reason: "already exists".to_string(),
            });
        }
        let allocation = Allocation {
            id,
            curation_id,
            owner,
            created_at_epoch: current_epoch,
            closed_at_epoch: None,
        };
        allocations.insert(id, allocation.clone());
        debug!(target: "staking", "Opened {} on {} at epoch {}", id, curation_id, current_epoch);
        Ok(allocation)
    }

    /// Close an allocation. The owner may close it from the epoch after
    /// creation; anyone else only once it has run past
    /// `max_allocation_epochs`.
    pub fn close(
        &self,
        id: AllocationId,
        caller: &AccountId,
        current_epoch: Epoch,
        max_allocation_epochs: Epoch,
    ) -> Result<Allocation> {
        let mut allocations = self.allocations.write();
        let allocation = allocations
            .get_mut(&id)
            .ok_or(StakingError::InvalidAllocation(id))?;
        if allocation.is_closed() {
            return Err(StakingError::AllocationState {
                allocation: id,
                reason: "already closed".to_string(),
            });
        }
        let epochs = current_epoch.saturating_sub(allocation.created_at_epoch);
        if epochs == 0 {
            return Err(StakingError::AllocationState {
                allocation: id,
                reason: "cannot close in the epoch it was opened".to_string(),
            });
        }
        if allocation.owner != *caller && epochs <= max_allocation_epochs {
            return Err(StakingError::Unauthorized(*caller));
        }
        allocation.closed_at_epoch = Some(current_epoch);
        debug!(target: "staking", "Closed {} after {} epochs", id, epochs);
        Ok(allocation.clone())
    }

    pub fn len(&self) -> usize {
        self.allocations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.read().is_empty()
    }
}

impl AllocationRegistry for AllocationBook {
    fn resolve(&self, id: AllocationId) -> Option<Allocation> {
        self.allocations.read().get(&id).cloned()
    }
}
