//! Rebate Pool Module
//!
//! Accumulates fees collected against allocations, per currency, and pays
//! them back out with the Cobb-Douglas split. Every `(allocation, currency)`
//! account sits behind its own mutex so collections and claims on different
//! accounts never contend.
//!
//! ## Key Invariants
//! - `fees_collected` only grows through `collect` and only shrinks through `claim`
//! - A claim never pays more than the account's unclaimed `fees_collected`
//! - `total_claimed + fees_collected == total_collected`
//! - Claims are weighted against the latest `stake_at_collection`

use crate::errors::{TreasuryError, TreasuryResult};
use curation_economics::{cobb_douglas, RebateRatio};
use curation_types::{AllocationId, Currency, TokenAmount};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Rebate account key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RebateKey {
    pub allocation_id: AllocationId,
    pub currency: Currency,
}

impl RebateKey {
    pub fn new(allocation_id: AllocationId, currency: &Currency) -> Self {
        Self {
            allocation_id,
            currency: currency.clone(),
        }
    }
}

/// Fee accounting for one allocation in one currency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateAccount {
    /// Unclaimed fees
    pub fees_collected: TokenAmount,
    /// Fees ever collected
    pub total_collected: TokenAmount,
    /// Fees ever paid out
    pub total_claimed: TokenAmount,
    /// Pool stake weight at the most recent collection
    pub stake_at_collection: TokenAmount,
    pub collections: u64,
    pub claims: u64,
}

/// Claimant's position in the Cobb-Douglas split.
///
/// `total_stake` must equal the account's `stake_at_collection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateClaim {
    pub fees: TokenAmount,
    pub total_fees: TokenAmount,
    pub stake: TokenAmount,
    pub total_stake: TokenAmount,
}

/// Summary statistics about the rebate pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebatePoolStatistics {
    pub accounts: usize,
    pub allocations: usize,
    pub total_collected: TokenAmount,
    pub total_claimed: TokenAmount,
    pub outstanding: TokenAmount,
}

/// Per `(allocation, currency)` fee ledger
#[derive(Debug, Default)]
pub struct RebatePool {
    accounts: RwLock<HashMap<RebateKey, Arc<Mutex<RebateAccount>>>>,
}

impl RebatePool {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, key: &RebateKey) -> Option<Arc<Mutex<RebateAccount>>> {
        self.accounts.read().get(key).cloned()
    }

    fn entry(&self, key: &RebateKey) -> Arc<Mutex<RebateAccount>> {
        if let Some(account) = self.existing(key) {
            return account;
        }
        self.accounts
            .write()
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Add `fee_amount` to the account and record `stake_weight` as its
    /// latest stake snapshot. Returns the account after the update.
    pub fn collect(
        &self,
        allocation_id: AllocationId,
        currency: &Currency,
        fee_amount: TokenAmount,
        stake_weight: TokenAmount,
    ) -> TreasuryResult<RebateAccount> {
        if allocation_id.is_null() {
            return Err(TreasuryError::InvalidAllocation(allocation_id));
        }
        let key = RebateKey::new(allocation_id, currency);
        if fee_amount == 0 {
            debug!(target: "rebates", "{} {}: No fees to collect", allocation_id, currency);
            return Ok(self.account(allocation_id, currency).unwrap_or_default());
        }

        let handle = self.entry(&key);
        let mut account = handle.lock();
        account.fees_collected = account.fees_collected.saturating_add(fee_amount);
        account.total_collected = account.total_collected.saturating_add(fee_amount);
        account.stake_at_collection = stake_weight;
        account.collections += 1;

        debug!(
            target: "rebates",
            "{} {}: Collected {} (unclaimed {}, stake snapshot {})",
            allocation_id,
            currency,
            fee_amount,
            account.fees_collected,
            stake_weight
        );

        Ok(account.clone())
    }

    /// Pay out the Cobb-Douglas share of the account's lifetime fees,
    /// capped at what is still unclaimed. The stake side is measured against
    /// the snapshot taken at the latest collection.
    pub fn claim(
        &self,
        allocation_id: AllocationId,
        currency: &Currency,
        claim: &RebateClaim,
        ratio: RebateRatio,
    ) -> TreasuryResult<TokenAmount> {
        if allocation_id.is_null() {
            return Err(TreasuryError::InvalidAllocation(allocation_id));
        }
        let key = RebateKey::new(allocation_id, currency);
        let Some(handle) = self.existing(&key) else {
            debug!(target: "rebates", "{} {}: Nothing collected, nothing to claim", allocation_id, currency);
            return Ok(0);
        };

        let mut account = handle.lock();
        let snapshot = account.stake_at_collection;
        if claim.total_stake != snapshot || claim.stake > snapshot {
            return Err(TreasuryError::StakeMismatch {
                stake: claim.stake,
                total_stake: claim.total_stake,
                snapshot,
            });
        }
        let formula = cobb_douglas(
            account.total_collected,
            claim.fees,
            claim.total_fees,
            claim.stake,
            claim.total_stake,
            ratio,
        )?;
        let reward = formula.min(account.fees_collected);

        account.fees_collected -= reward;
        account.total_claimed = account.total_claimed.saturating_add(reward);
        account.claims += 1;

        if reward < formula {
            debug!(
                target: "rebates",
                "{} {}: Claim capped from {} to {}",
                allocation_id,
                currency,
                formula,
                reward
            );
        }
        debug!(
            target: "rebates",
            "{} {}: Claimed {} (α={}, unclaimed {})",
            allocation_id,
            currency,
            reward,
            ratio,
            account.fees_collected
        );

        Ok(reward)
    }

    /// Snapshot of one account
    pub fn account(&self, allocation_id: AllocationId, currency: &Currency) -> Option<RebateAccount> {
        self.existing(&RebateKey::new(allocation_id, currency))
            .map(|handle| handle.lock().clone())
    }

    /// Fees still unclaimed in one account
    pub fn unclaimed(&self, allocation_id: AllocationId, currency: &Currency) -> TokenAmount {
        self.account(allocation_id, currency)
            .map(|account| account.fees_collected)
            .unwrap_or(0)
    }

    /// Get statistics about the rebate pool
    pub fn statistics(&self) -> RebatePoolStatistics {
        let accounts = self.accounts.read();
        let mut stats = RebatePoolStatistics {
            accounts: accounts.len(),
            ..Default::default()
        };
        let mut allocations = HashSet::new();
        for (key, handle) in accounts.iter() {
            let account = handle.lock();
            allocations.insert(key.allocation_id);
            stats.total_collected = stats.total_collected.saturating_add(account.total_collected);
            stats.total_claimed = stats.total_claimed.saturating_add(account.total_claimed);
            stats.outstanding = stats.outstanding.saturating_add(account.fees_collected);
        }
        stats.allocations = allocations.len();
        stats
    }
}
