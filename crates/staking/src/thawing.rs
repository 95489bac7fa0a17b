//! Thaw locks on unstaked tokens
//!
//! One request per `(delegator, curation)`. A further unstake folds into the
//! outstanding request and restarts its thawing period.

use crate::errors::{Result, StakingError};
use curation_economics::MathError;
use curation_types::{AccountId, CurationId, Epoch, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThawingRequest {
    pub shares: TokenAmount,
    pub tokens: TokenAmount,
    pub unlock_epoch: Epoch,
}

impl ThawingRequest {
    pub fn is_unlocked(&self, current_epoch: Epoch) -> bool {
        current_epoch >= self.unlock_epoch
    }
}

#[derive(Debug, Default)]
pub struct ThawingLedger {
    requests: HashMap<(AccountId, CurationId), ThawingRequest>,
}

impl ThawingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The request `lock` would record, without recording it
    fn preview(
        &self,
        delegator: &AccountId,
        curation: CurationId,
        shares: TokenAmount,
        tokens: TokenAmount,
        current_epoch: Epoch,
        thawing_period: Epoch,
    ) -> Result<ThawingRequest> {
        let prior = self.requests.get(&(*delegator, curation));
        let shares = prior
            .map_or(Some(shares), |r| r.shares.checked_add(shares))
            .ok_or(MathError::Overflow("thawing shares"))?;
        let tokens = prior
            .map_or(Some(tokens), |r| r.tokens.checked_add(tokens))
            .ok_or(MathError::Overflow("thawing tokens"))?;
        let unlock_epoch = current_epoch
            .checked_add(thawing_period)
            .ok_or(MathError::Overflow("unlock epoch"))?;
        Ok(ThawingRequest {
            shares,
            tokens,
            unlock_epoch,
        })
    }

    /// Lock `tokens` until `current_epoch + thawing_period`
    pub fn lock(
        &mut self,
        delegator: &AccountId,
        curation: CurationId,
        shares: TokenAmount,
        tokens: TokenAmount,
        current_epoch: Epoch,
        thawing_period: Epoch,
    ) -> Result<ThawingRequest> {
        let request =
            self.preview(delegator, curation, shares, tokens, current_epoch, thawing_period)?;
        self.requests.insert((*delegator, curation), request);
        Ok(request)
    }

    pub fn get(&self, delegator: &AccountId, curation: CurationId) -> Option<ThawingRequest> {
        self.requests.get(&(*delegator, curation)).copied()
    }

    /// The request if it can be released at `current_epoch`
    pub fn releasable(
        &self,
        delegator: &AccountId,
        curation: CurationId,
        current_epoch: Epoch,
    ) -> Result<ThawingRequest> {
        let request = self
            .get(delegator, curation)
            .ok_or(StakingError::NothingThawing {
                curation,
                delegator: *delegator,
            })?;
        if !request.is_unlocked(current_epoch) {
            return Err(StakingError::StillThawing {
                unlock_epoch: request.unlock_epoch,
                current_epoch,
            });
        }
        Ok(request)
    }

    pub fn remove(&mut self, delegator: &AccountId, curation: CurationId) -> Option<ThawingRequest> {
        self.requests.remove(&(*delegator, curation))
    }

    /// Tokens locked across every request
    pub fn total_locked(&self) -> TokenAmount {
        self.requests
            .values()
            .fold(0, |acc: TokenAmount, r| acc.saturating_add(r.tokens))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_sets_unlock_epoch() {
        let alice = AccountId::from_label("alice");
        let mut ledger = ThawingLedger::new();
        let request = ledger.lock(&alice, CurationId(1), 10, 100, 5, 28).unwrap();
        assert_eq!(request.unlock_epoch, 33);
        assert_eq!(ledger.get(&alice, CurationId(1)), Some(request));
    }

    #[test]
    fn test_repeated_locks_accumulate_and_restart() {
        let alice = AccountId::from_label("alice");
        let mut ledger = ThawingLedger::new();
        ledger.lock(&alice, CurationId(1), 10, 100, 5, 28).unwrap();
        let request = ledger.lock(&alice, CurationId(1), 4, 30, 9, 28).unwrap();
        assert_eq!(
            request,
            ThawingRequest {
                shares: 14,
                tokens: 130,
                unlock_epoch: 37
            }
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.total_locked(), 130);
    }

    #[test]
    fn test_keys_are_independent() {
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");
        let mut ledger = ThawingLedger::new();
        ledger.lock(&alice, CurationId(1), 1, 1, 0, 1).unwrap();
        ledger.lock(&alice, CurationId(2), 2, 2, 0, 1).unwrap();
        ledger.lock(&bob, CurationId(1), 3, 3, 0, 1).unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get(&bob, CurationId(1)).unwrap().tokens, 3);
    }

    #[test]
    fn test_releasable() {
        let alice = AccountId::from_label("alice");
        let mut ledger = ThawingLedger::new();
        assert!(matches!(
            ledger.releasable(&alice, CurationId(1), 0),
            Err(StakingError::NothingThawing { .. })
        ));

        ledger.lock(&alice, CurationId(1), 1, 50, 10, 5).unwrap();
        assert_eq!(
            ledger.releasable(&alice, CurationId(1), 14),
            Err(StakingError::StillThawing {
                unlock_epoch: 15,
                current_epoch: 14
            })
        );
        assert_eq!(ledger.releasable(&alice, CurationId(1), 15).unwrap().tokens, 50);
        assert!(ledger.remove(&alice, CurationId(1)).is_some());
        assert!(ledger.is_empty());
    }
}
