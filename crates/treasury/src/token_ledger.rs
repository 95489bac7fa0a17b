//! Token ledger interface for staking custody
//!
//! Provides a lightweight, deterministic interface for moving, minting and
//! burning the staking token. The staking engine debits delegators into its
//! custody account, burns the staking tax and releases thawed tokens through
//! this trait; the real token contract lives outside this crate.

use crate::errors::{TreasuryError, TreasuryResult};
use curation_types::{AccountId, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interface for token ledger operations.
///
/// Every call either applies in full or fails without mutating; callers
/// sequence several calls and rely on a failed call leaving the ledger as
/// it was.
pub trait TokenLedger: Send + Sync {
    /// Balance held by `account`.
    fn balance_of(&self, account: &AccountId) -> TokenAmount;

    /// Create `amount` new tokens for `to`.
    fn mint(&mut self, to: &AccountId, amount: TokenAmount) -> TreasuryResult<()>;

    /// Move `amount` from `from` to `to`. Fails without mutating on short balance.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: TokenAmount)
        -> TreasuryResult<()>;

    /// Destroy `amount` held by `from`, reducing total supply.
    fn burn(&mut self, from: &AccountId, amount: TokenAmount) -> TreasuryResult<()>;

    /// Total circulating supply across all accounts.
    fn total_supply(&self) -> TokenAmount;

    /// Snapshot of every non-empty balance.
    fn balances(&self) -> HashMap<AccountId, TokenAmount>;
}

// -----------------------------------------------------------------------------
// In-memory implementation (for runtime embedding or testing)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryTokenLedger {
    balances: HashMap<AccountId, TokenAmount>,
    total_supply: TokenAmount,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            total_supply: 0,
        }
    }

    /// Ledger pre-funded with the given balances
    pub fn with_balances(initial: impl IntoIterator<Item = (AccountId, TokenAmount)>) -> Self {
        let mut ledger = Self::new();
        for (account, amount) in initial {
            let current = ledger.balances.entry(account).or_insert(0);
            *current = current.saturating_add(amount);
            ledger.total_supply = ledger.total_supply.saturating_add(amount);
        }
        ledger
    }

    fn debit(&mut self, account: &AccountId, amount: TokenAmount) -> TreasuryResult<()> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(TreasuryError::InsufficientBalance {
                account: *account,
                requested: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, remaining);
        }
        Ok(())
    }

    fn credit(&mut self, account: &AccountId, amount: TokenAmount) {
        if amount == 0 {
            return;
        }
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, account: &AccountId) -> TokenAmount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn mint(&mut self, to: &AccountId, amount: TokenAmount) -> TreasuryResult<()> {
        self.credit(to, amount);
        self.total_supply = self.total_supply.saturating_add(amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: TokenAmount,
    ) -> TreasuryResult<()> {
        self.debit(from, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    fn burn(&mut self, from: &AccountId, amount: TokenAmount) -> TreasuryResult<()> {
        self.debit(from, amount)?;
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }

    fn total_supply(&self) -> TokenAmount {
        self.total_supply
    }

    fn balances(&self) -> HashMap<AccountId, TokenAmount> {
        self.balances.clone()
    }
}

// -----------------------------------------------------------------------------
// Mock ledger (records every call for assertions)
// -----------------------------------------------------------------------------

/// A ledger operation recorded by [`MockTokenLedger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Mint(AccountId, TokenAmount),
    Transfer(AccountId, AccountId, TokenAmount),
    Burn(AccountId, TokenAmount),
}

#[derive(Debug, Clone, Default)]
pub struct MockTokenLedger {
    inner: InMemoryTokenLedger,
    calls: Vec<LedgerCall>,
}

impl MockTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(initial: impl IntoIterator<Item = (AccountId, TokenAmount)>) -> Self {
        Self {
            inner: InMemoryTokenLedger::with_balances(initial),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[LedgerCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl TokenLedger for MockTokenLedger {
    fn balance_of(&self, account: &AccountId) -> TokenAmount {
        self.inner.balance_of(account)
    }

    fn mint(&mut self, to: &AccountId, amount: TokenAmount) -> TreasuryResult<()> {
        self.calls.push(LedgerCall::Mint(*to, amount));
        self.inner.mint(to, amount)
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: TokenAmount,
    ) -> TreasuryResult<()> {
        self.calls.push(LedgerCall::Transfer(*from, *to, amount));
        self.inner.transfer(from, to, amount)
    }

    fn burn(&mut self, from: &AccountId, amount: TokenAmount) -> TreasuryResult<()> {
        self.calls.push(LedgerCall::Burn(*from, amount));
        self.inner.burn(from, amount)
    }

    fn total_supply(&self) -> TokenAmount {
        self.inner.total_supply()
    }

    fn balances(&self) -> HashMap<AccountId, TokenAmount> {
        self.inner.balances()
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_ledger_creation() {
        let ledger = InMemoryTokenLedger::new();
        assert_eq!(ledger.total_supply(), 0);
        assert!(ledger.balances().is_empty());
    }

    #[test]
    fn test_transfer_keeps_supply() {
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");
        let mut ledger = InMemoryTokenLedger::with_balances([(alice, 1_000)]);

        ledger.transfer(&alice, &bob, 300).unwrap();
        assert_eq!(ledger.balance_of(&alice), 700);
        assert_eq!(ledger.balance_of(&bob), 300);
        assert_eq!(ledger.total_supply(), 1_000);
    }

    #[test]
    fn test_burn_reduces_supply() {
        let alice = AccountId::from_label("alice");
        let mut ledger = InMemoryTokenLedger::new();
        ledger.mint(&alice, 1_000).unwrap();
        ledger.burn(&alice, 50).unwrap();
        assert_eq!(ledger.balance_of(&alice), 950);
        assert_eq!(ledger.total_supply(), 950);
    }

    #[test]
    fn test_insufficient_balance_leaves_state() {
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");
        let mut ledger = InMemoryTokenLedger::with_balances([(alice, 100)]);

        let err = ledger.transfer(&alice, &bob, 150).unwrap_err();
        assert_eq!(
            err,
            TreasuryError::InsufficientBalance {
                account: alice,
                requested: 150,
                available: 100
            }
        );
        assert_eq!(ledger.balance_of(&alice), 100);
        assert_eq!(ledger.balance_of(&bob), 0);
        assert!(ledger.burn(&bob, 1).is_err());
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn test_mock_ledger_calls() {
        let alice = AccountId::from_label("alice");
        let custody = AccountId::from_label("custody");
        let mut mock = MockTokenLedger::with_balances([(alice, 1_000)]);

        mock.transfer(&alice, &custody, 900).unwrap();
        mock.burn(&alice, 100).unwrap();

        assert_eq!(
            mock.calls(),
            &[
                LedgerCall::Transfer(alice, custody, 900),
                LedgerCall::Burn(alice, 100)
            ]
        );
        assert_eq!(mock.total_supply(), 900);
        mock.clear_calls();
        assert!(mock.calls().is_empty());
    }
}
