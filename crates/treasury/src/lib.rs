//! Curation Treasury Module
//!
//! Token debit/credit capability consumed by the staking engine and the
//! per-allocation rebate pool that splits collected fees with the
//! Cobb-Douglas formula.

pub mod errors;
pub mod rebate_pool;
pub mod token_ledger;

pub use errors::{TreasuryError, TreasuryResult};
pub use rebate_pool::{RebateAccount, RebateClaim, RebateKey, RebatePool, RebatePoolStatistics};
pub use token_ledger::{InMemoryTokenLedger, LedgerCall, MockTokenLedger, TokenLedger};
