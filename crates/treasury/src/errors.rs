use curation_economics::MathError;
use curation_types::{AccountId, AllocationId, TokenAmount};
use thiserror::Error;

/// Errors raised by the token ledger and the rebate pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreasuryError {
    #[error("insufficient balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        requested: TokenAmount,
        available: TokenAmount,
    },

    #[error("invalid allocation: {0}")]
    InvalidAllocation(AllocationId),

    #[error("claim stake {stake}/{total_stake} does not fit the collection snapshot {snapshot}")]
    StakeMismatch {
        stake: TokenAmount,
        total_stake: TokenAmount,
        snapshot: TokenAmount,
    },

    #[error("rebate math failed: {0}")]
    Math(#[from] MathError),
}

pub type TreasuryResult<T> = std::result::Result<T, TreasuryError>;
