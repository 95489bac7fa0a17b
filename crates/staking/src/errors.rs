use curation_economics::MathError;
use curation_treasury::TreasuryError;
use curation_types::{AccountId, AllocationId, CurationId, Epoch, TokenAmount};
use thiserror::Error;

/// Errors surfaced by staking, governance, allocations and rebate settlement.
///
/// Every variant is a local validation failure. A failed operation leaves all
/// state untouched, so callers may correct the request and retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakingError {
    #[error("cannot stake zero tokens")]
    ZeroDeposit,

    #[error("cannot burn zero shares")]
    ZeroBurn,

    #[error("pool would hold {amount} tokens, below the minimum stake of {minimum}")]
    BelowMinimumStake {
        amount: TokenAmount,
        minimum: TokenAmount,
    },

    #[error("insufficient shares: requested {requested}, available {available}")]
    InsufficientShares {
        requested: TokenAmount,
        available: TokenAmount,
    },

    #[error("{0} is not initialized")]
    PoolNotInitialized(CurationId),

    #[error("invalid allocation: {0}")]
    InvalidAllocation(AllocationId),

    #[error("{allocation}: {reason}")]
    AllocationState {
        allocation: AllocationId,
        reason: String,
    },

    #[error("invalid parameter {param}={value}: {reason}")]
    InvalidParameter {
        param: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is not the governor")]
    Unauthorized(AccountId),

    #[error("slippage exceeded: expected at least {minimum}, got {actual}")]
    SlippageExceeded {
        minimum: TokenAmount,
        actual: TokenAmount,
    },

    #[error("nothing thawing for {delegator} in {curation}")]
    NothingThawing {
        curation: CurationId,
        delegator: AccountId,
    },

    #[error("tokens still thawing until epoch {unlock_epoch} (current epoch {current_epoch})")]
    StillThawing {
        unlock_epoch: Epoch,
        current_epoch: Epoch,
    },

    #[error("insufficient balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        requested: TokenAmount,
        available: TokenAmount,
    },

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Treasury(#[from] TreasuryError),
}

impl StakingError {
    pub(crate) fn invalid_parameter(
        param: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        StakingError::InvalidParameter {
            param,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StakingError>;
