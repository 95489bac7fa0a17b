//! Curation pool market
//!
//! A pool prices its shares on a constant reserve ratio bonding curve. An
//! empty pool is bootstrapped at one share per token for the first
//! `minimum_staking` tokens; anything deposited beyond that is priced on the
//! curve starting from that virtual pool.
//!
//! ## Key Invariants
//! - `total_shares == 0` if and only if `total_tokens == 0`
//! - Burning the last share releases the whole reserve

use crate::errors::{Result, StakingError};
use curation_economics::{purchase_return, sale_return, MathError};
use curation_types::{CurationId, TokenAmount};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurationPool {
    pub curation_id: CurationId,
    pub total_shares: TokenAmount,
    pub total_tokens: TokenAmount,
    /// Reserve ratio in ppm, fixed while the pool is initialized
    pub reserve_ratio: u32,
}

impl CurationPool {
    pub fn new(curation_id: CurationId, reserve_ratio: u32) -> Self {
        Self {
            curation_id,
            total_shares: 0,
            total_tokens: 0,
            reserve_ratio,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.total_shares > 0
    }

    /// Shares minted for a net deposit of `tokens`.
    ///
    /// Fails with `BelowMinimumStake` when the pool would end up holding less
    /// than `minimum_staking`.
    pub fn tokens_to_shares(
        &self,
        tokens: TokenAmount,
        minimum_staking: TokenAmount,
    ) -> Result<TokenAmount> {
        let after = self.total_tokens.saturating_add(tokens);
        if after < minimum_staking {
            return Err(StakingError::BelowMinimumStake {
                amount: after,
                minimum: minimum_staking,
            });
        }

        if self.is_initialized() {
            return Ok(purchase_return(
                self.total_shares,
                self.total_tokens,
                self.reserve_ratio,
                tokens,
            )?);
        }

        let bootstrap = minimum_staking;
        let rest = tokens - bootstrap;
        let minted = purchase_return(bootstrap, bootstrap, self.reserve_ratio, rest)?;
        Ok(bootstrap.saturating_add(minted))
    }

    /// Tokens released by burning `shares`
    pub fn shares_to_tokens(&self, shares: TokenAmount) -> Result<TokenAmount> {
        if !self.is_initialized() {
            return Err(StakingError::PoolNotInitialized(self.curation_id));
        }
        if shares > self.total_shares {
            return Err(StakingError::InsufficientShares {
                requested: shares,
                available: self.total_shares,
            });
        }
        let tokens = sale_return(self.total_shares, self.total_tokens, self.reserve_ratio, shares)?;
        if shares < self.total_shares && tokens >= self.total_tokens {
            // shares left outstanding must keep some reserve behind them
            return Ok(self.total_tokens - 1);
        }
        Ok(tokens)
    }

    pub fn mint(&mut self, tokens: TokenAmount, shares: TokenAmount) -> Result<()> {
        let total_tokens = self
            .total_tokens
            .checked_add(tokens)
            .ok_or(MathError::Overflow("pool tokens"))?;
        let total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(MathError::Overflow("pool shares"))?;
        self.total_tokens = total_tokens;
        self.total_shares = total_shares;
        Ok(())
    }

    pub fn burn(&mut self, shares: TokenAmount, tokens: TokenAmount) -> Result<()> {
        if shares > self.total_shares {
            return Err(StakingError::InsufficientShares {
                requested: shares,
                available: self.total_shares,
            });
        }
        if tokens > self.total_tokens {
            return Err(MathError::Domain("burn larger than reserve").into());
        }
        self.total_shares -= shares;
        self.total_tokens = if self.total_shares == 0 {
            0
        } else {
            self.total_tokens - tokens
        };
        Ok(())
    }
}
