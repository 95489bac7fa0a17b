//! Staking Pool Engine
//!
//! Orchestrates stake, unstake and withdrawal against the curation pools,
//! the thawing ledger and the token ledger.
//!
//! ## Flow
//! 1. `stake` taxes the deposit, burns the tax, moves the net deposit into
//!    custody and mints shares on the pool's bonding curve
//! 2. `unstake` burns shares at once and locks the released tokens until
//!    `current_epoch + thawing_period`
//! 3. `withdraw` hands unlocked tokens back out of custody
//!
//! Each pool has its own mutex. Locks are always taken in the order pool,
//! thawing ledger, token ledger. Every operation validates all of its inputs
//! before the first mutation.

use crate::errors::{Result, StakingError};
use crate::events::{EventLog, ProtocolEvent};
use crate::market::CurationPool;
use crate::params::{check_reserve_ratio, ParameterStore, ProtocolParameters};
use crate::thawing::{ThawingLedger, ThawingRequest};
use curation_economics::{mul_div, MathError};
use curation_time::EpochClock;
use curation_treasury::TokenLedger;
use curation_types::{AccountId, CurationId, TokenAmount, MAX_PPM};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Label of the account holding staked and thawing tokens
pub const CUSTODY_LABEL: &str = "curation/custody";

/// Extra constraints for a single stake
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StakeOptions {
    /// Reserve ratio for a pool this stake initializes. Ignored otherwise.
    pub reserve_ratio: Option<u32>,
    /// Fail with `SlippageExceeded` if fewer shares would be minted
    pub min_shares: TokenAmount,
}

#[derive(Debug)]
struct PoolBook {
    pool: CurationPool,
    positions: HashMap<AccountId, TokenAmount>,
}

impl PoolBook {
    fn new(curation_id: CurationId, reserve_ratio: u32) -> Self {
        Self {
            pool: CurationPool::new(curation_id, reserve_ratio),
            positions: HashMap::new(),
        }
    }

    fn shares_of(&self, delegator: &AccountId) -> TokenAmount {
        self.positions.get(delegator).copied().unwrap_or(0)
    }
}

pub struct StakingPoolEngine {
    params: Arc<ParameterStore>,
    clock: Arc<dyn EpochClock>,
    events: Arc<EventLog>,
    custody: AccountId,
    pools: RwLock<HashMap<CurationId, Arc<Mutex<PoolBook>>>>,
    thawing: Mutex<ThawingLedger>,
    ledger: Mutex<Box<dyn TokenLedger>>,
}

impl StakingPoolEngine {
    pub fn new(
        params: Arc<ParameterStore>,
        clock: Arc<dyn EpochClock>,
        ledger: Box<dyn TokenLedger>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            params,
            clock,
            events,
            custody: custody_account(),
            pools: RwLock::new(HashMap::new()),
            thawing: Mutex::new(ThawingLedger::new()),
            ledger: Mutex::new(ledger),
        }
    }

    fn pool_handle(&self, curation: CurationId) -> Option<Arc<Mutex<PoolBook>>> {
        self.pools.read().get(&curation).cloned()
    }

    /// Run `f` against the pool's book. A pool that does not exist yet is
    /// built aside and only inserted if `f` succeeds.
    fn with_pool_or_new<T>(
        &self,
        curation: CurationId,
        reserve_ratio: u32,
        f: impl FnOnce(&mut PoolBook) -> Result<T>,
    ) -> Result<T> {
        if let Some(handle) = self.pool_handle(curation) {
            let mut book = handle.lock();
            return f(&mut book);
        }

        let mut pools = self.pools.write();
        let raced = pools.get(&curation).cloned();
        if let Some(handle) = raced {
            drop(pools);
            let mut book = handle.lock();
            return f(&mut book);
        }
        let mut book = PoolBook::new(curation, reserve_ratio);
        let out = f(&mut book)?;
        pools.insert(curation, Arc::new(Mutex::new(book)));
        Ok(out)
    }

    /// Split `amount` into `(tax, net)`
    fn apply_tax(amount: TokenAmount, params: &ProtocolParameters) -> Result<(TokenAmount, TokenAmount)> {
        let tax = mul_div(amount, params.staking_tax_ppm as u128, MAX_PPM as u128)?;
        Ok((tax, amount - tax))
    }

    pub fn stake(
        &self,
        curation: CurationId,
        delegator: &AccountId,
        amount: TokenAmount,
    ) -> Result<TokenAmount> {
        self.stake_with(curation, delegator, amount, StakeOptions::default())
    }

    /// Deposit `amount` into the curation pool and return the minted shares
    pub fn stake_with(
        &self,
        curation: CurationId,
        delegator: &AccountId,
        amount: TokenAmount,
        options: StakeOptions,
    ) -> Result<TokenAmount> {
        if amount == 0 {
            return Err(StakingError::ZeroDeposit);
        }
        if let Some(ratio) = options.reserve_ratio {
            check_reserve_ratio(ratio)?;
        }
        let params = self.params.snapshot();
        let (tax, net) = Self::apply_tax(amount, &params)?;
        if net == 0 {
            return Err(StakingError::ZeroDeposit);
        }
        let initial_ratio = options.reserve_ratio.unwrap_or(params.default_reserve_ratio);

        let shares = self.with_pool_or_new(curation, initial_ratio, |book| {
            let mut pool = book.pool.clone();
            if !pool.is_initialized() {
                pool.reserve_ratio = initial_ratio;
            } else if options.reserve_ratio.is_some() {
                debug!(target: "staking", "{} already initialized, keeping reserve ratio {}", curation, pool.reserve_ratio);
            }

            let shares = pool.tokens_to_shares(net, params.minimum_staking)?;
            if shares < options.min_shares {
                return Err(StakingError::SlippageExceeded {
                    minimum: options.min_shares,
                    actual: shares,
                });
            }
            let position = book
                .shares_of(delegator)
                .checked_add(shares)
                .ok_or(MathError::Overflow("delegator shares"))?;
            pool.mint(net, shares)?;

            let mut ledger = self.ledger.lock();
            let available = ledger.balance_of(delegator);
            if available < amount {
                return Err(StakingError::InsufficientBalance {
                    account: *delegator,
                    requested: amount,
                    available,
                });
            }
            // the balance check above covers the burn once the transfer lands
            ledger.transfer(delegator, &self.custody, net)?;
            if tax > 0 {
                ledger.burn(delegator, tax)?;
                debug!(target: "treasury", "Burned staking tax {} from {}", tax, delegator.short());
            }
            drop(ledger);

            book.pool = pool;
            book.positions.insert(*delegator, position);
            Ok(shares)
        })?;

        self.events.emit(ProtocolEvent::Staked {
            delegator: *delegator,
            curation,
            tokens: amount,
            shares,
            tax,
            timestamp: self.clock.timestamp(),
        });
        Ok(shares)
    }

    pub fn unstake(
        &self,
        curation: CurationId,
        delegator: &AccountId,
        shares: TokenAmount,
    ) -> Result<TokenAmount> {
        self.unstake_with(curation, delegator, shares, 0)
    }

    /// Burn `shares` and lock the released tokens for the thawing period.
    /// Nothing is paid out here; see [`Self::withdraw`].
    pub fn unstake_with(
        &self,
        curation: CurationId,
        delegator: &AccountId,
        shares: TokenAmount,
        min_tokens: TokenAmount,
    ) -> Result<TokenAmount> {
        if shares == 0 {
            return Err(StakingError::ZeroBurn);
        }
        let Some(handle) = self.pool_handle(curation) else {
            return Err(StakingError::InsufficientShares {
                requested: shares,
                available: 0,
            });
        };
        let params = self.params.snapshot();
        let current_epoch = self.clock.current_epoch();

        let mut book = handle.lock();
        let available = book.shares_of(delegator);
        if shares > available {
            return Err(StakingError::InsufficientShares {
                requested: shares,
                available,
            });
        }
        let tokens = book.pool.shares_to_tokens(shares)?;
        if tokens < min_tokens {
            return Err(StakingError::SlippageExceeded {
                minimum: min_tokens,
                actual: tokens,
            });
        }
        let mut pool = book.pool.clone();
        pool.burn(shares, tokens)?;

        let request = self.thawing.lock().lock(
            delegator,
            curation,
            shares,
            tokens,
            current_epoch,
            params.thawing_period,
        )?;

        book.pool = pool;
        book.positions.insert(*delegator, available - shares);
        drop(book);

        self.events.emit(ProtocolEvent::UnstakeLocked {
            delegator: *delegator,
            curation,
            shares,
            tokens,
            unlock_epoch: request.unlock_epoch,
            timestamp: self.clock.timestamp(),
        });
        Ok(tokens)
    }

    /// Release a thawed request to the delegator
    pub fn withdraw(&self, curation: CurationId, delegator: &AccountId) -> Result<TokenAmount> {
        let current_epoch = self.clock.current_epoch();
        let mut thawing = self.thawing.lock();
        let request = thawing.releasable(delegator, curation, current_epoch)?;

        self.ledger
            .lock()
            .transfer(&self.custody, delegator, request.tokens)?;
        thawing.remove(delegator, curation);
        drop(thawing);

        self.events.emit(ProtocolEvent::Withdrawn {
            delegator: *delegator,
            curation,
            tokens: request.tokens,
            timestamp: self.clock.timestamp(),
        });
        Ok(request.tokens)
    }

    /// Quote `(shares, tax)` for staking `tokens`. Read-only.
    pub fn tokens_to_shares(
        &self,
        curation: CurationId,
        tokens: TokenAmount,
    ) -> Result<(TokenAmount, TokenAmount)> {
        let params = self.params.snapshot();
        let (tax, net) = Self::apply_tax(tokens, &params)?;
        let pool = self
            .pool(curation)
            .filter(CurationPool::is_initialized)
            .unwrap_or_else(|| CurationPool::new(curation, params.default_reserve_ratio));
        let shares = pool.tokens_to_shares(net, params.minimum_staking)?;
        debug!(target: "staking", "Quote {} tokens into {}: {} shares, {} tax", tokens, curation, shares, tax);
        Ok((shares, tax))
    }

    /// Quote the tokens released by burning `shares`. Read-only.
    pub fn shares_to_tokens(&self, curation: CurationId, shares: TokenAmount) -> Result<TokenAmount> {
        let pool = self
            .pool(curation)
            .ok_or(StakingError::PoolNotInitialized(curation))?;
        pool.shares_to_tokens(shares)
    }

    /// Snapshot of a pool
    pub fn pool(&self, curation: CurationId) -> Option<CurationPool> {
        self.pool_handle(curation)
            .map(|handle| handle.lock().pool.clone())
    }

    /// Tokens backing a pool, zero for unknown pools
    pub fn pool_stake(&self, curation: CurationId) -> TokenAmount {
        self.pool(curation).map(|pool| pool.total_tokens).unwrap_or(0)
    }

    pub fn is_curated(&self, curation: CurationId) -> bool {
        self.pool(curation)
            .map(|pool| pool.is_initialized())
            .unwrap_or(false)
    }

    pub fn share_balance(&self, curation: CurationId, delegator: &AccountId) -> TokenAmount {
        self.pool_handle(curation)
            .map(|handle| handle.lock().shares_of(delegator))
            .unwrap_or(0)
    }

    pub fn thawing_request(
        &self,
        curation: CurationId,
        delegator: &AccountId,
    ) -> Option<ThawingRequest> {
        self.thawing.lock().get(delegator, curation)
    }

    /// Tokens locked in thawing requests across every pool
    pub fn total_thawing(&self) -> TokenAmount {
        self.thawing.lock().total_locked()
    }

    pub fn custody(&self) -> AccountId {
        self.custody
    }

    pub fn custody_balance(&self) -> TokenAmount {
        self.ledger.lock().balance_of(&self.custody)
    }

    pub fn balance_of(&self, account: &AccountId) -> TokenAmount {
        self.ledger.lock().balance_of(account)
    }

    pub fn total_supply(&self) -> TokenAmount {
        self.ledger.lock().total_supply()
    }

    /// Curation ids with a pool, initialized or not
    pub fn curations(&self) -> Vec<CurationId> {
        let mut ids: Vec<_> = self.pools.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Account holding staked and thawing tokens
pub fn custody_account() -> AccountId {
    AccountId::from_label(CUSTODY_LABEL)
}
