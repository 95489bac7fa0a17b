//! Curation protocol facade
//!
//! Wires the epoch clock, governance parameters, the staking engine, the
//! allocation book and the rebate pool together behind the procedural
//! interface the surrounding protocol calls.

use crate::allocation::{Allocation, AllocationBook, AllocationRegistry};
use crate::config::ProtocolConfig;
use crate::engine::{StakeOptions, StakingPoolEngine};
use crate::errors::{Result, StakingError};
use crate::events::{EventLog, ProtocolEvent};
use crate::params::{ParameterStore, ProtocolParameters};
use curation_time::EpochClock;
use curation_treasury::{RebateAccount, RebateClaim, RebatePool, TokenLedger};
use curation_types::{AccountId, AllocationId, CurationId, Currency, TokenAmount};
use std::sync::Arc;
use tracing::info;

pub struct CurationProtocol {
    clock: Arc<dyn EpochClock>,
    params: Arc<ParameterStore>,
    events: Arc<EventLog>,
    engine: StakingPoolEngine,
    allocations: AllocationBook,
    rebates: RebatePool,
}

impl CurationProtocol {
    pub fn new(
        governor: AccountId,
        params: ProtocolParameters,
        clock: Arc<dyn EpochClock>,
        ledger: Box<dyn TokenLedger>,
    ) -> Result<Self> {
        let events = Arc::new(EventLog::new());
        let params = Arc::new(ParameterStore::new(governor, params, events.clone())?);
        let engine = StakingPoolEngine::new(params.clone(), clock.clone(), ledger, events.clone());
        info!(target: "staking", "Curation protocol started at epoch {}", clock.current_epoch());
        Ok(Self {
            clock,
            params,
            events,
            engine,
            allocations: AllocationBook::new(),
            rebates: RebatePool::new(),
        })
    }

    /// Build from a loaded configuration
    pub fn from_config(
        config: &ProtocolConfig,
        clock: Arc<dyn EpochClock>,
        ledger: Box<dyn TokenLedger>,
    ) -> anyhow::Result<Self> {
        let params = config.to_parameters()?;
        Ok(Self::new(config.governor_account(), params, clock, ledger)?)
    }

    pub fn engine(&self) -> &StakingPoolEngine {
        &self.engine
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    pub fn rebates(&self) -> &RebatePool {
        &self.rebates
    }

    pub fn allocations(&self) -> &AllocationBook {
        &self.allocations
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn current_epoch(&self) -> u64 {
        self.clock.current_epoch()
    }

    // ---------------------------------------------------------------------
    // Staking
    // ---------------------------------------------------------------------

    pub fn stake(
        &self,
        curation: CurationId,
        delegator: &AccountId,
        amount: TokenAmount,
    ) -> Result<TokenAmount> {
        self.engine.stake(curation, delegator, amount)
    }

    pub fn stake_with(
        &self,
        curation: CurationId,
        delegator: &AccountId,
        amount: TokenAmount,
        options: StakeOptions,
    ) -> Result<TokenAmount> {
        self.engine.stake_with(curation, delegator, amount, options)
    }

    pub fn unstake(
        &self,
        curation: CurationId,
        delegator: &AccountId,
        shares: TokenAmount,
    ) -> Result<TokenAmount> {
        self.engine.unstake(curation, delegator, shares)
    }

    pub fn withdraw(&self, curation: CurationId, delegator: &AccountId) -> Result<TokenAmount> {
        self.engine.withdraw(curation, delegator)
    }

    pub fn shares_to_tokens(&self, curation: CurationId, shares: TokenAmount) -> Result<TokenAmount> {
        self.engine.shares_to_tokens(curation, shares)
    }

    pub fn tokens_to_shares(
        &self,
        curation: CurationId,
        tokens: TokenAmount,
    ) -> Result<(TokenAmount, TokenAmount)> {
        self.engine.tokens_to_shares(curation, tokens)
    }

    // ---------------------------------------------------------------------
    // Allocations
    // ---------------------------------------------------------------------

    pub fn open_allocation(
        &self,
        id: AllocationId,
        curation: CurationId,
        owner: AccountId,
    ) -> Result<Allocation> {
        let epoch = self.clock.current_epoch();
        let allocation = self.allocations.open(id, curation, owner, epoch)?;
        self.events.emit(ProtocolEvent::AllocationOpened {
            allocation: id,
            curation,
            owner,
            epoch,
        });
        Ok(allocation)
    }

    pub fn close_allocation(&self, id: AllocationId, caller: &AccountId) -> Result<Allocation> {
        let epoch = self.clock.current_epoch();
        let max_epochs = self.params.snapshot().max_allocation_epochs;
        let allocation = self.allocations.close(id, caller, epoch, max_epochs)?;
        self.events.emit(ProtocolEvent::AllocationClosed {
            allocation: id,
            closed_by: *caller,
            epoch,
        });
        Ok(allocation)
    }

    fn resolve(&self, id: AllocationId) -> Result<Allocation> {
        if id.is_null() {
            return Err(StakingError::InvalidAllocation(id));
        }
        self.allocations
            .resolve(id)
            .ok_or(StakingError::InvalidAllocation(id))
    }

    // ---------------------------------------------------------------------
    // Rebates
    // ---------------------------------------------------------------------

    /// Record fees against an allocation, snapshotting its pool's stake.
    /// The pool's own reserve is left untouched.
    pub fn collect(
        &self,
        currency: &Currency,
        amount: TokenAmount,
        allocation: AllocationId,
    ) -> Result<RebateAccount> {
        let resolved = self.resolve(allocation)?;
        let stake_weight = self.engine.pool_stake(resolved.curation_id);
        let account = self
            .rebates
            .collect(allocation, currency, amount, stake_weight)?;
        if amount > 0 {
            self.events.emit(ProtocolEvent::FeesCollected {
                allocation,
                curation: resolved.curation_id,
                currency: currency.clone(),
                amount,
                stake_weight,
                timestamp: self.clock.timestamp(),
            });
        }
        Ok(account)
    }

    /// Settle a rebate claim once the allocation is past its dispute period.
    /// `claim.total_stake` is the stake snapshot taken at the latest collection.
    pub fn claim_rebate(
        &self,
        allocation: AllocationId,
        currency: &Currency,
        claim: &RebateClaim,
    ) -> Result<TokenAmount> {
        let resolved = self.resolve(allocation)?;
        let params = self.params.snapshot();
        let epoch = self.clock.current_epoch();
        if !resolved.is_claimable(epoch, params.channel_dispute_epochs) {
            let reason = match resolved.closed_at_epoch {
                Some(closed) => format!(
                    "claimable from epoch {}",
                    closed.saturating_add(params.channel_dispute_epochs)
                ),
                None => "still active".to_string(),
            };
            return Err(StakingError::AllocationState { allocation, reason });
        }

        let reward = self
            .rebates
            .claim(allocation, currency, claim, params.rebate_ratio)?;
        self.events.emit(ProtocolEvent::RebateClaimed {
            allocation,
            currency: currency.clone(),
            amount: reward,
            timestamp: self.clock.timestamp(),
        });
        Ok(reward)
    }
}
