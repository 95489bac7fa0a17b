//! Protocol parameters and their governance gate
//!
//! Every operation reads a [`ProtocolParameters`] snapshot; only the
//! governor may change a field, and only through the setters below.

use crate::errors::{Result, StakingError};
use crate::events::{EventLog, ProtocolEvent};
use curation_economics::RebateRatio;
use curation_types::{tokens, AccountId, Epoch, TokenAmount, MAX_PPM};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::warn;

/// Governance-mutable protocol configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Share of each deposit burned on stake, in ppm of `MAX_PPM`
    pub staking_tax_ppm: u32,
    /// Smallest reserve a pool may hold after a stake
    pub minimum_staking: TokenAmount,
    /// Reserve ratio for newly initialized pools, in ppm
    pub default_reserve_ratio: u32,
    /// Epochs between unstake and withdrawal
    pub thawing_period: Epoch,
    /// Epochs a closed allocation waits before rebates can be claimed
    pub channel_dispute_epochs: Epoch,
    /// Epochs after which anyone may close an allocation
    pub max_allocation_epochs: Epoch,
    /// Cobb-Douglas α
    pub rebate_ratio: RebateRatio,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            staking_tax_ppm: 0,
            minimum_staking: tokens(1),
            default_reserve_ratio: 500_000,
            thawing_period: 28,
            channel_dispute_epochs: 2,
            max_allocation_epochs: 28,
            rebate_ratio: RebateRatio::default(),
        }
    }
}

impl ProtocolParameters {
    /// Check every field with the same rules the setters enforce
    pub fn validate(&self) -> Result<()> {
        check_reserve_ratio(self.default_reserve_ratio)?;
        check_minimum_staking(self.minimum_staking)?;
        check_staking_tax(self.staking_tax_ppm)?;
        check_epochs("thawing_period", self.thawing_period)?;
        check_epochs("channel_dispute_epochs", self.channel_dispute_epochs)?;
        check_epochs("max_allocation_epochs", self.max_allocation_epochs)?;
        check_rebate_ratio(self.rebate_ratio)
    }
}

pub(crate) fn check_reserve_ratio(ratio: u32) -> Result<()> {
    if ratio == 0 || ratio > MAX_PPM {
        return Err(StakingError::invalid_parameter(
            "default_reserve_ratio",
            ratio,
            format!("must be in (0, {MAX_PPM}]"),
        ));
    }
    Ok(())
}

fn check_minimum_staking(minimum: TokenAmount) -> Result<()> {
    if minimum == 0 {
        return Err(StakingError::invalid_parameter(
            "minimum_staking",
            minimum,
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn check_staking_tax(tax_ppm: u32) -> Result<()> {
    if tax_ppm > MAX_PPM {
        return Err(StakingError::invalid_parameter(
            "staking_tax_ppm",
            tax_ppm,
            format!("must be at most {MAX_PPM}"),
        ));
    }
    Ok(())
}

fn check_epochs(param: &'static str, epochs: Epoch) -> Result<()> {
    if epochs == 0 {
        return Err(StakingError::invalid_parameter(
            param,
            epochs,
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn check_rebate_ratio(ratio: RebateRatio) -> Result<()> {
    if ratio.numerator == 0 || ratio.denominator == 0 {
        return Err(StakingError::invalid_parameter(
            "rebate_ratio",
            ratio,
            "numerator and denominator must be greater than zero",
        ));
    }
    if ratio.numerator > ratio.denominator {
        return Err(StakingError::invalid_parameter(
            "rebate_ratio",
            ratio,
            "alpha must not exceed one",
        ));
    }
    Ok(())
}

/// Parameters plus the single principal allowed to change them.
#[derive(Debug)]
pub struct ParameterStore {
    governor: RwLock<AccountId>,
    params: RwLock<ProtocolParameters>,
    events: Arc<EventLog>,
}

impl ParameterStore {
    pub fn new(
        governor: AccountId,
        params: ProtocolParameters,
        events: Arc<EventLog>,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            governor: RwLock::new(governor),
            params: RwLock::new(params),
            events,
        })
    }

    pub fn governor(&self) -> AccountId {
        *self.governor.read()
    }

    pub fn is_governor(&self, account: &AccountId) -> bool {
        *self.governor.read() == *account
    }

    /// Consistent copy of every parameter
    pub fn snapshot(&self) -> ProtocolParameters {
        self.params.read().clone()
    }

    fn update<V: Display>(
        &self,
        caller: &AccountId,
        param: &'static str,
        value: V,
        check: impl FnOnce() -> Result<()>,
        apply: impl FnOnce(&mut ProtocolParameters),
    ) -> Result<()> {
        // governor stays read-locked until the write lands
        let governor = self.governor.read();
        if *governor != *caller {
            warn!(target: "governance", "Rejected {} update from {}", param, caller.short());
            return Err(StakingError::Unauthorized(*caller));
        }
        check()?;
        apply(&mut self.params.write());
        drop(governor);

        let value = value.to_string();
        self.events.emit(ProtocolEvent::ParameterUpdated {
            param: param.to_string(),
            value,
        });
        Ok(())
    }

    pub fn set_default_reserve_ratio(&self, caller: &AccountId, ratio: u32) -> Result<()> {
        self.update(
            caller,
            "default_reserve_ratio",
            ratio,
            || check_reserve_ratio(ratio),
            |p| p.default_reserve_ratio = ratio,
        )
    }

    pub fn set_minimum_staking(&self, caller: &AccountId, minimum: TokenAmount) -> Result<()> {
        self.update(
            caller,
            "minimum_staking",
            minimum,
            || check_minimum_staking(minimum),
            |p| p.minimum_staking = minimum,
        )
    }

    pub fn set_staking_tax_percentage(&self, caller: &AccountId, tax_ppm: u32) -> Result<()> {
        self.update(
            caller,
            "staking_tax_ppm",
            tax_ppm,
            || check_staking_tax(tax_ppm),
            |p| p.staking_tax_ppm = tax_ppm,
        )
    }

    pub fn set_thawing_period(&self, caller: &AccountId, epochs: Epoch) -> Result<()> {
        self.update(
            caller,
            "thawing_period",
            epochs,
            || check_epochs("thawing_period", epochs),
            |p| p.thawing_period = epochs,
        )
    }

    pub fn set_channel_dispute_epochs(&self, caller: &AccountId, epochs: Epoch) -> Result<()> {
        self.update(
            caller,
            "channel_dispute_epochs",
            epochs,
            || check_epochs("channel_dispute_epochs", epochs),
            |p| p.channel_dispute_epochs = epochs,
        )
    }

    pub fn set_max_allocation_epochs(&self, caller: &AccountId, epochs: Epoch) -> Result<()> {
        self.update(
            caller,
            "max_allocation_epochs",
            epochs,
            || check_epochs("max_allocation_epochs", epochs),
            |p| p.max_allocation_epochs = epochs,
        )
    }

    pub fn set_rebate_ratio(
        &self,
        caller: &AccountId,
        numerator: u32,
        denominator: u32,
    ) -> Result<()> {
        let ratio = RebateRatio::new(numerator, denominator);
        self.update(
            caller,
            "rebate_ratio",
            ratio,
            || check_rebate_ratio(ratio),
            |p| p.rebate_ratio = ratio,
        )
    }

    /// Hand the governor role to another account
    pub fn transfer_governance(&self, caller: &AccountId, new_governor: AccountId) -> Result<()> {
        let mut governor = self.governor.write();
        if *governor != *caller {
            warn!(target: "governance", "Rejected governance transfer from {}", caller.short());
            return Err(StakingError::Unauthorized(*caller));
        }
        *governor = new_governor;
        drop(governor);

        self.events.emit(ProtocolEvent::ParameterUpdated {
            param: "governor".to_string(),
            value: new_governor.to_string(),
        });
        Ok(())
    }
}
