//! Protocol configuration
//!
//! Loaded from TOML with token amounts written in whole-token decimals, e.g.
//!
//! ```toml
//! governor = "council"
//!
//! [parameters]
//! minimum_staking = "10"
//! staking_tax_ppm = 50000
//! default_reserve_ratio_ppm = 500000
//! thawing_period = 28
//! ```
//!
//! Environment variables override individual fields after loading.

use crate::params::ProtocolParameters;
use anyhow::{anyhow, Context, Result};
use curation_economics::RebateRatio;
use curation_types::{parse_tokens_str, to_decimal, AccountId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const ENV_MINIMUM_STAKING: &str = "CURATION_MINIMUM_STAKING";
pub const ENV_STAKING_TAX_PPM: &str = "CURATION_STAKING_TAX_PPM";
pub const ENV_RESERVE_RATIO_PPM: &str = "CURATION_RESERVE_RATIO_PPM";
pub const ENV_THAWING_PERIOD: &str = "CURATION_THAWING_PERIOD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Label the governor account id is derived from
    pub governor: String,
    #[serde(default)]
    pub parameters: ParametersConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParametersConfig {
    pub staking_tax_ppm: u32,
    /// Whole tokens, as a decimal string
    pub minimum_staking: String,
    pub default_reserve_ratio_ppm: u32,
    pub thawing_period: u64,
    pub channel_dispute_epochs: u64,
    pub max_allocation_epochs: u64,
    pub rebate_ratio: RebateRatio,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        let defaults = ProtocolParameters::default();
        Self {
            staking_tax_ppm: defaults.staking_tax_ppm,
            minimum_staking: to_decimal(defaults.minimum_staking)
                .map(|d| d.normalize().to_string())
                .unwrap_or_else(|_| "1".to_string()),
            default_reserve_ratio_ppm: defaults.default_reserve_ratio,
            thawing_period: defaults.thawing_period,
            channel_dispute_epochs: defaults.channel_dispute_epochs,
            max_allocation_epochs: defaults.max_allocation_epochs,
            rebate_ratio: defaults.rebate_ratio,
        }
    }
}

impl ProtocolConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse protocol configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse TOML at {}", path.display()))?;
        info!(target: "staking", "Loaded protocol configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `CURATION_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_MINIMUM_STAKING) {
            parse_tokens_str(&value)
                .map_err(|e| anyhow!("{ENV_MINIMUM_STAKING}={value}: {e}"))?;
            debug!(target: "staking", "{} overrides minimum_staking", ENV_MINIMUM_STAKING);
            self.parameters.minimum_staking = value;
        }
        if let Some(value) = lookup(ENV_STAKING_TAX_PPM) {
            self.parameters.staking_tax_ppm = value
                .trim()
                .parse()
                .with_context(|| format!("{ENV_STAKING_TAX_PPM}={value}"))?;
        }
        if let Some(value) = lookup(ENV_RESERVE_RATIO_PPM) {
            self.parameters.default_reserve_ratio_ppm = value
                .trim()
                .parse()
                .with_context(|| format!("{ENV_RESERVE_RATIO_PPM}={value}"))?;
        }
        if let Some(value) = lookup(ENV_THAWING_PERIOD) {
            self.parameters.thawing_period = value
                .trim()
                .parse()
                .with_context(|| format!("{ENV_THAWING_PERIOD}={value}"))?;
        }
        Ok(())
    }

    pub fn governor_account(&self) -> AccountId {
        AccountId::from_label(&self.governor)
    }

    /// Convert to validated protocol parameters
    pub fn to_parameters(&self) -> Result<ProtocolParameters> {
        let p = &self.parameters;
        let minimum_staking = parse_tokens_str(&p.minimum_staking)
            .map_err(|e| anyhow!("minimum_staking={}: {e}", p.minimum_staking))?;
        let params = ProtocolParameters {
            staking_tax_ppm: p.staking_tax_ppm,
            minimum_staking,
            default_reserve_ratio: p.default_reserve_ratio_ppm,
            thawing_period: p.thawing_period,
            channel_dispute_epochs: p.channel_dispute_epochs,
            max_allocation_epochs: p.max_allocation_epochs,
            rebate_ratio: p.rebate_ratio,
        };
        params.validate().context("Invalid protocol parameters")?;
        Ok(params)
    }
}
