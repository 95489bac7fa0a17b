//! Curation walkthrough
//!
//! Stakes into a pool, collects fees against an allocation, unstakes,
//! waits out the thawing period and settles a rebate.
//!
//! Run with: RUST_LOG=debug cargo run -p curation-staking --example curation_walkthrough

use anyhow::Result;
use curation_staking::{CurationProtocol, ProtocolConfig, RebateClaim};
use curation_time::{EpochClock, ManualEpochClock};
use curation_treasury::InMemoryTokenLedger;
use curation_types::{to_decimal, tokens, AccountId, AllocationId, CurationId, Currency};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CONFIG: &str = r#"
governor = "council"

[parameters]
minimum_staking = "10"
staking_tax_ppm = 50000
default_reserve_ratio_ppm = 500000
thawing_period = 3
channel_dispute_epochs = 2
"#;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let mut config = ProtocolConfig::from_toml_str(CONFIG)?;
    config.apply_env_overrides()?;

    let alice = AccountId::from_label("alice");
    let bob = AccountId::from_label("bob");
    let indexer = AccountId::from_label("indexer");
    let ledger = InMemoryTokenLedger::with_balances([(alice, tokens(1_000)), (bob, tokens(500))]);
    let clock = Arc::new(ManualEpochClock::new(1));
    let protocol = CurationProtocol::from_config(&config, clock.clone(), Box::new(ledger))?;

    let pool = CurationId(1);
    let alice_shares = protocol.stake(pool, &alice, tokens(1_000))?;
    let bob_shares = protocol.stake(pool, &bob, tokens(500))?;
    info!(
        "alice holds {} shares, bob holds {} shares",
        to_decimal(alice_shares)?,
        to_decimal(bob_shares)?
    );

    let grt = Currency::new("GRT");
    let allocation = AllocationId(1);
    protocol.open_allocation(allocation, pool, indexer)?;
    protocol.collect(&grt, tokens(40), allocation)?;

    clock.advance(1);
    let locked = protocol.unstake(pool, &bob, bob_shares)?;
    protocol.close_allocation(allocation, &indexer)?;
    info!("bob locked {} tokens", to_decimal(locked)?);

    clock.advance(3);
    let withdrawn = protocol.withdraw(pool, &bob)?;
    info!(
        "bob withdrew {} tokens at epoch {}",
        to_decimal(withdrawn)?,
        clock.current_epoch()
    );

    let stake = protocol
        .rebates()
        .account(allocation, &grt)
        .map(|account| account.stake_at_collection)
        .unwrap_or_default();
    let claim = RebateClaim {
        fees: tokens(40),
        total_fees: tokens(40),
        stake,
        total_stake: stake,
    };
    let rebate = protocol.claim_rebate(allocation, &grt, &claim)?;
    info!("indexer claimed {} {}", to_decimal(rebate)?, grt);

    for event in protocol.events().drain() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
