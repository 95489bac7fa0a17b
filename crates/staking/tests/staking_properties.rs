//! Property tests for the staking engine
//!
//! Conservation of the pool reserve across full stake/unstake cycles,
//! monotonic pricing, exact tax accounting and thaw lock bookkeeping.

use curation_staking::{
    CurationProtocol, ProtocolParameters, StakeOptions,
};
use curation_time::ManualEpochClock;
use curation_treasury::InMemoryTokenLedger;
use curation_types::{tokens, AccountId, CurationId, TokenAmount};
use proptest::prelude::*;
use std::sync::Arc;

const POOL: CurationId = CurationId(1);

fn delegator(index: usize) -> AccountId {
    AccountId::from_label(&format!("delegator-{index}"))
}

fn protocol_with(
    params: ProtocolParameters,
    delegators: usize,
    start_epoch: u64,
) -> (CurationProtocol, Arc<ManualEpochClock>) {
    let clock = Arc::new(ManualEpochClock::new(start_epoch));
    let ledger = InMemoryTokenLedger::with_balances(
        (0..delegators).map(|i| (delegator(i), tokens(1_000_000))),
    );
    let protocol = CurationProtocol::new(
        AccountId::from_label("governor"),
        params,
        clock.clone(),
        Box::new(ledger),
    )
    .unwrap();
    (protocol, clock)
}

fn params(ratio: u32, tax_ppm: u32) -> ProtocolParameters {
    ProtocolParameters {
        minimum_staking: tokens(1),
        default_reserve_ratio: ratio,
        staking_tax_ppm: tax_ppm,
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_full_unstake_returns_every_net_deposit(
        ratio in 100_000u32..=1_000_000,
        tax_ppm in 0u32..=100_000,
        deposits in prop::collection::vec((0usize..4, 2u128..5_000), 1..10),
    ) {
        let (protocol, _) = protocol_with(params(ratio, tax_ppm), 4, 0);
        let mut net_total: TokenAmount = 0;
        for (who, amount) in &deposits {
            let amount = tokens(*amount);
            let tax = amount * tax_ppm as u128 / 1_000_000;
            protocol.stake(POOL, &delegator(*who), amount).unwrap();
            net_total += amount - tax;
        }
        prop_assert_eq!(protocol.engine().pool_stake(POOL), net_total);

        let mut released: TokenAmount = 0;
        for who in 0..4 {
            let shares = protocol.engine().share_balance(POOL, &delegator(who));
            if shares > 0 {
                released += protocol.unstake(POOL, &delegator(who), shares).unwrap();
            }
        }

        let pool = protocol.engine().pool(POOL).unwrap();
        prop_assert_eq!(pool.total_shares, 0);
        prop_assert_eq!(pool.total_tokens, 0);
        prop_assert_eq!(released, net_total);
        prop_assert_eq!(protocol.engine().total_thawing(), net_total);
        prop_assert_eq!(protocol.engine().custody_balance(), net_total);
    }

    #[test]
    fn prop_quotes_increase_with_deposit(
        ratio in 100_000u32..=1_000_000,
        seed in 1u128..10_000,
        a in 1u128..10_000,
        extra in 1u128..10_000,
    ) {
        let (protocol, _) = protocol_with(params(ratio, 0), 1, 0);
        protocol.stake(POOL, &delegator(0), tokens(seed)).unwrap();

        let (small, _) = protocol.tokens_to_shares(POOL, tokens(a)).unwrap();
        let (large, _) = protocol.tokens_to_shares(POOL, tokens(a + extra)).unwrap();
        prop_assert!(small < large, "small={} large={}", small, large);
    }

    #[test]
    fn prop_tax_reduces_deposit_exactly(
        amount in 2_000_000_000_000_000_000u128..1_000_000_000_000_000_000_000,
        tax_ppm in 0u32..=500_000,
    ) {
        let (protocol, _) = protocol_with(params(500_000, tax_ppm), 1, 0);
        let supply = protocol.engine().total_supply();
        protocol.stake(POOL, &delegator(0), amount).unwrap();

        let tax = amount * tax_ppm as u128 / 1_000_000;
        prop_assert_eq!(protocol.engine().pool_stake(POOL), amount - tax);
        prop_assert_eq!(protocol.engine().total_supply(), supply - tax);
    }

    #[test]
    fn prop_thaw_lock_is_epoch_plus_period(
        start in 0u64..1_000_000,
        period in 1u64..10_000,
        amount in 1u128..10_000,
        fraction in 1u128..=100,
    ) {
        let (protocol, _) = protocol_with(params(500_000, 0), 1, start);
        protocol
            .parameters()
            .set_thawing_period(&AccountId::from_label("governor"), period)
            .unwrap();
        let shares = protocol.stake(POOL, &delegator(0), tokens(amount)).unwrap();
        let burn = (shares * fraction / 100).max(1);

        protocol.unstake(POOL, &delegator(0), burn).unwrap();
        let request = protocol.engine().thawing_request(POOL, &delegator(0)).unwrap();
        prop_assert_eq!(request.unlock_epoch, start + period);
        prop_assert_eq!(request.shares, burn);
        prop_assert_eq!(protocol.engine().share_balance(POOL, &delegator(0)), shares - burn);
    }

    #[test]
    fn prop_sale_inverts_purchase(
        ratio in 100_000u32..=1_000_000,
        seed in 10u128..10_000,
        deposit in 1u128..10_000,
    ) {
        let (protocol, _) = protocol_with(params(ratio, 0), 2, 0);
        protocol.stake(POOL, &delegator(0), tokens(seed)).unwrap();
        let options = StakeOptions { reserve_ratio: None, min_shares: 1 };
        let minted = protocol.stake_with(POOL, &delegator(1), tokens(deposit), options).unwrap();

        let back = protocol.shares_to_tokens(POOL, minted).unwrap();
        let drift = back.abs_diff(tokens(deposit));
        prop_assert!(drift <= tokens(deposit) / 1_000_000_000 + 1_000_000, "drift={}", drift);
    }
}
