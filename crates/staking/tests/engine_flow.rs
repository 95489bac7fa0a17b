//! Staking Engine Flow Test
//!
//! End-to-end scenarios through the protocol facade:
//! - Bootstrap pricing of a fresh pool at reserve ratio 0.5
//! - Staking tax burned out of circulating supply
//! - Thaw locks recorded at `current_epoch + thawing_period`
//! - Pools drained to zero and re-initialized
//! - Rebate settlement after the dispute period
//! - Concurrent stakers reconciling against pool totals and custody
//!
//! Run with: cargo test -p curation-staking --test engine_flow -- --nocapture

use curation_staking::{
    CurationProtocol, ProtocolEvent, ProtocolParameters, RebateClaim, StakingError,
};
use curation_time::{EpochClock, ManualEpochClock};
use curation_treasury::InMemoryTokenLedger;
use curation_types::{tokens, AccountId, AllocationId, CurationId, Currency, TokenAmount};
use parking_lot::Mutex;
use std::sync::Arc;

// =============================================================================
// TEST HELPERS
// =============================================================================

fn account(label: &str) -> AccountId {
    AccountId::from_label(label)
}

fn setup(params: ProtocolParameters, balances: &[(&str, u128)]) -> (CurationProtocol, Arc<ManualEpochClock>) {
    let clock = Arc::new(ManualEpochClock::new(100));
    let ledger = InMemoryTokenLedger::with_balances(
        balances
            .iter()
            .map(|(label, amount)| (account(label), tokens(*amount))),
    );
    let protocol = CurationProtocol::new(account("governor"), params, clock.clone(), Box::new(ledger))
        .unwrap();
    (protocol, clock)
}

fn min_ten() -> ProtocolParameters {
    ProtocolParameters {
        minimum_staking: tokens(10),
        default_reserve_ratio: 500_000,
        staking_tax_ppm: 0,
        ..Default::default()
    }
}

fn close(actual: TokenAmount, expected: TokenAmount, tolerance: TokenAmount) -> bool {
    actual.abs_diff(expected) <= tolerance
}

// =============================================================================
// BONDING CURVE BOOTSTRAP
// =============================================================================

#[test]
fn test_bootstrap_mints_sqrt_scaled_shares() {
    let (protocol, clock) = setup(min_ten(), &[("alice", 1_000)]);
    let alice = account("alice");

    let shares = protocol.stake(CurationId(1), &alice, tokens(100)).unwrap();
    println!("minted {shares} shares for 100 tokens");
    // 31.622776601683793319 up to the last few base units
    assert!(close(shares, 31_622_776_601_683_793_319, 10));
    assert_eq!(protocol.engine().share_balance(CurationId(1), &alice), shares);

    let tokens_out = protocol.unstake(CurationId(1), &alice, shares).unwrap();
    assert_eq!(tokens_out, tokens(100));
    let request = protocol
        .engine()
        .thawing_request(CurationId(1), &alice)
        .unwrap();
    assert_eq!(request.unlock_epoch, clock.current_epoch() + 28);
    assert_eq!(request.tokens, tokens(100));

    let pool = protocol.engine().pool(CurationId(1)).unwrap();
    assert_eq!(pool.total_shares, 0);
    assert_eq!(pool.total_tokens, 0);
    assert!(!protocol.engine().is_curated(CurationId(1)));
}

#[test]
fn test_quotes_are_monotonic_and_read_only() {
    let (protocol, _) = setup(min_ten(), &[("alice", 1_000)]);
    let alice = account("alice");
    protocol.stake(CurationId(1), &alice, tokens(100)).unwrap();
    let before = protocol.engine().pool(CurationId(1)).unwrap();

    let mut last = 0;
    for amount in [1u128, 2, 10, 50, 500] {
        let (shares, tax) = protocol.tokens_to_shares(CurationId(1), tokens(amount)).unwrap();
        assert_eq!(tax, 0);
        assert!(shares > last);
        last = shares;
    }
    assert_eq!(protocol.engine().pool(CurationId(1)).unwrap(), before);
}

#[test]
fn test_drained_pool_reinitializes_with_bootstrap() {
    let (protocol, _) = setup(min_ten(), &[("alice", 1_000), ("bob", 1_000)]);
    let alice = account("alice");
    let bob = account("bob");

    let shares = protocol.stake(CurationId(1), &alice, tokens(100)).unwrap();
    protocol.unstake(CurationId(1), &alice, shares).unwrap();

    assert!(matches!(
        protocol.stake(CurationId(1), &bob, tokens(5)),
        Err(StakingError::BelowMinimumStake { .. })
    ));
    let again = protocol.stake(CurationId(1), &bob, tokens(100)).unwrap();
    assert_eq!(again, shares);
}

#[test]
fn test_pool_drained_to_dust_keeps_pricing() {
    let (protocol, _) = setup(min_ten(), &[("alice", 1_000), ("bob", 1_000)]);
    let alice = account("alice");
    let bob = account("bob");

    let shares = protocol.stake(CurationId(1), &alice, tokens(100)).unwrap();
    protocol.unstake(CurationId(1), &alice, shares - 1).unwrap();
    let pool = protocol.engine().pool(CurationId(1)).unwrap();
    assert_eq!((pool.total_shares, pool.total_tokens), (1, 1));

    let minted = protocol.stake(CurationId(1), &bob, tokens(1_000)).unwrap();
    // sqrt(10^21 + 1) - 1 on the curve
    assert!(close(minted, 31_622_776_600, 10), "minted={minted}");
    assert_eq!(protocol.engine().pool_stake(CurationId(1)), tokens(1_000) + 1);

    let back = protocol.unstake(CurationId(1), &bob, minted).unwrap();
    assert!(back <= tokens(1_000));
    protocol.unstake(CurationId(1), &alice, 1).unwrap();
    assert!(!protocol.engine().is_curated(CurationId(1)));
}

#[test]
fn test_one_unit_minimum_stake() {
    let params = ProtocolParameters {
        minimum_staking: 1,
        ..min_ten()
    };
    let (protocol, _) = setup(params, &[("alice", 1_000)]);

    let shares = protocol.stake(CurationId(1), &account("alice"), tokens(1_000)).unwrap();
    // one bootstrap share, then sqrt(10^21) on the curve
    assert!(close(shares, 31_622_776_601, 10), "shares={shares}");
    assert_eq!(protocol.engine().pool_stake(CurationId(1)), tokens(1_000));
}

// =============================================================================
// STAKING TAX
// =============================================================================

#[test]
fn test_five_percent_tax_burns_from_supply() {
    let params = ProtocolParameters {
        staking_tax_ppm: 50_000,
        ..min_ten()
    };
    let (protocol, _) = setup(params, &[("alice", 1_000)]);
    let alice = account("alice");
    let supply_before = protocol.engine().total_supply();

    protocol.stake(CurationId(1), &alice, tokens(1_000)).unwrap();

    let pool = protocol.engine().pool(CurationId(1)).unwrap();
    assert_eq!(pool.total_tokens, tokens(950));
    assert_eq!(protocol.engine().total_supply(), supply_before - tokens(50));

    let staked = protocol
        .events()
        .snapshot()
        .into_iter()
        .find_map(|event| match event {
            ProtocolEvent::Staked { tokens, tax, .. } => Some((tokens, tax)),
            _ => None,
        })
        .unwrap();
    assert_eq!(staked, (tokens(1_000), tokens(50)));
}

#[test]
fn test_tax_rounds_down() {
    let params = ProtocolParameters {
        staking_tax_ppm: 333_333,
        ..min_ten()
    };
    let (protocol, _) = setup(params, &[("alice", 1_000)]);
    let amount = tokens(100) + 7;
    let expected_tax = amount * 333_333 / 1_000_000;
    let (_, quoted_tax) = protocol.tokens_to_shares(CurationId(1), amount).unwrap();
    assert_eq!(quoted_tax, expected_tax);

    protocol.stake(CurationId(1), &account("alice"), amount).unwrap();
    assert_eq!(
        protocol.engine().pool_stake(CurationId(1)),
        amount - expected_tax
    );
}

// =============================================================================
// THAWING
// =============================================================================

#[test]
fn test_repeated_unstakes_accumulate_and_extend() {
    let (protocol, clock) = setup(min_ten(), &[("alice", 1_000)]);
    let alice = account("alice");
    let governor = account("governor");
    protocol.parameters().set_thawing_period(&governor, 10).unwrap();

    let shares = protocol.stake(CurationId(1), &alice, tokens(400)).unwrap();
    let first = protocol.unstake(CurationId(1), &alice, shares / 4).unwrap();
    assert_eq!(
        protocol.engine().share_balance(CurationId(1), &alice),
        shares - shares / 4
    );

    clock.advance(3);
    let second = protocol.unstake(CurationId(1), &alice, shares / 4).unwrap();
    let request = protocol
        .engine()
        .thawing_request(CurationId(1), &alice)
        .unwrap();
    assert_eq!(request.tokens, first + second);
    assert_eq!(request.shares, 2 * (shares / 4));
    assert_eq!(request.unlock_epoch, 113);

    clock.set_epoch(112);
    assert!(matches!(
        protocol.withdraw(CurationId(1), &alice),
        Err(StakingError::StillThawing { unlock_epoch: 113, current_epoch: 112 })
    ));
    clock.set_epoch(113);
    let released = protocol.withdraw(CurationId(1), &alice).unwrap();
    assert_eq!(released, first + second);
    assert_eq!(protocol.engine().balance_of(&alice), tokens(600) + released);
}

#[test]
fn test_failed_operations_leave_state() {
    let (protocol, _) = setup(min_ten(), &[("alice", 1_000)]);
    let alice = account("alice");
    let shares = protocol.stake(CurationId(1), &alice, tokens(100)).unwrap();
    let pool = protocol.engine().pool(CurationId(1)).unwrap();
    let events = protocol.events().len();

    assert!(protocol.unstake(CurationId(1), &alice, shares + 1).is_err());
    assert!(protocol.stake(CurationId(1), &alice, tokens(5_000)).is_err());
    assert!(protocol.stake(CurationId(1), &alice, 0).is_err());
    assert!(protocol.withdraw(CurationId(1), &alice).is_err());

    assert_eq!(protocol.engine().pool(CurationId(1)).unwrap(), pool);
    assert_eq!(protocol.engine().share_balance(CurationId(1), &alice), shares);
    assert_eq!(protocol.events().len(), events);
    assert_eq!(protocol.engine().balance_of(&alice), tokens(900));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_concurrent_stakes_reconcile() {
    const WORKERS: usize = 8;
    const ROUNDS: u128 = 20;
    let labels: Vec<String> = (0..WORKERS).map(|i| format!("worker-{i}")).collect();
    let balances: Vec<(&str, u128)> = labels.iter().map(|l| (l.as_str(), 10_000)).collect();
    let params = ProtocolParameters {
        staking_tax_ppm: 10_000,
        ..min_ten()
    };
    let (protocol, _) = setup(params, &balances);
    let supply_before = protocol.engine().total_supply();
    let shared = CurationId(3);

    std::thread::scope(|scope| {
        for (i, label) in labels.iter().enumerate() {
            let protocol = &protocol;
            scope.spawn(move || {
                let me = account(label);
                let own = CurationId(1 + (i % 2) as u64);
                for _ in 0..ROUNDS {
                    protocol.stake(own, &me, tokens(50)).unwrap();
                    protocol.stake(shared, &me, tokens(30)).unwrap();
                    let half = protocol.engine().share_balance(own, &me) / 2;
                    protocol.unstake(own, &me, half).unwrap();
                }
            });
        }
    });

    let engine = protocol.engine();
    let mut staked = 0;
    for curation in [CurationId(1), CurationId(2), shared] {
        let pool = engine.pool(curation).unwrap();
        let positions: TokenAmount = labels
            .iter()
            .map(|label| engine.share_balance(curation, &account(label)))
            .sum();
        assert_eq!(positions, pool.total_shares, "{curation}");
        staked += pool.total_tokens;
    }
    assert_eq!(engine.custody_balance(), staked + engine.total_thawing());

    // 1% of 80 tokens per round burned
    let taxes = WORKERS as u128 * ROUNDS * (tokens(50) + tokens(30)) / 100;
    assert_eq!(engine.total_supply(), supply_before - taxes);
    for label in &labels {
        assert_eq!(engine.balance_of(&account(label)), tokens(10_000) - ROUNDS * tokens(80));
        assert!(engine.thawing_request(CurationId(1), &account(label)).is_some()
            || engine.thawing_request(CurationId(2), &account(label)).is_some());
    }
}

// =============================================================================
// LOGGING
// =============================================================================

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[test]
fn test_committed_operations_log_once() {
    let (protocol, _) = setup(min_ten(), &[("alice", 1_000)]);
    let alice = account("alice");
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let shares = protocol.stake(CurationId(1), &alice, tokens(100)).unwrap();
        protocol.unstake(CurationId(1), &alice, shares / 2).unwrap();
        protocol
            .parameters()
            .set_thawing_period(&account("governor"), 5)
            .unwrap();
    });

    let lines = captured.lines();
    assert_eq!(lines.len(), 3, "{lines:#?}");
    assert!(lines[0].contains("staked"));
    assert!(lines[1].contains("unstake_locked"));
    assert!(lines[2].contains("parameter_updated"));
}

// =============================================================================
// GOVERNANCE
// =============================================================================

#[test]
fn test_only_governor_sets_parameters() {
    let (protocol, _) = setup(min_ten(), &[]);
    let governor = account("governor");
    let alice = account("alice");
    let store = protocol.parameters();

    assert_eq!(
        store.set_staking_tax_percentage(&alice, 10),
        Err(StakingError::Unauthorized(alice))
    );
    store.set_staking_tax_percentage(&governor, 10).unwrap();
    store.set_minimum_staking(&governor, tokens(1)).unwrap();
    store.set_channel_dispute_epochs(&governor, 4).unwrap();
    store.set_max_allocation_epochs(&governor, 9).unwrap();
    store.set_default_reserve_ratio(&governor, 1_000_000).unwrap();

    let updates = protocol
        .events()
        .snapshot()
        .into_iter()
        .filter(|event| matches!(event, ProtocolEvent::ParameterUpdated { .. }))
        .count();
    assert_eq!(updates, 5);
}

// =============================================================================
// REBATES
// =============================================================================

#[test]
fn test_rebate_settlement_after_dispute() {
    let (protocol, clock) = setup(min_ten(), &[("alice", 1_000)]);
    let alice = account("alice");
    let indexer = account("indexer");
    let usdc = Currency::new("USDC");

    protocol.stake(CurationId(3), &alice, tokens(200)).unwrap();
    protocol
        .open_allocation(AllocationId(11), CurationId(3), indexer)
        .unwrap();
    protocol.collect(&usdc, tokens(30), AllocationId(11)).unwrap();
    protocol.collect(&usdc, tokens(20), AllocationId(11)).unwrap();

    clock.advance(1);
    protocol.close_allocation(AllocationId(11), &indexer).unwrap();
    clock.advance(2);

    let half = RebateClaim {
        fees: tokens(25),
        total_fees: tokens(50),
        stake: tokens(100),
        total_stake: tokens(200),
    };
    let first = protocol.claim_rebate(AllocationId(11), &usdc, &half).unwrap();
    // (1/2)^α * (1/2)^(1-α) = 1/2 of 50
    assert!(close(first, tokens(25), 1_000_000), "first={first}");

    let everything = RebateClaim {
        fees: tokens(50),
        total_fees: tokens(50),
        stake: tokens(200),
        total_stake: tokens(200),
    };
    let second = protocol.claim_rebate(AllocationId(11), &usdc, &everything).unwrap();
    assert_eq!(second, tokens(50) - first);
    assert_eq!(protocol.rebates().unclaimed(AllocationId(11), &usdc), 0);

    let zero_fees = RebateClaim {
        fees: 0,
        total_fees: 0,
        ..everything
    };
    assert_eq!(protocol.claim_rebate(AllocationId(11), &usdc, &zero_fees).unwrap(), 0);
}

#[test]
fn test_collect_with_zero_fee_emits_nothing() {
    let (protocol, _) = setup(min_ten(), &[]);
    protocol
        .open_allocation(AllocationId(2), CurationId(1), account("indexer"))
        .unwrap();
    let before = protocol.events().len();
    let rebate = protocol
        .collect(&Currency::new("GRT"), 0, AllocationId(2))
        .unwrap();
    assert_eq!(rebate.fees_collected, 0);
    assert_eq!(protocol.events().len(), before);
}
