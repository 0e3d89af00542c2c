//! End-to-end controller scenarios.
//!
//! Drives a real `RunController` (real builder, submitter and Momentum
//! call construction) against the in-memory `MockLedger`. Most scenarios
//! use an hour-long interval so only the inline first cycle and explicit
//! `run_cycle()` calls execute; the scheduler scenarios run on paused time.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use momentum_bot::engine::controller::{
    ControllerSettings, ControllerState, CycleReport, RunController, StartResult,
};
use momentum_bot::engine::events::{EventBus, SwapEvent};
use momentum_bot::keys::SigningIdentity;
use momentum_bot::pool::momentum::MomentumClmm;
use momentum_bot::types::{Network, SwapDirection, TradeSize, TradingConfiguration, SUI_COIN_TYPE};

use crate::mock_ledger::MockLedger;

const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const TOKEN_A: &str = "0xaaaa::token_a::A";
const TOKEN_B: &str = "0xbbbb::token_b::B";
const ONE: u128 = 1_000_000_000;

fn trading(trade_size: TradeSize) -> TradingConfiguration {
    TradingConfiguration {
        pool_id: "0xbeef".into(),
        base_token: TOKEN_A.into(),
        quote_token: TOKEN_B.into(),
        trade_size,
        slippage_tolerance: dec!(0.02),
        network: Network::Testnet,
        rpc_url: "http://localhost:9000".into(),
        clmm_package_id: "0x70285592c97965e811e0c6f98dccc3a9c2b4ad854b3594faab9597ada267b860".into(),
        global_config: "0x5".into(),
    }
}

/// Wallet with 1 SUI of gas and the given A/B balances (9 decimals each).
fn ledger(a: u128, b: u128) -> MockLedger {
    let ledger = MockLedger::new();
    ledger.set_balance(SUI_COIN_TYPE, ONE);
    ledger.set_balance(TOKEN_A, a);
    ledger.set_balance(TOKEN_B, b);
    ledger.set_decimals(TOKEN_A, 9);
    ledger.set_decimals(TOKEN_B, 9);
    ledger
}

fn controller(
    ledger: &MockLedger,
    trade_size: TradeSize,
    initial_direction: SwapDirection,
    events: EventBus,
) -> Arc<RunController> {
    controller_every(
        ledger,
        trade_size,
        initial_direction,
        events,
        Duration::from_secs(3600),
    )
}

fn controller_every(
    ledger: &MockLedger,
    trade_size: TradeSize,
    initial_direction: SwapDirection,
    events: EventBus,
    interval: Duration,
) -> Arc<RunController> {
    let identity = Arc::new(SigningIdentity::load(&SecretString::new(KEY.to_string())).unwrap());
    let pool = MomentumClmm::new(
        "0x70285592c97965e811e0c6f98dccc3a9c2b4ad854b3594faab9597ada267b860",
        "0x5",
    );
    Arc::new(RunController::new(
        trading(trade_size),
        identity,
        Arc::new(ledger.clone()),
        Arc::new(pool),
        events,
        ControllerSettings {
            interval,
            initial_direction,
            ..ControllerSettings::default()
        },
    ))
}

#[tokio::test]
async fn test_ineligible_source_flips_without_recording() {
    // A = 0.05 < 0.1, B = 10.
    let ledger = ledger(ONE / 20, 10 * ONE);
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(0.1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );

    assert_eq!(bot.start().await, StartResult::Started);

    assert_eq!(bot.direction().await, SwapDirection::QuoteToBase);
    let stats = bot.statistics().await;
    assert_eq!(stats.total_swaps, 0);
    assert_eq!(ledger.execution_count(), 0);
    bot.stop().await;
}

#[tokio::test]
async fn test_quote_to_base_success_flips_and_records() {
    let ledger = ledger(ONE / 20, 10 * ONE);
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(0.1)),
        SwapDirection::QuoteToBase,
        EventBus::new(),
    );

    assert_eq!(bot.start().await, StartResult::Started);

    let stats = bot.statistics().await;
    assert_eq!(stats.total_swaps, 1);
    assert_eq!(stats.successful_swaps, 1);
    assert_eq!(stats.total_volume, dec!(0.1));
    assert_eq!(stats.total_gas_spent, dec!(0.002));
    assert_eq!(bot.direction().await, SwapDirection::BaseToQuote);
    assert_eq!(ledger.execution_count(), 1);
    bot.stop().await;
}

#[tokio::test]
async fn test_use_entire_balance_with_empty_base_is_ineligible() {
    let ledger = ledger(0, 10 * ONE);
    let bot = controller(
        &ledger,
        TradeSize::UseEntireBalance,
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );

    assert_eq!(bot.start().await, StartResult::Started);

    assert_eq!(bot.direction().await, SwapDirection::QuoteToBase);
    assert_eq!(bot.statistics().await.total_swaps, 0);
    assert_eq!(ledger.execution_count(), 0);
    bot.stop().await;
}

#[tokio::test]
async fn test_directions_alternate_on_success() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );

    assert_eq!(bot.start().await, StartResult::Started);
    assert_eq!(bot.direction().await, SwapDirection::QuoteToBase);

    let report = bot.run_cycle().await;
    assert!(matches!(report, CycleReport::Completed(ref o) if o.success && o.from_token == TOKEN_B));
    assert_eq!(bot.direction().await, SwapDirection::BaseToQuote);

    let report = bot.run_cycle().await;
    assert!(matches!(report, CycleReport::Completed(ref o) if o.success && o.from_token == TOKEN_A));
    assert_eq!(bot.direction().await, SwapDirection::QuoteToBase);

    let stats = bot.statistics().await;
    assert_eq!(stats.total_swaps, 3);
    assert_eq!(stats.successful_swaps, 3);
    assert_eq!(stats.total_volume, dec!(3));
    assert_eq!(ledger.execution_count(), 3);
    bot.stop().await;
}

#[tokio::test]
async fn test_failed_swap_keeps_direction() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    ledger.set_onchain_failure("MoveAbort(trade, 4) in flash_swap");
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );

    assert_eq!(bot.start().await, StartResult::Started);
    assert_eq!(bot.direction().await, SwapDirection::BaseToQuote);

    let stats = bot.statistics().await;
    assert_eq!(stats.total_swaps, 1);
    assert_eq!(stats.failed_swaps, 1);
    assert_eq!(stats.total_volume, Decimal::ZERO);

    // Recovers once the chain accepts the swap.
    ledger.clear_onchain_failure();
    let report = bot.run_cycle().await;
    assert!(matches!(report, CycleReport::Completed(ref o) if o.success));
    assert_eq!(bot.direction().await, SwapDirection::QuoteToBase);
    bot.stop().await;
}

#[tokio::test]
async fn test_balance_read_failure_is_recorded_as_failed_swap() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );
    assert_eq!(bot.start().await, StartResult::Started);
    let direction = bot.direction().await;

    ledger.set_error("rpc unavailable");
    let report = bot.run_cycle().await;
    match report {
        CycleReport::Completed(outcome) => {
            assert!(!outcome.success);
            assert!(outcome.error.unwrap().contains("rpc unavailable"));
            assert_eq!(outcome.amount, dec!(1));
        }
        other => panic!("unexpected report: {other:?}"),
    }
    assert_eq!(bot.direction().await, direction);
    assert_eq!(bot.statistics().await.failed_swaps, 1);

    ledger.clear_error();
    bot.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );
    assert_eq!(bot.start().await, StartResult::Started);

    assert!(bot.stop().await);
    let before = bot.statistics().await;

    assert!(!bot.stop().await);
    assert_eq!(bot.state().await, ControllerState::Stopped);
    assert_eq!(bot.statistics().await, before);

    assert_eq!(bot.run_cycle().await, CycleReport::NotRunning);
    assert_eq!(bot.start().await, StartResult::AlreadyStopped);
    assert_eq!(bot.statistics().await, before);
}

#[tokio::test]
async fn test_preflight_rejects_low_gas() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    ledger.set_balance(SUI_COIN_TYPE, ONE / 100);
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );

    match bot.start().await {
        StartResult::PreflightFailed(reason) => assert!(reason.contains("minimum")),
        other => panic!("unexpected start result: {other:?}"),
    }
    assert_eq!(bot.state().await, ControllerState::Idle);
    assert_eq!(ledger.execution_count(), 0);
}

#[tokio::test]
async fn test_preflight_rejects_when_neither_side_is_tradeable() {
    let ledger = ledger(ONE / 20, ONE / 20);
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(0.1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );

    assert!(matches!(bot.start().await, StartResult::PreflightFailed(_)));
    assert!(!bot.stop().await);
}

#[tokio::test]
async fn test_start_twice_reports_already_running() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
    );
    assert_eq!(bot.start().await, StartResult::Started);
    assert_eq!(bot.start().await, StartResult::AlreadyRunning);
    assert_eq!(bot.statistics().await.total_swaps, 1);
    bot.stop().await;
}

#[tokio::test]
async fn test_event_stream_for_one_run() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let bot = controller(
        &ledger,
        TradeSize::FixedAmount(dec!(1)),
        SwapDirection::BaseToQuote,
        events,
    );

    bot.start().await;
    bot.stop().await;

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }

    assert!(matches!(seen.first(), Some(SwapEvent::BalanceSnapshot { .. })));
    assert!(seen.iter().any(|e| matches!(e, SwapEvent::Started { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, SwapEvent::CycleStarted { cycle: 1, direction: SwapDirection::BaseToQuote })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, SwapEvent::SwapCompleted { outcome, .. } if outcome.success)));
    match seen.last() {
        Some(SwapEvent::Stopped { stats }) => assert_eq!(stats.successful_swaps, 1),
        other => panic!("last event was {other:?}"),
    }
}

#[tokio::test]
async fn test_heuristic_decimals_without_metadata() {
    // No published metadata: USDC is treated as 6 decimals.
    const USDC: &str = "0xdba3::usdc::USDC";
    let ledger = MockLedger::new();
    ledger.set_balance(SUI_COIN_TYPE, ONE);
    ledger.set_balance(TOKEN_A, 0);
    ledger.set_balance(USDC, 2_500_000);

    let identity = Arc::new(SigningIdentity::load(&SecretString::new(KEY.to_string())).unwrap());
    let mut config = trading(TradeSize::UseEntireBalance);
    config.quote_token = USDC.into();
    let bot = Arc::new(RunController::new(
        config,
        identity,
        Arc::new(ledger.clone()),
        Arc::new(MomentumClmm::new("0x1", "0x5")),
        EventBus::new(),
        ControllerSettings {
            interval: Duration::from_secs(3600),
            initial_direction: SwapDirection::QuoteToBase,
            ..ControllerSettings::default()
        },
    ));

    assert_eq!(bot.start().await, StartResult::Started);
    let stats = bot.statistics().await;
    assert_eq!(stats.successful_swaps, 1);
    assert_eq!(stats.total_volume, dec!(2.5));
    assert_eq!(stats.total_volume_usd, dec!(2.5));
    bot.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_cycles_until_stopped() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    let bot = controller_every(
        &ledger,
        TradeSize::FixedAmount(dec!(0.1)),
        SwapDirection::BaseToQuote,
        EventBus::new(),
        Duration::from_secs(5),
    );

    assert_eq!(bot.start().await, StartResult::Started);
    assert_eq!(bot.statistics().await.total_swaps, 1);

    // Ticks at 5s, 10s and 15s.
    tokio::time::sleep(Duration::from_secs(16)).await;
    let running = bot.statistics().await.total_swaps;
    assert_eq!(running, 4);
    assert_eq!(ledger.execution_count(), 4);

    assert!(bot.stop().await);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(bot.statistics().await.total_swaps, running);
    assert_eq!(ledger.execution_count(), 4);
    assert_eq!(bot.state().await, ControllerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_tick_during_slow_cycle_is_skipped() {
    let ledger = ledger(10 * ONE, 10 * ONE);
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let bot = controller_every(
        &ledger,
        TradeSize::FixedAmount(dec!(0.1)),
        SwapDirection::BaseToQuote,
        events,
        Duration::from_secs(5),
    );

    assert_eq!(bot.start().await, StartResult::Started);

    // The cycle started at 5s is still executing when the 10s tick fires.
    ledger.set_execution_delay(Duration::from_secs(7));
    tokio::time::sleep(Duration::from_secs(11)).await;

    let mut skipped = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SwapEvent::CycleSkipped { cycle } = event {
            skipped.push(cycle);
        }
    }
    assert_eq!(skipped, vec![3]);
    assert_eq!(bot.statistics().await.total_swaps, 1);

    // The slow cycle still completes and is recorded.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(bot.statistics().await.total_swaps, 2);
    bot.stop().await;
}
