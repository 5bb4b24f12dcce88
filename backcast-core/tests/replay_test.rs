//! A finished run must be exactly reproducible from its trade log.

use backcast_core::config::{
    CommissionConfig, FillPriceRule, MissingBarPolicy, RemainderPolicy, RiskMode, SizingPolicy,
    SlippageConfig,
};
use backcast_core::data::MemoryFeed;
use backcast_core::domain::Bar;
use backcast_core::ledger::replay_trade_log;
use backcast_core::strategy::MaCrossover;
use backcast_core::{run, BacktestConfig, RunContext};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

fn bars() -> Vec<Bar> {
    (1..=28)
        .map(|day| {
            let close = 80.0 + ((day * 13) % 17) as f64;
            Bar {
                symbol: "SPY".into(),
                timestamp: Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0).unwrap(),
                open: close - 0.25,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 120_000,
            }
        })
        .collect()
}

fn config() -> BacktestConfig {
    BacktestConfig {
        start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        end_date: Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        symbols: vec!["SPY".into()],
        initial_cash: Decimal::from(100_000),
        fill_price_rule: FillPriceRule::NextOpen,
        slippage: SlippageConfig::FixedBps { bps: 5.0 },
        commission: CommissionConfig::PerShare { amount: "0.005".parse().unwrap() },
        participation_cap: 0.2,
        sizing: SizingPolicy::FractionalEquity { fraction: 0.4 },
        risk_mode: RiskMode::Clip,
        shorting_enabled: false,
        max_position_pct: 1.0,
        max_gross_exposure_pct: 1.0,
        latency_bars: 0,
        remainder_policy: RemainderPolicy::Requeue,
        missing_bar_policy: MissingBarPolicy::Skip,
        seed: 7,
    }
}

#[test]
fn replaying_the_trade_log_reproduces_final_state() {
    let config = config();
    let mut feed = MemoryFeed::new(bars(), &config).unwrap();
    let ctx = RunContext::new(&config, feed.dataset_hash());
    let mut strategy = MaCrossover::new(3, 7);

    let result = run(&config, &mut feed, &mut strategy, &ctx).unwrap();
    assert!(result.trade_log.fills().count() > 0, "scenario must trade");

    let snapshot = replay_trade_log(config.initial_cash, &result.trade_log);

    assert_eq!(snapshot.cash, result.final_cash);
    assert_eq!(snapshot.total_commission, result.total_commission);
    assert_eq!(snapshot.total_slippage, result.total_slippage);
    for (symbol, position) in &result.final_positions {
        let replayed = snapshot.positions.get(symbol).unwrap();
        assert_eq!(replayed.quantity, position.quantity);
        assert_eq!(replayed.avg_cost, position.avg_cost);
        assert_eq!(replayed.realized_pnl, position.realized_pnl);
    }
}

#[test]
fn replay_of_empty_log_is_initial_state() {
    let config = config();
    let snapshot = replay_trade_log(config.initial_cash, &Default::default());
    assert_eq!(snapshot.cash, config.initial_cash);
    assert!(snapshot.positions.is_empty());
}
