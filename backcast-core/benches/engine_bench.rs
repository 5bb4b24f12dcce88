use backcast_core::config::{
    CommissionConfig, FillPriceRule, MissingBarPolicy, RemainderPolicy, RiskMode, SizingPolicy,
    SlippageConfig,
};
use backcast_core::data::MemoryFeed;
use backcast_core::domain::Bar;
use backcast_core::strategy::MaCrossover;
use backcast_core::{run, BacktestConfig, RunContext};
use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal::Decimal;

fn config() -> BacktestConfig {
    BacktestConfig {
        start_date: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        end_date: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        symbols: vec!["SPY".into()],
        initial_cash: Decimal::from(100_000),
        fill_price_rule: FillPriceRule::NextOpen,
        slippage: SlippageConfig::FixedBps { bps: 5.0 },
        commission: CommissionConfig::PerShare { amount: "0.005".parse().unwrap() },
        participation_cap: 0.25,
        sizing: SizingPolicy::FractionalEquity { fraction: 0.5 },
        risk_mode: RiskMode::Clip,
        shorting_enabled: false,
        max_position_pct: 1.0,
        max_gross_exposure_pct: 1.0,
        latency_bars: 0,
        remainder_policy: RemainderPolicy::Requeue,
        missing_bar_policy: MissingBarPolicy::Skip,
        seed: 42,
    }
}

fn synthetic_bars(days: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..days)
        .map(|i| {
            let close = 100.0 + 20.0 * ((i as f64) * 0.05).sin();
            Bar {
                symbol: "SPY".into(),
                timestamp: start + Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.0,
                low: close - 1.2,
                close,
                volume: 500_000,
            }
        })
        .collect()
}

fn bench_full_run(c: &mut Criterion) {
    let config = config();
    let bars = synthetic_bars(2_520); // ten trading years

    c.bench_function("run_10y_daily_ma_crossover", |b| {
        b.iter_batched(
            || MemoryFeed::new(bars.clone(), &config).unwrap(),
            |mut feed| {
                let ctx = RunContext::new(&config, feed.dataset_hash());
                let mut strategy = MaCrossover::new(10, 30);
                run(&config, &mut feed, &mut strategy, &ctx).unwrap()
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_feed_validation(c: &mut Criterion) {
    let config = config();
    let bars = synthetic_bars(2_520);

    c.bench_function("memory_feed_validate_10y", |b| {
        b.iter_batched(
            || bars.clone(),
            |bars| MemoryFeed::new(bars, &config).unwrap(),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_full_run, bench_feed_validation);
criterion_main!(benches);
