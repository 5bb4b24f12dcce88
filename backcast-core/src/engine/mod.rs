//! The simulation loop.
//!
//! Single-threaded by construction: one queue, one ledger, one execution
//! book, events drained in total order. Determinism falls out of the queue's
//! (timestamp, type-priority, sequence) key plus seeded RNGs from the run
//! context.

pub mod context;

pub use context::RunContext;

use crate::config::BacktestConfig;
use crate::data::DataHandler;
use crate::domain::{Bar, OrderSide, RunId};
use crate::error::EngineError;
use crate::events::{EventPayload, EventQueue, FillEvent, MarketEvent};
use crate::execution::{ExecutionHandler, ExecutionReport};
use crate::ledger::{EquityCurve, Ledger, TradeLog};
use crate::strategy::Strategy;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Everything a finished run exposes.
pub struct RunResult {
    pub run_id: RunId,
    pub config_hash: String,
    pub dataset_hash: String,
    pub equity_curve: EquityCurve,
    pub trade_log: TradeLog,
    pub final_cash: Decimal,
    pub final_positions: HashMap<String, crate::domain::Position>,
    pub total_commission: Decimal,
    pub total_slippage: Decimal,
    pub events_processed: u64,
    pub bars_processed: u64,
    pub data_warnings: Vec<String>,
}

/// Run one backtest to completion.
///
/// The loop pulls a bar, enqueues it as a market event, then drains the
/// queue before pulling the next bar. Draining processes signals, orders,
/// and fills stamped with the same or earlier timestamps, so no component
/// ever acts on information from a bar it has not been shown.
pub fn run<D, S>(
    config: &BacktestConfig,
    data: &mut D,
    strategy: &mut S,
    ctx: &RunContext,
) -> Result<RunResult, EngineError>
where
    D: DataHandler,
    S: Strategy,
{
    let mut queue = EventQueue::new();
    let mut ledger = Ledger::new(config);
    let mut execution = ExecutionHandler::new(config, ctx.derive_rng("execution"));
    let mut last_bar: HashMap<String, Bar> = HashMap::new();
    // Cash owed to fills still in the queue; execution sees cash net of it.
    let mut pending_debit = Decimal::ZERO;
    let mut events_processed: u64 = 0;
    let mut bars_processed: u64 = 0;
    let mut last_timestamp: Option<DateTime<Utc>> = None;

    let data_warnings = data.warnings().to_vec();
    for warning in &data_warnings {
        warn!(%warning, "data quality");
    }
    info!(run_id = %ctx.run_id, seed = ctx.seed, "starting run");

    while let Some(bar) = data.next_bar() {
        if bar.timestamp > config.end_date {
            break;
        }
        last_timestamp = Some(bar.timestamp);
        bars_processed += 1;
        queue.push(EventPayload::Market(MarketEvent { bar }));

        while let Some(event) = queue.pop() {
            events_processed += 1;
            match event.payload {
                EventPayload::Market(market) => {
                    ledger.mark(&market)?;
                    let report =
                        execution.on_market(&market.bar, ledger.cash() - pending_debit);
                    absorb(&mut queue, &mut ledger, report, &mut pending_debit);
                    for signal in strategy.on_market(&market, event.sequence) {
                        queue.push(EventPayload::Signal(signal));
                    }
                    last_bar.insert(market.symbol().to_string(), market.bar);
                }
                EventPayload::Signal(signal) => {
                    if let Some(order) = ledger.on_signal(&signal) {
                        debug!(order = %order.id, symbol = %order.symbol, qty = order.quantity, "order emitted");
                        queue.push(EventPayload::Order(order));
                    }
                }
                EventPayload::Order(order) => {
                    let bar = last_bar
                        .get(&order.symbol)
                        .expect("order for a symbol that never produced a bar");
                    let report = execution.submit(order, bar, ledger.cash() - pending_debit);
                    absorb(&mut queue, &mut ledger, report, &mut pending_debit);
                }
                EventPayload::Fill(fill) => {
                    debug!(fill = %fill.id, symbol = %fill.symbol, qty = fill.quantity, "fill applied");
                    pending_debit -= buy_debit(&fill);
                    ledger.on_fill(&fill)?;
                }
            }
        }
        ledger.verify()?;
    }

    // Residual orders die with the run; record them for the audit trail.
    if let Some(timestamp) = last_timestamp {
        let report = execution.cancel_all(timestamp);
        for expiry in report.expiries {
            ledger.record_expiry(expiry.order_id, &expiry.symbol, expiry.timestamp, expiry.unfilled);
        }
    }

    info!(
        run_id = %ctx.run_id,
        bars = bars_processed,
        events = events_processed,
        final_cash = %ledger.cash(),
        "run complete"
    );

    Ok(RunResult {
        run_id: ctx.run_id.clone(),
        config_hash: ctx.config_hash.clone(),
        dataset_hash: ctx.dataset_hash.clone(),
        final_cash: ledger.cash(),
        final_positions: ledger.positions().clone(),
        total_commission: ledger.total_commission(),
        total_slippage: ledger.total_slippage(),
        equity_curve: ledger.equity_curve().clone(),
        trade_log: ledger.trade_log().clone(),
        events_processed,
        bars_processed,
        data_warnings,
    })
}

/// Feed an execution report back into the loop: fills become events,
/// expiries go straight to the trade log. Queued buy fills reserve their
/// debit until the ledger applies them.
fn absorb(
    queue: &mut EventQueue,
    ledger: &mut Ledger,
    report: ExecutionReport,
    pending_debit: &mut Decimal,
) {
    for fill in report.fills {
        *pending_debit += buy_debit(&fill);
        queue.push(EventPayload::Fill(fill));
    }
    for expiry in report.expiries {
        ledger.record_expiry(expiry.order_id, &expiry.symbol, expiry.timestamp, expiry.unfilled);
    }
}

/// Cash a fill will take out of the ledger (zero for sells).
fn buy_debit(fill: &FillEvent) -> Decimal {
    match fill.side {
        OrderSide::Buy => {
            fill.price * Decimal::from(fill.quantity) + fill.commission + fill.slippage
        }
        OrderSide::Sell => Decimal::ZERO,
    }
}
