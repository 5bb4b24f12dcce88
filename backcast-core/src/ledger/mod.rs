//! Portfolio ledger — the authoritative cash/position/equity state.
//!
//! The ledger is the only component that mutates portfolio state, and it
//! only does so through processed events: signals become orders (after
//! sizing and risk controls), fills move cash and positions. Every decision
//! leaves a trace in the trade log, and every state change appends an
//! equity snapshot.

pub mod replay;
pub mod risk;
pub mod sizing;

pub use replay::{replay_trade_log, LedgerSnapshot};
pub use risk::{RejectReason, RiskDecision};

use crate::config::{BacktestConfig, RiskMode};
use crate::domain::{IdGen, OrderId, OrderKind, OrderSide, Position, TimeInForce};
use crate::error::EngineError;
use crate::events::{FillEvent, MarketEvent, OrderEvent, SignalDirection, SignalEvent};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One mark-to-market snapshot on the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub cash: Decimal,
    pub market_value: Decimal,
    pub equity: Decimal,
}

/// Append-only equity curve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    fn push(&mut self, point: EquityPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Entry in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeRecord {
    Fill(FillEvent),
    Rejected(RiskDecision),
    Expired {
        order_id: OrderId,
        symbol: String,
        timestamp: DateTime<Utc>,
        unfilled: i64,
    },
}

/// Append-only trade log: processed fills plus rejected/expired orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeLog {
    records: Vec<TradeRecord>,
}

impl TradeLog {
    /// Rebuild a log from archived records (artifact import).
    pub fn from_records(records: Vec<TradeRecord>) -> Self {
        Self { records }
    }

    fn push(&mut self, record: TradeRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn fills(&self) -> impl Iterator<Item = &FillEvent> {
        self.records.iter().filter_map(|r| match r {
            TradeRecord::Fill(f) => Some(f),
            _ => None,
        })
    }

    pub fn rejections(&self) -> impl Iterator<Item = &RiskDecision> {
        self.records.iter().filter_map(|r| match r {
            TradeRecord::Rejected(d) => Some(d),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Portfolio ledger.
pub struct Ledger {
    cash: Decimal,
    initial_cash: Decimal,
    positions: HashMap<String, Position>,
    last_price: HashMap<String, Decimal>,
    /// Unfilled quantity per live order; fills must match an entry.
    outstanding: HashMap<OrderId, i64>,
    /// Signed notional plus costs across all fills, accumulated separately
    /// from `cash` so the two can be cross-checked.
    net_outlay: Decimal,
    equity_curve: EquityCurve,
    trade_log: TradeLog,
    total_commission: Decimal,
    total_slippage: Decimal,
    order_ids: IdGen,
    config: LedgerConfig,
}

/// The slice of the backtest config the ledger acts on.
#[derive(Debug, Clone)]
struct LedgerConfig {
    sizing: crate::config::SizingPolicy,
    risk_mode: RiskMode,
    shorting_enabled: bool,
    max_position_pct: f64,
    max_gross_exposure_pct: f64,
}

impl Ledger {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            cash: config.initial_cash,
            initial_cash: config.initial_cash,
            positions: HashMap::new(),
            last_price: HashMap::new(),
            outstanding: HashMap::new(),
            net_outlay: Decimal::ZERO,
            equity_curve: EquityCurve::default(),
            trade_log: TradeLog::default(),
            total_commission: Decimal::ZERO,
            total_slippage: Decimal::ZERO,
            order_ids: IdGen::new(),
            config: LedgerConfig {
                sizing: config.sizing,
                risk_mode: config.risk_mode,
                shorting_enabled: config.shorting_enabled,
                max_position_pct: config.max_position_pct,
                max_gross_exposure_pct: config.max_gross_exposure_pct,
            },
        }
    }

    /// Record the latest price for a symbol and append a mark-to-market
    /// snapshot.
    pub fn mark(&mut self, event: &MarketEvent) -> Result<(), EngineError> {
        self.last_price
            .insert(event.symbol().to_string(), crate::domain::to_price(event.bar.close));
        self.snapshot(event.timestamp())
    }

    /// Translate a signal into an order, applying sizing and risk controls.
    ///
    /// Returns `None` when the signal is rejected (or sizes to zero); the
    /// decision is recorded in the trade log either way.
    pub fn on_signal(&mut self, signal: &SignalEvent) -> Option<OrderEvent> {
        let price = match self.last_price.get(&signal.symbol) {
            Some(p) => *p,
            None => {
                self.log_rejection(signal, RejectReason::NoPriceForSymbol, 0, 0);
                return None;
            }
        };

        let position = self.positions.get(&signal.symbol);
        let (side, requested) = match signal.direction {
            SignalDirection::Long => (
                OrderSide::Buy,
                sizing::target_quantity(&self.config.sizing, signal.strength, self.equity(), price),
            ),
            SignalDirection::Short => (
                OrderSide::Sell,
                sizing::target_quantity(&self.config.sizing, signal.strength, self.equity(), price),
            ),
            SignalDirection::Exit => {
                let qty = position.map_or(0, |p| p.quantity);
                if qty == 0 {
                    self.log_rejection(signal, RejectReason::ExitWithoutPosition, 0, 0);
                    return None;
                }
                let side = if qty > 0 { OrderSide::Sell } else { OrderSide::Buy };
                (side, qty.abs())
            }
        };

        if requested <= 0 {
            self.log_rejection(signal, RejectReason::ZeroQuantity, requested, 0);
            return None;
        }

        // Exit orders only reduce; they bypass the opening-risk caps.
        let granted = if signal.direction == SignalDirection::Exit {
            requested
        } else {
            match self.apply_risk_controls(signal, side, requested, price) {
                Some(qty) => qty,
                None => return None,
            }
        };

        let order = OrderEvent {
            id: self.order_ids.next_order_id(),
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
            side,
            quantity: granted,
            kind: OrderKind::Market,
            time_in_force: TimeInForce::GoodTillCancel,
            signal_id: signal.id,
        };
        self.outstanding.insert(order.id, order.quantity);
        Some(order)
    }

    /// Evaluate risk caps; returns the granted quantity or `None` if rejected.
    fn apply_risk_controls(
        &mut self,
        signal: &SignalEvent,
        side: OrderSide,
        requested: i64,
        price: Decimal,
    ) -> Option<i64> {
        let position = self.positions.get(&signal.symbol);
        let inputs = risk::RiskInputs {
            cash: self.cash,
            equity: self.equity(),
            gross_exposure: self.gross_exposure(),
            position,
            price,
            side,
        };

        // Each cap paired with the reason it would report. Caps are checked
        // strictly, so when several tie the first one checked is the reason
        // recorded: shorting, then affordability, then the sizing caps.
        let mut binding: Option<RejectReason> = None;
        let mut allowed = requested;

        if risk::creates_short(position, side, requested) && !self.config.shorting_enabled {
            let reduce_only = position.map_or(0, |p| p.quantity.max(0));
            if reduce_only < allowed {
                allowed = reduce_only;
                binding = Some(RejectReason::ShortingDisabled);
            }
        }

        let cash_cap = risk::cash_cap(&inputs);
        if cash_cap < allowed {
            allowed = cash_cap;
            binding = Some(RejectReason::InsufficientCash);
        }

        let pos_cap = risk::max_position_cap(&inputs, self.config.max_position_pct);
        if pos_cap < allowed {
            allowed = pos_cap;
            binding = Some(RejectReason::MaxPositionSize);
        }

        let gross_cap = risk::gross_exposure_cap(&inputs, self.config.max_gross_exposure_pct);
        if gross_cap < allowed {
            allowed = gross_cap;
            binding = Some(RejectReason::GrossExposure);
        }

        match binding {
            None => Some(requested),
            Some(reason) => match self.config.risk_mode {
                RiskMode::Reject => {
                    self.log_rejection(signal, reason, requested, 0);
                    None
                }
                RiskMode::Clip if allowed <= 0 => {
                    self.log_rejection(signal, reason, requested, 0);
                    None
                }
                RiskMode::Clip => {
                    self.log_rejection(signal, reason, requested, allowed);
                    Some(allowed)
                }
            },
        }
    }

    /// Apply a processed fill: position, cash, equity snapshot, trade log.
    ///
    /// The fill must reference an order this ledger emitted and must not
    /// exceed its unfilled quantity; either violation aborts the run.
    pub fn on_fill(&mut self, fill: &FillEvent) -> Result<(), EngineError> {
        let remaining = match self.outstanding.get_mut(&fill.order_id) {
            None => {
                return Err(EngineError::FillForUnknownOrder(fill.order_id.to_string()));
            }
            Some(outstanding) => {
                if fill.quantity > *outstanding {
                    return Err(EngineError::Overfill {
                        order: fill.order_id.to_string(),
                        filled: fill.quantity,
                        remaining: *outstanding,
                    });
                }
                *outstanding -= fill.quantity;
                *outstanding
            }
        };
        if remaining == 0 {
            self.outstanding.remove(&fill.order_id);
        }

        let position = self
            .positions
            .entry(fill.symbol.clone())
            .or_insert_with(|| Position::flat(fill.symbol.clone()));
        position.apply(fill.signed_quantity(), fill.price);

        let notional = fill.price * Decimal::from(fill.quantity);
        match fill.side {
            OrderSide::Buy => self.cash -= notional,
            OrderSide::Sell => self.cash += notional,
        }
        self.cash -= fill.commission + fill.slippage;
        // Signed-arithmetic mirror of the cash update above; the snapshot
        // cross-checks the two.
        self.net_outlay += Decimal::from(fill.signed_quantity()) * fill.price
            + fill.commission
            + fill.slippage;
        self.total_commission += fill.commission;
        self.total_slippage += fill.slippage;

        if self.cash < Decimal::ZERO && !self.config.shorting_enabled {
            return Err(EngineError::NegativeCash {
                cash: self.cash.to_string(),
            });
        }

        self.trade_log.push(TradeRecord::Fill(fill.clone()));
        self.snapshot(fill.timestamp)
    }

    /// Record the expiry of a residual order (for auditability).
    pub fn record_expiry(
        &mut self,
        order_id: OrderId,
        symbol: &str,
        timestamp: DateTime<Utc>,
        unfilled: i64,
    ) {
        self.outstanding.remove(&order_id);
        self.trade_log.push(TradeRecord::Expired {
            order_id,
            symbol: symbol.to_string(),
            timestamp,
            unfilled,
        });
    }

    fn log_rejection(
        &mut self,
        signal: &SignalEvent,
        reason: RejectReason,
        requested: i64,
        granted: i64,
    ) {
        self.trade_log.push(TradeRecord::Rejected(RiskDecision {
            signal_id: signal.id,
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
            reason,
            requested,
            granted,
        }));
    }

    /// Append an equity snapshot and verify the accounting identity.
    fn snapshot(&mut self, timestamp: DateTime<Utc>) -> Result<(), EngineError> {
        let market_value = self.market_value();
        let equity = self.cash + market_value;

        // Double-entry check: cash mutated fill by fill must equal initial
        // cash minus the separately accumulated outlay.
        if self.cash != self.initial_cash - self.net_outlay {
            return Err(EngineError::EquityIdentityViolation {
                timestamp,
                equity: equity.to_string(),
                cash: self.cash.to_string(),
                market_value: market_value.to_string(),
            });
        }

        self.equity_curve.push(EquityPoint {
            timestamp,
            cash: self.cash,
            market_value,
            equity,
        });
        Ok(())
    }

    /// Check the equity identity on the latest archived snapshot.
    ///
    /// `equity == cash + sum(qty_i * last_price_i)` must hold exactly; the
    /// archived point is compared against a fresh recomputation from the
    /// position map and current marks.
    pub fn verify(&self) -> Result<(), EngineError> {
        let Some(point) = self.equity_curve.last() else {
            return Ok(());
        };
        let market_value = self.market_value();
        let equity = self.cash + market_value;
        if point.equity != equity || point.cash != self.cash {
            return Err(EngineError::EquityIdentityViolation {
                timestamp: point.timestamp,
                equity: point.equity.to_string(),
                cash: self.cash.to_string(),
                market_value: market_value.to_string(),
            });
        }
        Ok(())
    }

    /// Current mark-to-market value of all positions.
    pub fn market_value(&self) -> Decimal {
        self.positions
            .values()
            .map(|p| {
                let price = self.last_price.get(&p.symbol).copied().unwrap_or(p.avg_cost);
                p.market_value(price)
            })
            .sum()
    }

    /// Sum of |position notional| across symbols.
    pub fn gross_exposure(&self) -> Decimal {
        self.positions
            .values()
            .map(|p| {
                let price = self.last_price.get(&p.symbol).copied().unwrap_or(p.avg_cost);
                p.market_value(price).abs()
            })
            .sum()
    }

    pub fn equity(&self) -> Decimal {
        self.cash + self.market_value()
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn initial_cash(&self) -> Decimal {
        self.initial_cash
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol).filter(|p| !p.is_flat())
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.last_price.get(symbol).copied()
    }

    pub fn equity_curve(&self) -> &EquityCurve {
        &self.equity_curve
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.trade_log
    }

    pub fn total_commission(&self) -> Decimal {
        self.total_commission
    }

    pub fn total_slippage(&self) -> Decimal {
        self.total_slippage
    }
}
