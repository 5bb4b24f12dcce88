//! Execution simulation — turns orders into fills against market bars.
//!
//! The handler keeps an open-order book. Orders fill at most once per bar,
//! capped by a participation limit on the bar's volume; residual quantity is
//! requeued or cancelled per configuration, and time-in-force bounds how
//! many eligible bars an order may live.

pub mod commission;
pub mod slippage;

use crate::config::{BacktestConfig, FillPriceRule, RemainderPolicy, RiskMode};
use crate::domain::{to_cents, to_price, Bar, IdGen, OrderId, OrderKind, OrderSide, TimeInForce};
use crate::events::{FillEvent, OrderEvent};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// A residual order removed from the book without filling completely.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderExpiry {
    pub order_id: OrderId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub unfilled: i64,
}

/// Everything one call to the handler produced.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub fills: Vec<FillEvent>,
    pub expiries: Vec<OrderExpiry>,
}

struct OpenOrder {
    order: OrderEvent,
    filled: i64,
    /// Bars for this symbol seen since submission (latency gate).
    bars_waited: u32,
    /// Bars on which a fill was actually attempted (time-in-force gate).
    eligible_bars_used: u32,
}

impl OpenOrder {
    fn remaining(&self) -> i64 {
        self.order.quantity - self.filled
    }
}

enum Disposition {
    Keep,
    Done,
    Expire,
}

/// Simulated execution venue.
pub struct ExecutionHandler {
    open_orders: Vec<OpenOrder>,
    fill_ids: IdGen,
    rng: StdRng,
    fill_price_rule: FillPriceRule,
    slippage: crate::config::SlippageConfig,
    commission: crate::config::CommissionConfig,
    participation_cap: f64,
    latency_bars: u32,
    remainder_policy: RemainderPolicy,
    risk_mode: RiskMode,
    /// Without margin a buy may not spend more cash than the ledger holds.
    cash_constrained: bool,
}

impl ExecutionHandler {
    pub fn new(config: &BacktestConfig, rng: StdRng) -> Self {
        Self {
            open_orders: Vec::new(),
            fill_ids: IdGen::new(),
            rng,
            fill_price_rule: config.fill_price_rule,
            slippage: config.slippage,
            commission: config.commission.clone(),
            participation_cap: config.participation_cap,
            latency_bars: config.latency_bars,
            remainder_policy: config.remainder_policy,
            risk_mode: config.risk_mode,
            cash_constrained: !config.shorting_enabled,
        }
    }

    pub fn open_order_count(&self) -> usize {
        self.open_orders.len()
    }

    /// Accept a new order.
    ///
    /// Under `CLOSE` and `MID` pricing with zero latency the order is
    /// eligible against the bar that produced it; under `NEXT_OPEN` it
    /// always parks until the symbol's next bar. `available_cash` is the
    /// ledger's cash at submission, bounding any immediate buy fill.
    pub fn submit(
        &mut self,
        order: OrderEvent,
        current_bar: &Bar,
        available_cash: Decimal,
    ) -> ExecutionReport {
        let mut open = OpenOrder {
            order,
            filled: 0,
            bars_waited: 0,
            eligible_bars_used: 0,
        };
        let mut report = ExecutionReport::default();

        let immediate = self.latency_bars == 0
            && !matches!(self.fill_price_rule, FillPriceRule::NextOpen)
            && current_bar.symbol == open.order.symbol;
        if immediate {
            let base = self.base_price(current_bar, open.order.side);
            let disposition =
                self.attempt(&mut open, current_bar, base, available_cash, &mut report);
            self.settle(open, current_bar.timestamp, disposition, &mut report);
        } else {
            self.open_orders.push(open);
        }
        report
    }

    /// Process a new bar: advance latency clocks and attempt fills for every
    /// open order on the bar's symbol. `available_cash` is the ledger's cash
    /// going into the bar.
    pub fn on_market(&mut self, bar: &Bar, available_cash: Decimal) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let book = std::mem::take(&mut self.open_orders);
        let mut cash = available_cash;

        for mut open in book {
            if open.order.symbol != bar.symbol {
                self.open_orders.push(open);
                continue;
            }
            open.bars_waited += 1;
            if open.bars_waited <= self.latency_bars {
                self.open_orders.push(open);
                continue;
            }
            let base = self.base_price(bar, open.order.side);
            let before = report.fills.len();
            let disposition = self.attempt(&mut open, bar, base, cash, &mut report);
            for fill in &report.fills[before..] {
                if fill.side == OrderSide::Buy {
                    cash -= fill.price * Decimal::from(fill.quantity)
                        + fill.commission
                        + fill.slippage;
                }
            }
            self.settle(open, bar.timestamp, disposition, &mut report);
        }
        report
    }

    /// Drop every open order, reporting each as an expiry (end of run).
    pub fn cancel_all(&mut self, timestamp: DateTime<Utc>) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        for open in std::mem::take(&mut self.open_orders) {
            report.expiries.push(OrderExpiry {
                order_id: open.order.id,
                symbol: open.order.symbol.clone(),
                timestamp,
                unfilled: open.remaining(),
            });
        }
        report
    }

    /// Reference price for the configured rule, before limit adjustment.
    fn base_price(&self, bar: &Bar, side: OrderSide) -> f64 {
        match self.fill_price_rule {
            FillPriceRule::NextOpen => bar.open,
            FillPriceRule::Close => bar.close,
            FillPriceRule::Mid { spread_bps } => {
                let half_spread = bar.close * spread_bps / 2.0 / 10_000.0;
                match side {
                    OrderSide::Buy => bar.close + half_spread,
                    OrderSide::Sell => bar.close - half_spread,
                }
            }
        }
    }

    /// One fill attempt for one order against one bar.
    ///
    /// The fill price is only known here, so buy affordability is re-checked
    /// against `available_cash` at this price, costs included. A buy the
    /// ledger could afford at signal time can gap beyond its cash by fill
    /// time; the attempt clips or expires it instead of booking a fill the
    /// ledger would reject.
    fn attempt(
        &mut self,
        open: &mut OpenOrder,
        bar: &Bar,
        base_price: f64,
        available_cash: Decimal,
        report: &mut ExecutionReport,
    ) -> Disposition {
        open.eligible_bars_used += 1;

        let price = match open.order.kind {
            OrderKind::Market => Some(base_price),
            OrderKind::Limit { limit_price } => match open.order.side {
                // A buy limit crosses when the bar trades at or below it.
                OrderSide::Buy if bar.low <= limit_price => Some(base_price.min(limit_price)),
                // A sell limit crosses when the bar trades at or above it.
                OrderSide::Sell if bar.high >= limit_price => Some(base_price.max(limit_price)),
                _ => None,
            },
        };

        let mut filled_now = 0;
        if let Some(price) = price {
            let cap = (self.participation_cap * bar.volume as f64).floor() as i64;
            let mut quantity = open.remaining().min(cap);
            let price = to_price(price);

            if quantity > 0
                && self.cash_constrained
                && open.order.side == OrderSide::Buy
                && price > Decimal::ZERO
            {
                let affordable = (available_cash / price).floor().to_i64().unwrap_or(0).max(0);
                if affordable < quantity {
                    match self.risk_mode {
                        RiskMode::Clip => quantity = affordable,
                        RiskMode::Reject => return Disposition::Expire,
                    }
                }
            }

            if quantity > 0 {
                let sampled_bps = slippage::sample_random_bps(&self.slippage, &mut self.rng);
                let mut notional = to_cents(price * Decimal::from(quantity));
                let mut commission =
                    commission::commission_cost(&self.commission, quantity, notional);
                let mut slippage = slippage::slippage_cost(
                    &self.slippage,
                    quantity,
                    notional,
                    bar.volume,
                    sampled_bps,
                );

                // Costs can push a buy past its cash; shave shares until the
                // exact debit the ledger will book (unrounded notional plus
                // costs) fits. Costs are non-increasing in quantity, so this
                // terminates.
                if self.cash_constrained && open.order.side == OrderSide::Buy {
                    let mut debit = price * Decimal::from(quantity) + commission + slippage;
                    while quantity > 0 && debit > available_cash {
                        let shave =
                            ((debit - available_cash) / price).ceil().to_i64().unwrap_or(1).max(1);
                        quantity -= shave.min(quantity);
                        notional = to_cents(price * Decimal::from(quantity));
                        commission =
                            commission::commission_cost(&self.commission, quantity, notional);
                        slippage = slippage::slippage_cost(
                            &self.slippage,
                            quantity,
                            notional,
                            bar.volume,
                            sampled_bps,
                        );
                        debit = price * Decimal::from(quantity) + commission + slippage;
                    }
                }

                if quantity > 0 {
                    filled_now = quantity;
                    open.filled += filled_now;
                    report.fills.push(FillEvent {
                        id: self.fill_ids.next_fill_id(),
                        order_id: open.order.id,
                        symbol: open.order.symbol.clone(),
                        timestamp: bar.timestamp,
                        side: open.order.side,
                        quantity: filled_now,
                        price,
                        commission,
                        slippage,
                        remaining: open.remaining(),
                    });
                }
            }
        }

        if open.remaining() == 0 {
            return Disposition::Done;
        }
        if filled_now > 0 && self.remainder_policy == RemainderPolicy::Cancel {
            return Disposition::Expire;
        }
        match open.order.time_in_force {
            TimeInForce::Day => Disposition::Expire,
            TimeInForce::GoodForBars(n) if open.eligible_bars_used >= n => Disposition::Expire,
            _ => Disposition::Keep,
        }
    }

    fn settle(
        &mut self,
        open: OpenOrder,
        timestamp: DateTime<Utc>,
        disposition: Disposition,
        report: &mut ExecutionReport,
    ) {
        match disposition {
            Disposition::Keep => self.open_orders.push(open),
            Disposition::Done => {}
            Disposition::Expire => report.expiries.push(OrderExpiry {
                order_id: open.order.id,
                symbol: open.order.symbol.clone(),
                timestamp,
                unfilled: open.remaining(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use crate::config::{CommissionConfig, SlippageConfig};
    use crate::domain::SignalId;
    use chrono::TimeZone;
    use rand::SeedableRng;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn bar(day: u32, open: f64, close: f64, volume: u64) -> Bar {
        Bar {
            symbol: "SPY".into(),
            timestamp: ts(day),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume,
        }
    }

    fn order(quantity: i64, side: OrderSide, tif: TimeInForce) -> OrderEvent {
        OrderEvent {
            id: OrderId(1),
            symbol: "SPY".into(),
            timestamp: ts(1),
            side,
            quantity,
            kind: OrderKind::Market,
            time_in_force: tif,
            signal_id: SignalId(1),
        }
    }

    fn handler(config: &BacktestConfig) -> ExecutionHandler {
        ExecutionHandler::new(config, StdRng::seed_from_u64(config.seed))
    }

    /// Cash that never binds any fill in these tests.
    fn ample() -> Decimal {
        Decimal::from(100_000_000)
    }

    #[test]
    fn next_open_parks_until_following_bar() {
        let config = sample_config();
        let mut exec = handler(&config);

        let report = exec.submit(order(100, OrderSide::Buy, TimeInForce::GoodTillCancel), &bar(1, 49.0, 50.0, 100_000), ample());
        assert!(report.fills.is_empty());
        assert_eq!(exec.open_order_count(), 1);

        let report = exec.on_market(&bar(2, 51.0, 52.0, 100_000), ample());
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.fills[0].price, Decimal::from(51));
        assert_eq!(report.fills[0].quantity, 100);
        assert_eq!(report.fills[0].remaining, 0);
        assert_eq!(exec.open_order_count(), 0);
    }

    #[test]
    fn close_rule_fills_on_submission_bar() {
        let mut config = sample_config();
        config.fill_price_rule = FillPriceRule::Close;
        let mut exec = handler(&config);

        let report = exec.submit(order(100, OrderSide::Buy, TimeInForce::GoodTillCancel), &bar(1, 49.0, 50.0, 100_000), ample());
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.fills[0].price, Decimal::from(50));
    }

    #[test]
    fn mid_rule_is_side_adverse() {
        let mut config = sample_config();
        config.fill_price_rule = FillPriceRule::Mid { spread_bps: 20.0 };
        let mut exec = handler(&config);

        // Half-spread of 10 bps on a 100.00 close = 0.10.
        let b = bar(1, 99.0, 100.0, 100_000);
        let buy = exec.submit(order(10, OrderSide::Buy, TimeInForce::GoodTillCancel), &b, ample());
        assert_eq!(buy.fills[0].price, "100.1".parse::<Decimal>().unwrap());

        let sell = exec.submit(order(10, OrderSide::Sell, TimeInForce::GoodTillCancel), &b, ample());
        assert_eq!(sell.fills[0].price, "99.9".parse::<Decimal>().unwrap());
    }

    #[test]
    fn participation_cap_splits_fill_and_requeues() {
        let config = sample_config(); // cap 0.1, requeue
        let mut exec = handler(&config);

        exec.submit(order(10_000, OrderSide::Buy, TimeInForce::GoodTillCancel), &bar(1, 50.0, 50.0, 50_000), ample());
        let report = exec.on_market(&bar(2, 50.0, 50.0, 50_000), ample());
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.fills[0].quantity, 5_000);
        assert_eq!(report.fills[0].remaining, 5_000);
        assert_eq!(exec.open_order_count(), 1);

        let report = exec.on_market(&bar(3, 50.0, 50.0, 50_000), ample());
        assert_eq!(report.fills[0].quantity, 5_000);
        assert_eq!(report.fills[0].remaining, 0);
        assert_eq!(exec.open_order_count(), 0);
    }

    #[test]
    fn cancel_policy_expires_remainder_after_partial() {
        let mut config = sample_config();
        config.remainder_policy = RemainderPolicy::Cancel;
        let mut exec = handler(&config);

        exec.submit(order(10_000, OrderSide::Buy, TimeInForce::GoodTillCancel), &bar(1, 50.0, 50.0, 50_000), ample());
        let report = exec.on_market(&bar(2, 50.0, 50.0, 50_000), ample());
        assert_eq!(report.fills[0].quantity, 5_000);
        assert_eq!(report.expiries.len(), 1);
        assert_eq!(report.expiries[0].unfilled, 5_000);
        assert_eq!(exec.open_order_count(), 0);
    }

    #[test]
    fn day_order_expires_after_first_eligible_bar() {
        let config = sample_config();
        let mut exec = handler(&config);

        // Zero volume: nothing can fill under the participation cap.
        exec.submit(order(100, OrderSide::Buy, TimeInForce::Day), &bar(1, 50.0, 50.0, 0), ample());
        let report = exec.on_market(&bar(2, 50.0, 50.0, 0), ample());
        assert!(report.fills.is_empty());
        assert_eq!(report.expiries.len(), 1);
        assert_eq!(report.expiries[0].unfilled, 100);
    }

    #[test]
    fn good_for_bars_expires_after_n_attempts() {
        let config = sample_config();
        let mut exec = handler(&config);

        exec.submit(order(100, OrderSide::Buy, TimeInForce::GoodForBars(2)), &bar(1, 50.0, 50.0, 0), ample());
        assert!(exec.on_market(&bar(2, 50.0, 50.0, 0), ample()).expiries.is_empty());
        let report = exec.on_market(&bar(3, 50.0, 50.0, 0), ample());
        assert_eq!(report.expiries.len(), 1);
    }

    #[test]
    fn latency_delays_first_attempt() {
        let mut config = sample_config();
        config.latency_bars = 1;
        let mut exec = handler(&config);

        exec.submit(order(100, OrderSide::Buy, TimeInForce::GoodTillCancel), &bar(1, 50.0, 50.0, 100_000), ample());
        assert!(exec.on_market(&bar(2, 51.0, 51.0, 100_000), ample()).fills.is_empty());
        let report = exec.on_market(&bar(3, 52.0, 52.0, 100_000), ample());
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.fills[0].price, Decimal::from(52));
    }

    #[test]
    fn buy_limit_only_crosses_at_or_below_limit() {
        let config = sample_config();
        let mut exec = handler(&config);

        let mut o = order(100, OrderSide::Buy, TimeInForce::GoodTillCancel);
        o.kind = OrderKind::Limit { limit_price: 48.0 };
        exec.submit(o, &bar(1, 50.0, 50.0, 100_000), ample());

        // Low is 49.0: no cross.
        let b = Bar { low: 49.0, ..bar(2, 50.0, 50.0, 100_000) };
        assert!(exec.on_market(&b, ample()).fills.is_empty());
        assert_eq!(exec.open_order_count(), 1);

        // Low dips to 47.5: fills at min(open, limit) = 48.
        let b = Bar { low: 47.5, ..bar(3, 49.0, 49.0, 100_000) };
        let report = exec.on_market(&b, ample());
        assert_eq!(report.fills[0].price, Decimal::from(48));
    }

    #[test]
    fn sell_limit_fills_at_limit_or_better() {
        let config = sample_config();
        let mut exec = handler(&config);

        let mut o = order(100, OrderSide::Sell, TimeInForce::GoodTillCancel);
        o.kind = OrderKind::Limit { limit_price: 52.0 };
        exec.submit(o, &bar(1, 50.0, 50.0, 100_000), ample());

        // Opens at 53 with high above the limit: fills at the better open.
        let report = exec.on_market(&bar(2, 53.0, 53.5, 100_000), ample());
        assert_eq!(report.fills[0].price, Decimal::from(53));
    }

    #[test]
    fn commission_and_slippage_attached_to_fill() {
        let mut config = sample_config();
        config.fill_price_rule = FillPriceRule::Close;
        config.commission = CommissionConfig::PerTrade { amount: "1.00".parse().unwrap() };
        config.slippage = SlippageConfig::FixedBps { bps: 10.0 };
        let mut exec = handler(&config);

        let report = exec.submit(order(100, OrderSide::Buy, TimeInForce::GoodTillCancel), &bar(1, 50.0, 50.0, 100_000), ample());
        let fill = &report.fills[0];
        assert_eq!(fill.commission, Decimal::ONE);
        // 10 bps of 5000 notional = 5.00
        assert_eq!(fill.slippage, "5.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn gap_up_clips_buy_to_cash_on_hand() {
        let mut config = sample_config();
        config.risk_mode = RiskMode::Clip;
        config.participation_cap = 1.0;
        let mut exec = handler(&config);

        // Affordable at the 50.00 close; the next bar opens at 51.00.
        exec.submit(
            order(100, OrderSide::Buy, TimeInForce::GoodTillCancel),
            &bar(1, 49.0, 50.0, 100_000),
            Decimal::from(5_000),
        );
        let report = exec.on_market(&bar(2, 51.0, 51.0, 100_000), Decimal::from(5_000));
        assert_eq!(report.fills.len(), 1);
        // floor(5000 / 51) = 98 shares; 2 stay open.
        assert_eq!(report.fills[0].quantity, 98);
        assert_eq!(report.fills[0].price, Decimal::from(51));
        assert_eq!(report.fills[0].remaining, 2);
        assert!(report.fills[0].price * Decimal::from(98) <= Decimal::from(5_000));
        assert_eq!(exec.open_order_count(), 1);
    }

    #[test]
    fn commission_shrinks_fill_instead_of_overspending() {
        let mut config = sample_config();
        config.risk_mode = RiskMode::Clip;
        config.participation_cap = 1.0;
        config.fill_price_rule = FillPriceRule::Close;
        config.commission = CommissionConfig::PerTrade { amount: "1.00".parse().unwrap() };
        let mut exec = handler(&config);

        // 100 x 50.00 = 5000.00 exactly; the flat commission tips it over.
        let report = exec.submit(
            order(100, OrderSide::Buy, TimeInForce::GoodTillCancel),
            &bar(1, 50.0, 50.0, 100_000),
            Decimal::from(5_000),
        );
        assert_eq!(report.fills.len(), 1);
        let fill = &report.fills[0];
        assert_eq!(fill.quantity, 99);
        let debit = fill.price * Decimal::from(fill.quantity) + fill.commission + fill.slippage;
        assert_eq!(debit, "4951.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn reject_mode_expires_unaffordable_buy() {
        let mut config = sample_config(); // risk_mode Reject
        config.participation_cap = 1.0;
        let mut exec = handler(&config);

        exec.submit(
            order(100, OrderSide::Buy, TimeInForce::GoodTillCancel),
            &bar(1, 49.0, 50.0, 100_000),
            Decimal::from(5_000),
        );
        let report = exec.on_market(&bar(2, 51.0, 51.0, 100_000), Decimal::from(5_000));
        assert!(report.fills.is_empty());
        assert_eq!(report.expiries.len(), 1);
        assert_eq!(report.expiries[0].unfilled, 100);
        assert_eq!(exec.open_order_count(), 0);
    }

    #[test]
    fn margin_accounts_skip_the_cash_gate() {
        let mut config = sample_config();
        config.shorting_enabled = true;
        config.participation_cap = 1.0;
        let mut exec = handler(&config);

        exec.submit(
            order(100, OrderSide::Buy, TimeInForce::GoodTillCancel),
            &bar(1, 49.0, 50.0, 100_000),
            Decimal::from(5_000),
        );
        let report = exec.on_market(&bar(2, 51.0, 51.0, 100_000), Decimal::from(5_000));
        assert_eq!(report.fills[0].quantity, 100);
    }

    #[test]
    fn cancel_all_reports_residuals() {
        let config = sample_config();
        let mut exec = handler(&config);
        exec.submit(order(100, OrderSide::Buy, TimeInForce::GoodTillCancel), &bar(1, 50.0, 50.0, 100_000), ample());

        let report = exec.cancel_all(ts(5));
        assert_eq!(report.expiries.len(), 1);
        assert_eq!(report.expiries[0].unfilled, 100);
        assert_eq!(exec.open_order_count(), 0);
    }
}
