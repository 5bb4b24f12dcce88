//! Event model — tagged records flowing through the simulation loop.
//!
//! Ownership rules (who emits, who consumes):
//! - `MarketEvent`: emitted by the data handler; consumed by the strategy,
//!   the ledger (mark-to-market), and the execution book (pending orders).
//! - `SignalEvent`: emitted by the strategy; consumed by the ledger.
//! - `OrderEvent`: emitted by the ledger; consumed by the execution handler.
//! - `FillEvent`: emitted by the execution handler; consumed by the ledger.
//!
//! The strategy never emits orders. It emits signals; the ledger translates
//! signals into orders. Events are immutable payloads: created by their
//! producer, consumed exactly once by the loop, and discarded afterwards
//! (fills are archived into the trade log).

pub mod queue;

pub use queue::EventQueue;

use crate::domain::{Bar, FillId, OrderId, OrderKind, OrderSide, SignalId, TimeInForce};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Signal direction from the strategy's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalDirection {
    Long,
    Short,
    /// Close out whatever position is open.
    Exit,
}

/// New bar for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub bar: Bar,
}

impl MarketEvent {
    pub fn symbol(&self) -> &str {
        &self.bar.symbol
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.bar.timestamp
    }
}

/// Strategy wants to be long/short/flat a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub id: SignalId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: SignalDirection,
    /// Conviction in [0, 1]; scales the sizing policy's output.
    pub strength: f64,
    /// Sequence number of the MarketEvent that triggered this signal.
    pub market_sequence: u64,
}

/// Ledger requests execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub id: OrderId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    /// Always positive; direction is carried by `side`.
    pub quantity: i64,
    pub kind: OrderKind,
    pub time_in_force: TimeInForce,
    pub signal_id: SignalId,
}

/// Execution handler reports a (possibly partial) fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub id: FillId,
    pub order_id: OrderId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    /// Shares filled on this bar (positive).
    pub quantity: i64,
    pub price: Decimal,
    pub commission: Decimal,
    pub slippage: Decimal,
    /// Unfilled shares still open after this fill.
    pub remaining: i64,
}

impl FillEvent {
    /// Signed quantity as applied to the position: positive buys, negative sells.
    pub fn signed_quantity(&self) -> i64 {
        self.side.sign() * self.quantity
    }
}

/// Tagged event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl EventPayload {
    /// Type priority for equal-timestamp ordering:
    /// Market < Signal < Order < Fill.
    ///
    /// This is the causality guarantee — a fill is never popped before the
    /// order that produced it, and everything derived from a bar drains
    /// before the next bar's events are considered.
    pub fn type_priority(&self) -> u8 {
        match self {
            EventPayload::Market(_) => 0,
            EventPayload::Signal(_) => 1,
            EventPayload::Order(_) => 2,
            EventPayload::Fill(_) => 3,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EventPayload::Market(e) => e.timestamp(),
            EventPayload::Signal(e) => e.timestamp,
            EventPayload::Order(e) => e.timestamp,
            EventPayload::Fill(e) => e.timestamp,
        }
    }
}

/// An event as it sits in the queue: payload plus the sequence number the
/// queue assigned at enqueue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub sequence: u64,
    pub payload: EventPayload,
}

impl Event {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.payload.timestamp()
    }
}
