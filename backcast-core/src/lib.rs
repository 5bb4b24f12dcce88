//! Backcast engine: deterministic event-driven backtesting.
//!
//! The pipeline is `market data -> strategy -> signal -> ledger -> order ->
//! execution -> fill -> ledger`, driven by a single priority queue that
//! totally orders events by (timestamp, type-priority, sequence). Money is
//! kept in exact decimals, share counts in signed integers, and every state
//! change is archived so a finished run replays bit for bit from its trade
//! log.

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod execution;
pub mod ledger;
pub mod strategy;

pub use config::BacktestConfig;
pub use domain::{Bar, Position, RunId};
pub use engine::{run, RunContext, RunResult};
pub use error::{ConfigError, DataError, EngineError};
pub use events::{EventQueue, FillEvent, MarketEvent, OrderEvent, SignalEvent};
pub use ledger::{replay_trade_log, EquityCurve, Ledger, TradeLog};
