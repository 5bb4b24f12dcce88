//! Strategy seam — signal generators driven by market events.
//!
//! Strategies only see bars and only emit signals. They never touch the
//! ledger or the order book, so a strategy cannot peek at fills or cash.

use crate::domain::IdGen;
use crate::events::{MarketEvent, SignalDirection, SignalEvent};
use std::collections::{HashMap, VecDeque};

/// Signal generator.
pub trait Strategy {
    /// React to a new bar. `market_sequence` is the queue sequence of the
    /// triggering market event, stamped onto emitted signals for audit.
    fn on_market(&mut self, event: &MarketEvent, market_sequence: u64) -> Vec<SignalEvent>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn on_market(&mut self, event: &MarketEvent, market_sequence: u64) -> Vec<SignalEvent> {
        (**self).on_market(event, market_sequence)
    }
}

/// Emits nothing. Useful for feed/ledger tests and as a pipeline smoke test.
#[derive(Debug, Default)]
pub struct NullStrategy;

impl Strategy for NullStrategy {
    fn on_market(&mut self, _event: &MarketEvent, _market_sequence: u64) -> Vec<SignalEvent> {
        Vec::new()
    }
}

/// Dual moving-average crossover.
///
/// Emits `Long` when the fast average crosses above the slow one and `Exit`
/// when it crosses back below. One position state per symbol; no signal is
/// emitted until `slow` bars of history exist.
pub struct MaCrossover {
    fast: usize,
    slow: usize,
    ids: IdGen,
    closes: HashMap<String, VecDeque<f64>>,
    fast_above: HashMap<String, bool>,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize) -> Self {
        debug_assert!(fast < slow, "fast window must be shorter than slow");
        Self {
            fast,
            slow,
            ids: IdGen::new(),
            closes: HashMap::new(),
            fast_above: HashMap::new(),
        }
    }

    fn mean_of_last(window: &VecDeque<f64>, n: usize) -> f64 {
        window.iter().rev().take(n).sum::<f64>() / n as f64
    }
}

impl Strategy for MaCrossover {
    fn on_market(&mut self, event: &MarketEvent, market_sequence: u64) -> Vec<SignalEvent> {
        let symbol = event.symbol().to_string();
        let closes = self.closes.entry(symbol.clone()).or_default();
        closes.push_back(event.bar.close);
        if closes.len() > self.slow {
            closes.pop_front();
        }
        if closes.len() < self.slow {
            return Vec::new();
        }

        let fast_ma = Self::mean_of_last(closes, self.fast);
        let slow_ma = Self::mean_of_last(closes, self.slow);
        let above = fast_ma > slow_ma;
        let was_above = self.fast_above.insert(symbol.clone(), above);

        let direction = match (was_above, above) {
            (Some(false), true) => SignalDirection::Long,
            (Some(true), false) => SignalDirection::Exit,
            _ => return Vec::new(),
        };

        vec![SignalEvent {
            id: self.ids.next_signal_id(),
            symbol,
            timestamp: event.timestamp(),
            direction,
            strength: 1.0,
            market_sequence,
        }]
    }
}
