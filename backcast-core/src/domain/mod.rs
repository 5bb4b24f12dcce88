//! Domain types for Backcast.

pub mod bar;
pub mod ids;
pub mod money;
pub mod order;
pub mod position;

pub use bar::Bar;
pub use ids::{FillId, IdGen, OrderId, RunId, SignalId};
pub use money::{to_cents, to_price};
pub use order::{OrderKind, OrderSide, TimeInForce};
pub use position::Position;
