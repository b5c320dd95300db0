//! Domain models shared across the entire trading loop.

pub mod action;
pub mod bar;
pub mod position;

pub use action::{CrossoverEvent, HoldReason, TradeAction};
pub use bar::PriceBar;
pub use position::{
    ClosedTrade, ExitReason, OpenLong, Position, PositionState, SessionLedger, SessionSummary,
};
