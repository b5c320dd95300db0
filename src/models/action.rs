//! # models::action
//!
//! What the pipeline produces each cycle: a [`CrossoverEvent`] from the signal
//! detector and a [`TradeAction`] from the decision engine.

use serde::{Deserialize, Serialize};

use crate::models::position::ExitReason;

// ─── CrossoverEvent ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossoverEvent {
    /// Fast EMA moved from ≤ slow to > slow.
    Bullish,
    /// Fast EMA moved from > slow to ≤ slow.
    Bearish,
    None,
}

// ─── HoldReason ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldReason {
    /// Flat and no bullish crossover.
    NoSignal,
    /// Fewer bars than the slow EMA period.
    InsufficientHistory,
    /// Long and neither stop, target nor bearish crossover fired.
    AlreadyLong,
    /// The data source returned no bars at all.
    NoData,
    /// Bullish crossover on a bar that already produced a trade this run.
    BarAlreadyTraded,
    /// Entry blocked by the risk guard.
    RiskBlocked,
    /// Stop policy yields no usable stop below the entry price.
    InvalidLevels,
}

// ─── TradeAction ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    /// Bullish crossover while flat.
    EnterLong { price: f64 },
    ExitLong  { price: f64, reason: ExitReason },
    /// `price` is `None` only when there was no bar to read it from.
    Hold      { price: Option<f64>, reason: HoldReason },
}

impl TradeAction {
    pub fn hold(price: Option<f64>, reason: HoldReason) -> Self {
        TradeAction::Hold { price, reason }
    }
}
