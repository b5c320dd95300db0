//! # exchange
//!
//! I/O boundary with the exchange.  The orchestrator only sees the two traits
//! below; concrete adapters live in the submodules.
//!
//! | Trait            | Live adapter            | Offline adapter   |
//! |------------------|-------------------------|-------------------|
//! | [`MarketData`]   | `BinanceMarketData`     | —                 |
//! | [`OrderExecutor`]| `BinanceExecutor`       | `PaperExecutor`   |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Timeframe;
use crate::error::BotError;
use crate::models::PriceBar;

pub mod executor;
pub mod market;

pub use executor::{BinanceExecutor, PaperExecutor};
pub use market::BinanceMarketData;

// ─── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy  => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A market order for `quantity` base asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub symbol:          String,
    pub side:            Side,
    pub quantity:        f64,
    /// Latest close; used for the notional check and for simulated fills.
    pub reference_price: f64,
}

impl OrderRequest {
    pub fn notional(&self) -> f64 {
        self.quantity * self.reference_price
    }
}

/// Confirmed execution of an [`OrderRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub order_id:   String,
    /// Average fill price.
    pub fill_price: f64,
    pub quantity:   f64,
    pub filled_at:  DateTime<Utc>,
    /// `true` when no real order reached the exchange.
    pub simulated:  bool,
}

// ─── Collaborator traits ──────────────────────────────────────────────────────

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Up to `count` most recent **closed** bars, oldest first.
    async fn fetch_recent_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<PriceBar>, BotError>;
}

#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn submit_market_order(&self, order: &OrderRequest) -> Result<Fill, BotError>;

    /// Free balance of the quote asset (e.g. USDT) available for new entries.
    async fn quote_balance(&self) -> Result<f64, BotError>;

    /// `true` for adapters that never touch a real account.
    fn is_paper(&self) -> bool {
        false
    }
}
