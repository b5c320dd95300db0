//! # models::position
//!
//! Defines the run's single [`Position`] and the [`ClosedTrade`] record
//! produced when it is closed.
//!
//! ## Why an enum?
//! `Position::Long` carries entry / stop / target together, so "LONG ⟺ all
//! three levels set" cannot be violated by construction.  `Flat` carries
//! nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── PositionState ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    Flat,
    Long,
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::Long => write!(f, "LONG"),
        }
    }
}

// ─── OpenLong ─────────────────────────────────────────────────────────────────

/// Position ที่เปิดอยู่จริง (ฝั่ง Long เท่านั้น)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLong {
    pub position_id:  Uuid,
    pub entry_price:  f64,
    /// Fixed at open, never trailed.
    pub stop_price:   f64,
    /// Fixed at open, never trailed.
    pub target_price: f64,
    /// Base-asset quantity held.
    pub quantity:     f64,
    pub opened_at:    DateTime<Utc>,
}

impl OpenLong {
    /// Unrealised PnL in quote currency at `current_price`.
    pub fn unrealised_pnl(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) * self.quantity
    }
}

// ─── Position ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Position {
    #[default]
    Flat,
    Long(OpenLong),
}

impl Position {
    pub fn state(&self) -> PositionState {
        match self {
            Position::Flat    => PositionState::Flat,
            Position::Long(_) => PositionState::Long,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long(_))
    }

    pub fn as_long(&self) -> Option<&OpenLong> {
        match self {
            Position::Long(open) => Some(open),
            Position::Flat       => None,
        }
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.as_long().map(|p| p.entry_price)
    }

    pub fn stop_price(&self) -> Option<f64> {
        self.as_long().map(|p| p.stop_price)
    }

    pub fn target_price(&self) -> Option<f64> {
        self.as_long().map(|p| p.target_price)
    }
}

// ─── ExitReason ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Stop,
    Target,
    /// Bearish crossover.
    Signal,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Stop   => write!(f, "stop"),
            ExitReason::Target => write!(f, "target"),
            ExitReason::Signal => write!(f, "signal"),
        }
    }
}

// ─── ClosedTrade ──────────────────────────────────────────────────────────────

/// Realised result of one round trip.  Kept in memory for the session summary
/// only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub position_id: Uuid,
    pub entry_price: f64,
    pub exit_price:  f64,
    pub quantity:    f64,
    /// `(exit - entry) * quantity`, quote currency.
    pub pnl:         f64,
    pub reason:      ExitReason,
    pub opened_at:   DateTime<Utc>,
    pub closed_at:   DateTime<Utc>,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

// ─── SessionLedger ────────────────────────────────────────────────────────────

/// In-memory list of closed trades for this run, plus summary statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionLedger {
    trades: Vec<ClosedTrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_trades: usize,
    pub wins:         usize,
    pub win_rate_pct: f64,
    pub realized_pnl: f64,
}

impl SessionLedger {
    pub fn record(&mut self, trade: ClosedTrade) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn summary(&self) -> SessionSummary {
        let total_trades = self.trades.len();
        let wins = self.trades.iter().filter(|t| t.is_win()).count();
        let win_rate_pct = if total_trades > 0 {
            wins as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        SessionSummary {
            total_trades,
            wins,
            win_rate_pct,
            realized_pnl: self.trades.iter().map(|t| t.pnl).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade(entry: f64, exit: f64) -> ClosedTrade {
        let now = Utc::now();
        ClosedTrade {
            position_id: Uuid::new_v4(),
            entry_price: entry,
            exit_price:  exit,
            quantity:    2.0,
            pnl:         (exit - entry) * 2.0,
            reason:      ExitReason::Signal,
            opened_at:   now,
            closed_at:   now,
        }
    }

    #[test]
    fn test_flat_has_no_levels() {
        let pos = Position::Flat;
        assert_eq!(pos.state(), PositionState::Flat);
        assert!(pos.entry_price().is_none());
        assert!(pos.stop_price().is_none());
        assert!(pos.target_price().is_none());
    }

    #[test]
    fn test_ledger_summary() {
        let mut ledger = SessionLedger::default();
        assert_eq!(ledger.summary().win_rate_pct, 0.0);

        ledger.record(make_trade(100.0, 110.0));
        ledger.record(make_trade(100.0, 95.0));

        let summary = ledger.summary();
        assert_eq!(summary.total_trades, 2);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.win_rate_pct, 50.0);
        assert!((summary.realized_pnl - 10.0).abs() < 1e-9);
    }
}
