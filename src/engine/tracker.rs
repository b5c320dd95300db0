//! # engine::tracker
//!
//! **Position Tracker** — owns the run's single [`Position`].
//!
//! Stop and target are derived once at open time:
//!
//! ```text
//! distance = StopPolicy::distance(entry)
//! stop     = entry - distance
//! target   = entry + distance * risk_reward_ratio
//! ```
//!
//! They are never recalculated while the position is open (no trailing).
//! `open` and `close` validate everything first and mutate in a single
//! assignment, so a failed call leaves the position untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BotError;
use crate::models::{ClosedTrade, ExitReason, OpenLong, Position};

// ─── StopPolicy ───────────────────────────────────────────────────────────────

/// How far below entry the stop sits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StopPolicy {
    /// Percent of entry price, e.g. `1.5` = 1.5 %.
    Percent(f64),
    /// Fixed price distance in quote currency.
    Absolute(f64),
}

impl StopPolicy {
    pub fn distance(&self, entry_price: f64) -> f64 {
        match *self {
            StopPolicy::Percent(pct) => entry_price * pct / 100.0,
            StopPolicy::Absolute(d)  => d,
        }
    }

    /// `(stop, target)` for a long entered at `entry_price`, or `None` when the
    /// levels would be meaningless (stop at or below zero, non-positive ratio).
    /// The orchestrator checks this against the reference price before any
    /// order is sent; [`PositionTracker::open`] applies it to the fill price.
    pub fn levels(&self, entry_price: f64, risk_reward_ratio: f64) -> Option<(f64, f64)> {
        let distance = self.distance(entry_price);
        let valid = entry_price > 0.0
            && entry_price.is_finite()
            && risk_reward_ratio > 0.0
            && risk_reward_ratio.is_finite()
            && distance > 0.0
            && distance < entry_price;
        valid.then(|| (entry_price - distance, entry_price + distance * risk_reward_ratio))
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            StopPolicy::Percent(pct) => pct > 0.0 && pct < 100.0,
            StopPolicy::Absolute(d)  => d > 0.0 && d.is_finite(),
        }
    }
}

// ─── StopCheck ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCheck {
    StopHit,
    TargetHit,
    None,
}

impl Position {
    /// Stop wins if both levels are touched.  Always `None` when flat.
    pub fn check_stop_or_target(&self, current_price: f64) -> StopCheck {
        match self {
            Position::Flat => StopCheck::None,
            Position::Long(open) if current_price <= open.stop_price   => StopCheck::StopHit,
            Position::Long(open) if current_price >= open.target_price => StopCheck::TargetHit,
            Position::Long(_) => StopCheck::None,
        }
    }
}

// ─── PositionTracker ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PositionTracker {
    position: Position,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// FLAT → LONG.
    pub fn open(
        &mut self,
        entry_price: f64,
        quantity: f64,
        risk_reward_ratio: f64,
        stop_policy: StopPolicy,
        opened_at: DateTime<Utc>,
    ) -> Result<&OpenLong, BotError> {
        if self.position.is_long() {
            return Err(self.invalid("open"));
        }

        let levels = stop_policy
            .levels(entry_price, risk_reward_ratio)
            .filter(|_| quantity > 0.0 && quantity.is_finite());
        let Some((stop_price, target_price)) = levels else {
            return Err(self.invalid("open with invalid levels"));
        };

        self.position = Position::Long(OpenLong {
            position_id:  Uuid::new_v4(),
            entry_price,
            stop_price,
            target_price,
            quantity,
            opened_at,
        });

        match &self.position {
            Position::Long(open) => Ok(open),
            Position::Flat       => Err(self.invalid("open")),
        }
    }

    /// LONG → FLAT, returning the realized trade.
    pub fn close(
        &mut self,
        exit_price: f64,
        reason: ExitReason,
        closed_at: DateTime<Utc>,
    ) -> Result<ClosedTrade, BotError> {
        let open = match &self.position {
            Position::Long(open) => open,
            Position::Flat       => return Err(self.invalid("close")),
        };

        let trade = ClosedTrade {
            position_id: open.position_id,
            entry_price: open.entry_price,
            exit_price,
            quantity:    open.quantity,
            pnl:         (exit_price - open.entry_price) * open.quantity,
            reason,
            opened_at:   open.opened_at,
            closed_at,
        };

        self.position = Position::Flat;
        Ok(trade)
    }

    pub fn check_stop_or_target(&self, current_price: f64) -> StopCheck {
        self.position.check_stop_or_target(current_price)
    }

    fn invalid(&self, attempted: &'static str) -> BotError {
        BotError::InvalidStateTransition {
            state: self.position.state(),
            attempted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PositionState;

    fn assert_invariant(pos: &Position) {
        let levels = [pos.entry_price(), pos.stop_price(), pos.target_price()];
        match pos.state() {
            PositionState::Long => assert!(levels.iter().all(Option::is_some)),
            PositionState::Flat => assert!(levels.iter().all(Option::is_none)),
        }
    }

    #[test]
    fn test_open_derives_levels_from_ratio() {
        let mut tracker = PositionTracker::new();
        let open = tracker
            .open(100.0, 0.5, 2.0, StopPolicy::Percent(5.0), Utc::now())
            .unwrap();

        assert_eq!(open.entry_price, 100.0);
        assert!((open.stop_price - 95.0).abs() < 1e-9);
        assert!((open.target_price - 110.0).abs() < 1e-9);
        assert_invariant(tracker.position());
    }

    #[test]
    fn test_open_twice_fails_and_keeps_position() {
        let mut tracker = PositionTracker::new();
        tracker.open(100.0, 1.0, 2.0, StopPolicy::Absolute(5.0), Utc::now()).unwrap();
        let before = tracker.position().clone();

        let err = tracker
            .open(120.0, 1.0, 2.0, StopPolicy::Absolute(5.0), Utc::now())
            .unwrap_err();
        assert!(err.is_defect());
        assert_eq!(tracker.position(), &before);
    }

    #[test]
    fn test_close_when_flat_fails() {
        let mut tracker = PositionTracker::new();
        let err = tracker.close(100.0, ExitReason::Signal, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            BotError::InvalidStateTransition { state: PositionState::Flat, attempted: "close" }
        ));
        assert_invariant(tracker.position());
    }

    #[test]
    fn test_close_returns_realized_pnl() {
        let mut tracker = PositionTracker::new();
        tracker.open(100.0, 2.0, 2.0, StopPolicy::Absolute(5.0), Utc::now()).unwrap();

        let trade = tracker.close(108.0, ExitReason::Signal, Utc::now()).unwrap();
        assert!((trade.pnl - 16.0).abs() < 1e-9);
        assert_eq!(trade.reason, ExitReason::Signal);
        assert_eq!(tracker.position(), &Position::Flat);
        assert_invariant(tracker.position());
    }

    #[test]
    fn test_stop_distance_beyond_entry_rejected() {
        let mut tracker = PositionTracker::new();
        let err = tracker.open(4.0, 1.0, 2.0, StopPolicy::Absolute(5.0), Utc::now());
        assert!(err.is_err());
        assert_eq!(tracker.position(), &Position::Flat);
    }

    #[test]
    fn test_levels_shared_with_open() {
        let policy = StopPolicy::Absolute(5.0);
        assert_eq!(policy.levels(100.0, 2.0), Some((95.0, 110.0)));
        assert_eq!(StopPolicy::Percent(1.0).levels(200.0, 3.0), Some((198.0, 206.0)));

        // distance swallows the whole entry price
        assert_eq!(StopPolicy::Absolute(50.0).levels(12.0, 2.0), None);
        assert_eq!(policy.levels(100.0, 0.0), None);

        let mut tracker = PositionTracker::new();
        let open = tracker.open(100.0, 1.0, 2.0, policy, Utc::now()).unwrap();
        assert_eq!((open.stop_price, open.target_price), (95.0, 110.0));
    }

    #[test]
    fn test_check_stop_or_target() {
        let mut tracker = PositionTracker::new();
        assert_eq!(tracker.check_stop_or_target(1.0), StopCheck::None);

        tracker.open(100.0, 1.0, 2.0, StopPolicy::Absolute(5.0), Utc::now()).unwrap();
        assert_eq!(tracker.check_stop_or_target(94.0), StopCheck::StopHit);
        assert_eq!(tracker.check_stop_or_target(95.0), StopCheck::StopHit);
        assert_eq!(tracker.check_stop_or_target(100.0), StopCheck::None);
        assert_eq!(tracker.check_stop_or_target(110.0), StopCheck::TargetHit);
    }

    #[test]
    fn test_invalid_stop_policies() {
        assert!(!StopPolicy::Percent(0.0).is_valid());
        assert!(!StopPolicy::Percent(100.0).is_valid());
        assert!(!StopPolicy::Absolute(-1.0).is_valid());
        assert!(StopPolicy::Percent(1.5).is_valid());
    }
}
