//! # engine::decision
//!
//! **Decision Engine** — signal + position → [`TradeAction`]
//!
//! ## State machine (ทุก Cycle)
//! ```text
//! FLAT:
//!   BULLISH            → ENTER_LONG
//!   BEARISH | NONE     → HOLD
//!
//! LONG (ตามลำดับ — เจออันแรกแล้วหยุด):
//!   1. price <= stop   → EXIT_LONG (stop)
//!   2. price >= target → EXIT_LONG (target)
//!   3. BEARISH         → EXIT_LONG (signal)
//!   4.                 → HOLD
//! ```
//!
//! Everything here is synchronous and pure: no I/O, no clock, no mutation.
//! The orchestrator applies the returned action to the tracker.

use crate::engine::indicator::EmaPair;
use crate::engine::signal::detect_crossover;
use crate::engine::tracker::StopCheck;
use crate::models::{CrossoverEvent, ExitReason, HoldReason, Position, PriceBar, TradeAction};

/// Core transition for one cycle.
pub fn decide(event: CrossoverEvent, position: &Position, current_price: f64) -> TradeAction {
    match position {
        Position::Flat => match event {
            CrossoverEvent::Bullish => TradeAction::EnterLong { price: current_price },
            _ => TradeAction::hold(Some(current_price), HoldReason::NoSignal),
        },
        Position::Long(_) => {
            if let Some(reason) = exit_reason(event, position, current_price) {
                TradeAction::ExitLong { price: current_price, reason }
            } else {
                TradeAction::hold(Some(current_price), HoldReason::AlreadyLong)
            }
        }
    }
}

fn exit_reason(event: CrossoverEvent, position: &Position, price: f64) -> Option<ExitReason> {
    match position.check_stop_or_target(price) {
        StopCheck::StopHit   => Some(ExitReason::Stop),
        StopCheck::TargetHit => Some(ExitReason::Target),
        StopCheck::None if event == CrossoverEvent::Bearish => Some(ExitReason::Signal),
        StopCheck::None => None,
    }
}

// ─── Evaluation ───────────────────────────────────────────────────────────────

/// Result of running the whole pure pipeline on one batch of bars.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub action: TradeAction,
    pub event:  CrossoverEvent,
    /// Latest fast / slow EMA, when defined.
    pub fast:   Option<f64>,
    pub slow:   Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    fast_period: usize,
    slow_period: usize,
}

impl DecisionEngine {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        Self { fast_period, slow_period }
    }

    pub fn slow_period(&self) -> usize {
        self.slow_period
    }

    /// Bars → EMA pair → crossover → action.
    ///
    /// With fewer bars than the slow period no crossover is computed: a flat
    /// position holds, an open position is still checked against its stop and
    /// target (never exited on signal).
    pub fn evaluate(&self, bars: &[PriceBar], position: &Position) -> Evaluation {
        let Some(last) = bars.last() else {
            return Evaluation {
                action: TradeAction::hold(None, HoldReason::NoData),
                event:  CrossoverEvent::None,
                fast:   None,
                slow:   None,
            };
        };
        let price = last.close;

        if bars.len() < self.slow_period {
            let action = match position {
                Position::Flat => TradeAction::hold(Some(price), HoldReason::InsufficientHistory),
                Position::Long(_) => match decide(CrossoverEvent::None, position, price) {
                    TradeAction::Hold { .. } => {
                        TradeAction::hold(Some(price), HoldReason::InsufficientHistory)
                    }
                    exit => exit,
                },
            };
            return Evaluation { action, event: CrossoverEvent::None, fast: None, slow: None };
        }

        let emas  = EmaPair::from_bars(bars, self.fast_period, self.slow_period);
        let event = detect_crossover(&emas.fast, &emas.slow);
        let latest = emas.latest();

        Evaluation {
            action: decide(event, position, price),
            event,
            fast:   latest.map(|(f, _)| f),
            slow:   latest.map(|(_, s)| s),
        }
    }
}
