//! # events
//!
//! Defines [`CycleEvent`] — everything worth telling the operator about a
//! cycle.  Each event renders to a chat message ([`CycleEvent::to_message`])
//! and to a JSON line for structured logs ([`CycleEvent::to_json`]).

use serde::Serialize;

use crate::models::{ClosedTrade, HoldReason, OpenLong, SessionSummary};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleEvent {
    /// Loop started.
    Started {
        symbol:        String,
        timeframe:     String,
        ema_fast:      usize,
        ema_slow:      usize,
        paper_trading: bool,
    },

    /// Bullish crossover filled — position is LONG.
    PositionOpened {
        symbol:    String,
        position:  Box<OpenLong>,
        simulated: bool,
    },

    /// Position closed by stop, target or bearish crossover.
    PositionClosed {
        symbol:    String,
        trade:     Box<ClosedTrade>,
        simulated: bool,
    },

    /// Order failed; the position is unchanged.
    OrderFailed {
        symbol: String,
        side:   String,
        error:  String,
    },

    /// Entry signal ignored by the risk guard.
    RiskBlocked {
        symbol: String,
        reason: String,
    },

    /// Nothing to do this cycle.  Logged, not sent.
    Held {
        symbol: String,
        price:  Option<f64>,
        reason: HoldReason,
    },

    /// Orchestration bug detected; entries are halted.
    Defect {
        error: String,
    },

    /// Loop stopped.
    Stopped {
        summary:       SessionSummary,
        open_position: Option<Box<OpenLong>>,
    },
}

impl CycleEvent {
    /// `false` for routine events that only belong in the log.
    pub fn should_notify(&self) -> bool {
        !matches!(self, CycleEvent::Held { .. })
    }

    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }

    /// Human-readable text for the chat channel.
    pub fn to_message(&self) -> String {
        match self {
            CycleEvent::Started { symbol, timeframe, ema_fast, ema_slow, paper_trading } => format!(
                "🤖 Trading loop started\n• Pair: {symbol} ({timeframe})\n• EMA: {ema_fast}/{ema_slow}\n• Mode: {}",
                if *paper_trading { "PAPER" } else { "LIVE" }
            ),
            CycleEvent::PositionOpened { symbol, position, simulated } => format!(
                "✅ {}BUY {symbol}\n• Amount: {:.6}\n• Entry: {:.2}\n• Stop: {:.2}\n• Target: {:.2}",
                paper_tag(*simulated),
                position.quantity,
                position.entry_price,
                position.stop_price,
                position.target_price,
            ),
            CycleEvent::PositionClosed { symbol, trade, simulated } => format!(
                "{} {}SELL {symbol} ({})\n• Entry: {:.2}\n• Exit: {:.2}\n• PnL: {:+.2}",
                if trade.is_win() { "💰" } else { "🔻" },
                paper_tag(*simulated),
                trade.reason,
                trade.entry_price,
                trade.exit_price,
                trade.pnl,
            ),
            CycleEvent::OrderFailed { symbol, side, error } => {
                format!("🚨 {side} {symbol} failed: {error}\nPosition unchanged — will re-evaluate next cycle")
            }
            CycleEvent::RiskBlocked { symbol, reason } => {
                format!("⛔ Entry on {symbol} blocked: {reason}")
            }
            CycleEvent::Held { symbol, price, reason } => match price {
                Some(p) => format!("⏸ {symbol} hold at {p:.2} ({reason:?})"),
                None    => format!("⏸ {symbol} hold ({reason:?})"),
            },
            CycleEvent::Defect { error } => {
                format!("🐞 Internal error, entries halted: {error}")
            }
            CycleEvent::Stopped { summary, open_position } => {
                let mut msg = format!(
                    "🛑 Trading loop stopped\n• Trades: {}\n• Win rate: {:.1}%\n• Realized PnL: {:+.2}",
                    summary.total_trades, summary.win_rate_pct, summary.realized_pnl
                );
                if let Some(pos) = open_position {
                    msg.push_str(&format!(
                        "\n⚠️ Position still open: {:.6} @ {:.2}",
                        pos.quantity, pos.entry_price
                    ));
                }
                msg
            }
        }
    }
}

fn paper_tag(simulated: bool) -> &'static str {
    if simulated { "[PAPER] " } else { "" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExitReason;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_closed_message_and_json() {
        let now = Utc::now();
        let event = CycleEvent::PositionClosed {
            symbol:    "BTCUSDT".into(),
            trade:     Box::new(ClosedTrade {
                position_id: Uuid::new_v4(),
                entry_price: 100.0,
                exit_price:  95.0,
                quantity:    1.0,
                pnl:         -5.0,
                reason:      ExitReason::Stop,
                opened_at:   now,
                closed_at:   now,
            }),
            simulated: true,
        };

        let msg = event.to_message();
        assert!(msg.contains("[PAPER] SELL BTCUSDT (stop)"));
        assert!(msg.contains("PnL: -5.00"));

        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["event"], "POSITION_CLOSED");
        assert_eq!(json["trade"]["reason"], "STOP");
    }

    #[test]
    fn test_hold_is_not_notified() {
        let held = CycleEvent::Held {
            symbol: "BTCUSDT".into(),
            price:  Some(1.0),
            reason: HoldReason::NoSignal,
        };
        assert!(!held.should_notify());

        let blocked = CycleEvent::RiskBlocked { symbol: "BTCUSDT".into(), reason: "x".into() };
        assert!(blocked.should_notify());
    }
}
