//! # error
//!
//! Centralised error type for the trading loop.
//!
//! Every fallible operation returns `Result<_, BotError>`.  The orchestrator
//! matches on the variant to decide whether a cycle is skipped, an order is
//! treated as not-taken, or a defect is surfaced loudly in the logs.

use thiserror::Error;

use crate::config::ConfigError;
use crate::models::PositionState;

/// ประเภทความผิดพลาดตอนส่ง Order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderErrorKind {
    /// Exchange reports the account cannot cover the order.
    InsufficientFunds,
    /// Exchange refused the order (bad symbol, filters, permissions, ...).
    Rejected,
    /// Order value below the exchange's minimum notional — never sent.
    BelowMinNotional,
    /// Network failure, timeout or exchange-side 5xx.
    Transient,
}

impl std::fmt::Display for OrderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderErrorKind::InsufficientFunds => write!(f, "insufficient funds"),
            OrderErrorKind::Rejected          => write!(f, "rejected"),
            OrderErrorKind::BelowMinNotional  => write!(f, "below min notional"),
            OrderErrorKind::Transient         => write!(f, "transient"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    /// Market data could not be fetched or was malformed — skip this cycle.
    #[error("Data fetch error: {0}")]
    DataFetch(String),

    /// Fewer bars than the slow EMA period.
    #[error("Insufficient history: have {have} bars, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    /// Opening an open position or closing a flat one.  A programming defect,
    /// never a user-recoverable condition.
    #[error("Invalid state transition: cannot {attempted} while {state}")]
    InvalidStateTransition {
        state:     PositionState,
        attempted: &'static str,
    },

    /// Order submission failed; the action counts as not-taken.
    #[error("Order execution error ({kind}): {message}")]
    OrderExecution {
        kind:    OrderErrorKind,
        message: String,
    },

    /// Operator message could not be delivered.
    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl BotError {
    pub fn order(kind: OrderErrorKind, message: impl Into<String>) -> Self {
        BotError::OrderExecution { kind, message: message.into() }
    }

    /// `true` for errors that indicate a bug in orchestration rather than a
    /// failure of the outside world.
    pub fn is_defect(&self) -> bool {
        matches!(self, BotError::InvalidStateTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_is_defect() {
        let err = BotError::InvalidStateTransition {
            state:     PositionState::Long,
            attempted: "open",
        };
        assert!(err.is_defect());
        assert_eq!(
            err.to_string(),
            "Invalid state transition: cannot open while LONG"
        );
    }

    #[test]
    fn test_order_error_message() {
        let err = BotError::order(OrderErrorKind::InsufficientFunds, "balance 3.20 USDT");
        assert!(!err.is_defect());
        assert_eq!(
            err.to_string(),
            "Order execution error (insufficient funds): balance 3.20 USDT"
        );
    }
}
