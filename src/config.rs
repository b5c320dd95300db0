//! # config — อ่าน Config จาก Environment Variables
//!
//! Everything the loop needs is read **once** at startup into [`Config`] and
//! validated.  The core never re-reads the environment mid-run.

use std::time::Duration;

use thiserror::Error;

use crate::engine::tracker::StopPolicy;
use crate::risk::RiskConfig;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("EMA_FAST must be >= 1")]
    FastPeriodZero,

    #[error("EMA_FAST ({fast}) must be smaller than EMA_SLOW ({slow})")]
    PeriodOrder { fast: usize, slow: usize },

    #[error("RISK_REWARD_RATIO must be > 0 (got {0})")]
    NonPositiveRiskReward(f64),

    #[error("stop distance must be > 0 and a percentage below 100")]
    InvalidStopDistance,

    #[error("ORDER_QUANTITY must be > 0 (got {0})")]
    NonPositiveQuantity(f64),

    #[error("HISTORY_BARS ({history}) must exceed EMA_SLOW ({slow})")]
    HistoryTooShort { history: usize, slow: usize },

    #[error("BINANCE_API_KEY and BINANCE_API_SECRET are required when PAPER_TRADING=false")]
    MissingCredentials,
}

// ─── Timeframe ────────────────────────────────────────────────────────────────

/// Kline interval.  `Display` yields the exchange's interval string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1  => "1m",
            Timeframe::M3  => "3m",
            Timeframe::M5  => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1  => "1h",
            Timeframe::H2  => "2h",
            Timeframe::H4  => "4h",
            Timeframe::H6  => "6h",
            Timeframe::H8  => "8h",
            Timeframe::H12 => "12h",
            Timeframe::D1  => "1d",
        }
    }

    pub fn duration(&self) -> Duration {
        let minutes = match self {
            Timeframe::M1  => 1,
            Timeframe::M3  => 3,
            Timeframe::M5  => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1  => 60,
            Timeframe::H2  => 120,
            Timeframe::H4  => 240,
            Timeframe::H6  => 360,
            Timeframe::H8  => 480,
            Timeframe::H12 => 720,
            Timeframe::D1  => 1440,
        };
        Duration::from_secs(minutes * 60)
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tf = match s.trim().to_lowercase().as_str() {
            "1m"  => Timeframe::M1,
            "3m"  => Timeframe::M3,
            "5m"  => Timeframe::M5,
            "15m" => Timeframe::M15,
            "30m" => Timeframe::M30,
            "1h"  => Timeframe::H1,
            "2h"  => Timeframe::H2,
            "4h"  => Timeframe::H4,
            "6h"  => Timeframe::H6,
            "8h"  => Timeframe::H8,
            "12h" => Timeframe::H12,
            "1d"  => Timeframe::D1,
            _ => {
                return Err(ConfigError::Invalid {
                    key:   "TIMEFRAME",
                    value: s.to_string(),
                })
            }
        };
        Ok(tf)
    }
}

// ─── Collaborator settings ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ExchangeCredentials {
    pub api_key:    String,
    pub api_secret: String,
}

// ห้าม log secret ออกไป
impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id:   String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"***")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────

/// Config ทั้งหมดที่ Trading Loop ต้องการ
#[derive(Debug, Clone)]
pub struct Config {
    /// Exchange symbol, e.g. `"BTCUSDT"`.
    pub symbol:            String,
    pub timeframe:         Timeframe,
    pub ema_fast:          usize,
    pub ema_slow:          usize,
    /// Target distance / stop distance.
    pub risk_reward_ratio: f64,
    pub stop_policy:       StopPolicy,
    /// Base-asset quantity bought on every entry.
    pub order_quantity:    f64,
    /// Minimum order value in quote currency.
    pub min_notional:      f64,
    /// Asset that funds entries; balance-relative risk limits read its free amount.
    pub quote_asset:       String,
    /// Simulate fills instead of sending orders.
    pub paper_trading:     bool,
    /// Virtual quote balance the paper executor starts with.
    pub paper_balance:     f64,
    /// Live adapter posts to the exchange's order-test endpoint.
    pub use_test_endpoint: bool,
    /// Sleep between cycles.
    pub poll_interval:     Duration,
    /// Bars fetched per cycle.
    pub history_bars:      usize,
    pub exchange_url:      String,
    pub credentials:       Option<ExchangeCredentials>,
    /// `None` → operator messages go to the log only.
    pub telegram:          Option<TelegramConfig>,
    pub risk:              RiskConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source.  `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ema_fast: usize = parse_or(&lookup, "EMA_FAST", 12)?;
        let ema_slow: usize = parse_or(&lookup, "EMA_SLOW", 26)?;

        let stop_policy = match lookup("STOP_LOSS_ABS") {
            Some(raw) => StopPolicy::Absolute(parse_value("STOP_LOSS_ABS", &raw)?),
            None      => StopPolicy::Percent(parse_or(&lookup, "STOP_LOSS_PCT", 1.0)?),
        };

        let paper_trading = parse_bool_or(&lookup, "PAPER_TRADING", true)?;

        let credentials = match (lookup("BINANCE_API_KEY"), lookup("BINANCE_API_SECRET")) {
            (Some(api_key), Some(api_secret)) if !api_key.is_empty() && !api_secret.is_empty() => {
                Some(ExchangeCredentials { api_key, api_secret })
            }
            _ => None,
        };

        let telegram = match (lookup("TELEGRAM_BOT_TOKEN"), lookup("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) if !bot_token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramConfig { bot_token, chat_id })
            }
            _ => None,
        };

        let interval_secs: u64 = parse_or(&lookup, "POLL_INTERVAL_SECS", 60)?;

        let config = Self {
            symbol:            lookup("SYMBOL").unwrap_or_else(|| "BTCUSDT".to_string()).to_uppercase(),
            timeframe:         lookup("TIMEFRAME").as_deref().unwrap_or("1h").parse()?,
            ema_fast,
            ema_slow,
            risk_reward_ratio: parse_or(&lookup, "RISK_REWARD_RATIO", 2.0)?,
            stop_policy,
            order_quantity:    parse_or(&lookup, "ORDER_QUANTITY", 0.001)?,
            min_notional:      parse_or(&lookup, "MIN_NOTIONAL", 10.0)?,
            quote_asset:       lookup("QUOTE_ASSET").unwrap_or_else(|| "USDT".to_string()).to_uppercase(),
            paper_trading,
            paper_balance:     parse_or(&lookup, "PAPER_BALANCE", 1000.0)?,
            use_test_endpoint: parse_bool_or(&lookup, "USE_TEST_ORDER_ENDPOINT", false)?,
            poll_interval:     Duration::from_secs(interval_secs),
            history_bars:      parse_or(&lookup, "HISTORY_BARS", ema_slow.saturating_mul(3).max(100))?,
            exchange_url:      lookup("BINANCE_BASE_URL")
                .unwrap_or_else(|| "https://api.binance.com".to_string()),
            credentials,
            telegram,
            risk:              RiskConfig::from_lookup(&lookup)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Startup invariants.  Called once; a failure aborts the process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ema_fast == 0 {
            return Err(ConfigError::FastPeriodZero);
        }
        if self.ema_fast >= self.ema_slow {
            return Err(ConfigError::PeriodOrder { fast: self.ema_fast, slow: self.ema_slow });
        }
        if !(self.risk_reward_ratio > 0.0) || !self.risk_reward_ratio.is_finite() {
            return Err(ConfigError::NonPositiveRiskReward(self.risk_reward_ratio));
        }
        if !self.stop_policy.is_valid() {
            return Err(ConfigError::InvalidStopDistance);
        }
        if !(self.order_quantity > 0.0) {
            return Err(ConfigError::NonPositiveQuantity(self.order_quantity));
        }
        if self.history_bars <= self.ema_slow {
            return Err(ConfigError::HistoryTooShort {
                history: self.history_bars,
                slow:    self.ema_slow,
            });
        }
        if !(self.paper_balance >= 0.0) || !self.paper_balance.is_finite() {
            return Err(ConfigError::Invalid {
                key:   "PAPER_BALANCE",
                value: self.paper_balance.to_string(),
            });
        }
        if !self.paper_trading && self.credentials.is_none() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(())
    }
}

// ─── Parsing helpers ──────────────────────────────────────────────────────────

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

pub(crate) fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None      => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on"  => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
    }
}

#[cfg(test)]
pub(crate) fn make_config() -> Config {
    Config {
        symbol:            "BTCUSDT".to_string(),
        timeframe:         Timeframe::H1,
        ema_fast:          2,
        ema_slow:          3,
        risk_reward_ratio: 2.0,
        stop_policy:       StopPolicy::Absolute(5.0),
        order_quantity:    1.0,
        min_notional:      10.0,
        quote_asset:       "USDT".to_string(),
        paper_trading:     true,
        paper_balance:     1000.0,
        use_test_endpoint: false,
        poll_interval:     Duration::from_secs(60),
        history_bars:      50,
        exchange_url:      "https://api.binance.com".to_string(),
        credentials:       None,
        telegram:          None,
        risk:              RiskConfig::default(),
    }
}
