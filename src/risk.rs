//! # risk — Risk Guard
//!
//! ชั้นกั้นสุดท้ายก่อนเปิด Position ใหม่
//!
//! Only **entries** pass through here.  Exits (stop, target, bearish signal)
//! are never blocked: refusing to close a losing position is the opposite of
//! risk control.
//!
//! ## ชั้นการป้องกัน
//! 1. **Kill Switch**       — manual or auto after repeated order failures
//! 2. **Cooldown**          — pause entries after an order failure
//! 3. **Max Trades/Day**    — entry cap per UTC day
//! 4. **Max Daily Loss**    — realized loss cap per UTC day (fixed or % of balance)
//! 5. **Max Position Size** — entry notional cap as % of free quote balance
//!
//! The guard lives inside the orchestrator and is mutated through `&mut self`
//! only, like the position itself.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{parse_or, ConfigError};

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// จำนวน Entry สูงสุดต่อวัน (0 = ไม่จำกัด)
    pub max_trades_per_day: u32,
    /// Fail ติดต่อกันกี่ครั้งถึง Auto-Kill (0 = ไม่ Auto-Kill)
    pub max_consecutive_failures: u32,
    /// พักหลังจาก Fail กี่วินาที
    pub cooldown_secs_after_failure: u64,
    /// Realized loss per UTC day, quote currency (0 = off).
    pub max_daily_loss: f64,
    /// Realized loss per UTC day as % of free quote balance (0 = off).
    pub max_daily_loss_pct: f64,
    /// Entry notional as % of free quote balance (0 = off).
    pub max_position_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_trades_per_day:          10,
            max_consecutive_failures:    3,
            cooldown_secs_after_failure: 300,
            max_daily_loss:              0.0,
            max_daily_loss_pct:          2.0,
            max_position_pct:            10.0,
        }
    }
}

impl RiskConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_daily_loss: f64 = parse_or(lookup, "RISK_MAX_DAILY_LOSS", defaults.max_daily_loss)?;
        let max_daily_loss_pct: f64 =
            parse_or(lookup, "RISK_MAX_DAILY_LOSS_PCT", defaults.max_daily_loss_pct)?;
        let max_position_pct: f64 =
            parse_or(lookup, "RISK_MAX_POSITION_PCT", defaults.max_position_pct)?;

        for (key, pct) in [
            ("RISK_MAX_DAILY_LOSS_PCT", max_daily_loss_pct),
            ("RISK_MAX_POSITION_PCT", max_position_pct),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(ConfigError::Invalid { key, value: pct.to_string() });
            }
        }

        Ok(Self {
            max_trades_per_day:          parse_or(lookup, "RISK_MAX_TRADES_PER_DAY", defaults.max_trades_per_day)?,
            max_consecutive_failures:    parse_or(lookup, "RISK_MAX_CONSECUTIVE_FAILS", defaults.max_consecutive_failures)?,
            cooldown_secs_after_failure: parse_or(lookup, "RISK_COOLDOWN_SECS", defaults.cooldown_secs_after_failure)?,
            max_daily_loss:              max_daily_loss.abs(),
            max_daily_loss_pct,
            max_position_pct,
        })
    }

    /// `true` when an entry cannot be judged without the account balance.
    pub fn needs_balance(&self) -> bool {
        self.max_position_pct > 0.0 || self.max_daily_loss_pct > 0.0
    }
}

// ─── Status (for operator summary) ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RiskStatus {
    pub is_killed:            bool,
    pub kill_reason:          Option<String>,
    pub trades_today:         u32,
    pub pnl_today:            f64,
    pub consecutive_failures: u32,
    pub last_trade_at:        Option<DateTime<Utc>>,
    pub in_cooldown:          bool,
    pub cooldown_ends_at:     Option<DateTime<Utc>>,
}

// ─── Decision ─────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
pub enum RiskDecision {
    Approved,
    Blocked(String),
}

// ─── Risk Manager ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RiskManager {
    config:               RiskConfig,
    is_killed:            bool,
    kill_reason:          Option<String>,
    trades_today:         u32,
    pnl_today:            f64,
    consecutive_failures: u32,
    last_failure_at:      Option<DateTime<Utc>>,
    last_trade_at:        Option<DateTime<Utc>>,
    daily_reset_date:     NaiveDate,
}

impl RiskManager {
    pub fn new(config: RiskConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            is_killed:            false,
            kill_reason:          None,
            trades_today:         0,
            pnl_today:            0.0,
            consecutive_failures: 0,
            last_failure_at:      None,
            last_trade_at:        None,
            daily_reset_date:     now.date_naive(),
        }
    }

    fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today > self.daily_reset_date {
            self.trades_today     = 0;
            self.pnl_today        = 0.0;
            self.daily_reset_date = today;
            info!("📅 Risk: daily counters reset");
        }
    }

    // ─── Pre-Entry Check (เรียกก่อนเปิด Position ทุกครั้ง) ─────────────────

    /// Does not count the entry.  Call [`record_entry`](Self::record_entry)
    /// once the order actually fills.
    pub fn pre_entry_check(&mut self, now: DateTime<Utc>) -> RiskDecision {
        self.roll_day(now);

        // [1] Kill switch
        if self.is_killed {
            return RiskDecision::Blocked(format!(
                "Kill switch active: {}",
                self.kill_reason.as_deref().unwrap_or("manual activation")
            ));
        }

        // [2] Consecutive failure auto-kill
        if self.config.max_consecutive_failures > 0
            && self.consecutive_failures >= self.config.max_consecutive_failures
        {
            let reason = format!(
                "Auto-kill: {} consecutive execution failures",
                self.consecutive_failures
            );
            self.is_killed   = true;
            self.kill_reason = Some(reason.clone());
            warn!("⛔ Risk auto-kill activated: {reason}");
            return RiskDecision::Blocked(reason);
        }

        // [3] Cooldown หลัง Fail
        if let Some(fail_time) = self.last_failure_at {
            let elapsed  = now.signed_duration_since(fail_time);
            let cooldown = chrono::Duration::seconds(self.config.cooldown_secs_after_failure as i64);
            if elapsed < cooldown {
                let remaining = (cooldown - elapsed).num_seconds();
                return RiskDecision::Blocked(format!(
                    "Cooldown: {remaining}s remaining after last failure"
                ));
            }
        }

        // [4] Max trades per day
        if self.config.max_trades_per_day > 0
            && self.trades_today >= self.config.max_trades_per_day
        {
            return RiskDecision::Blocked(format!(
                "Daily trade limit reached: {}/{}",
                self.trades_today, self.config.max_trades_per_day
            ));
        }

        // [5] Max daily loss
        if self.config.max_daily_loss > 0.0 && self.pnl_today <= -self.config.max_daily_loss {
            return RiskDecision::Blocked(format!(
                "Daily loss limit reached: {:.2} (limit {:.2})",
                self.pnl_today, -self.config.max_daily_loss
            ));
        }

        RiskDecision::Approved
    }

    // ─── Entry Sizing (เทียบกับยอดเงินในบัญชี) ───────────────────────────────

    /// Balance-relative limits for an entry of `notional` quote currency.
    /// `balance` is the free quote balance, `None` when it could not be read;
    /// with either limit enabled that blocks the entry.
    pub fn check_entry_size(&self, notional: f64, balance: Option<f64>) -> RiskDecision {
        if !self.config.needs_balance() {
            return RiskDecision::Approved;
        }
        let Some(balance) = balance else {
            return RiskDecision::Blocked("Account balance unavailable".into());
        };

        // [6] Max daily loss (% of balance)
        if self.config.max_daily_loss_pct > 0.0 {
            let limit = balance * self.config.max_daily_loss_pct / 100.0;
            if self.pnl_today <= -limit {
                return RiskDecision::Blocked(format!(
                    "Daily loss limit reached: {:.2} ({}% of balance {:.2})",
                    self.pnl_today, self.config.max_daily_loss_pct, balance
                ));
            }
        }

        // [7] Max position size (% of balance)
        if self.config.max_position_pct > 0.0 {
            let cap = balance * self.config.max_position_pct / 100.0;
            if notional > cap {
                return RiskDecision::Blocked(format!(
                    "Position size {notional:.2} exceeds {}% of balance ({cap:.2})",
                    self.config.max_position_pct
                ));
            }
        }

        RiskDecision::Approved
    }

    // ─── Trade Result Recording ───────────────────────────────────────────────

    /// Entry order filled.
    pub fn record_entry(&mut self, now: DateTime<Utc>) {
        self.roll_day(now);
        self.trades_today += 1;
        self.last_trade_at = Some(now);
        self.record_success();
        info!(
            trades_today = self.trades_today,
            max          = self.config.max_trades_per_day,
            "✅ Risk: entry recorded"
        );
    }

    /// Position closed with realized `pnl`.
    pub fn record_exit(&mut self, pnl: f64, now: DateTime<Utc>) {
        self.roll_day(now);
        self.pnl_today += pnl;
        self.record_success();
    }

    fn record_success(&mut self) {
        let prev = self.consecutive_failures;
        self.consecutive_failures = 0;
        if prev > 0 {
            info!("Risk: consecutive_failures reset (was {prev})");
        }
    }

    /// เรียกเมื่อ Order Fail (ทั้ง entry และ exit)
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.consecutive_failures += 1;
        self.last_failure_at = Some(now);
        warn!(
            consecutive = self.consecutive_failures,
            max         = self.config.max_consecutive_failures,
            "⚠️ Risk: execution failure recorded"
        );
    }

    // ─── Manual Controls ─────────────────────────────────────────────────────

    /// Stops all further entries for the rest of the run.
    pub fn kill(&mut self, reason: &str) {
        self.is_killed   = true;
        self.kill_reason = Some(reason.to_string());
        warn!(reason, "⛔ KILL SWITCH ACTIVATED");
    }

    // ─── Status ───────────────────────────────────────────────────────────────

    pub fn status(&self, now: DateTime<Utc>) -> RiskStatus {
        let cooldown_ends = self.last_failure_at.map(|t| {
            t + chrono::Duration::seconds(self.config.cooldown_secs_after_failure as i64)
        });
        let in_cooldown = cooldown_ends.map(|end| now < end).unwrap_or(false);

        RiskStatus {
            is_killed:            self.is_killed,
            kill_reason:          self.kill_reason.clone(),
            trades_today:         self.trades_today,
            pnl_today:            self.pnl_today,
            consecutive_failures: self.consecutive_failures,
            last_trade_at:        self.last_trade_at,
            in_cooldown,
            cooldown_ends_at:     if in_cooldown { cooldown_ends } else { None },
        }
    }
}
