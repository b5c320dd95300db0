//! # engine::cycle
//!
//! **Cycle Orchestrator** — one polling cycle, end to end
//!
//! ## ลำดับการทำงาน (ทุก Cycle)
//! ```text
//! 1. Fetch recent bars        → DataFetch error = skip cycle
//! 2. Validate bar ordering    → out of order   = skip cycle
//! 3. Decision Engine          → ENTER / EXIT / HOLD (pure)
//! 4. Same-bar guard           → no re-entry on a bar that already traded
//! 5. Risk Guard (entry only)  → limits, stop/target levels, position size
//!                               blocked = HOLD + notify, no order sent
//! 6. Submit order             → failure = position unchanged + notify
//! 7. Update Position Tracker  → open / close with the fill price
//! 8. Notify outcome           → failure is logged, never propagated
//! ```
//!
//! The orchestrator owns the tracker and is driven through `&mut self`, so at
//! most one cycle is ever in flight and the position is never observed
//! mid-mutation.

use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::decision::DecisionEngine;
use crate::engine::tracker::PositionTracker;
use crate::error::{BotError, OrderErrorKind};
use crate::events::CycleEvent;
use crate::exchange::{MarketData, OrderExecutor, OrderRequest, Side};
use crate::models::{bar, ExitReason, HoldReason, Position, SessionLedger, TradeAction};
use crate::notifier::Notifier;
use crate::risk::{RiskDecision, RiskManager};

// ─── Outcome ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Held(HoldReason),
    Entered { price: f64 },
    Exited { reason: ExitReason, pnl: f64 },
    /// Order not taken; position unchanged.
    OrderFailed(OrderErrorKind),
    /// Tracker refused a transition the decision engine asked for.
    Defect,
}

// ─── Orchestrator ─────────────────────────────────────────────────────────────

pub struct CycleOrchestrator {
    config:          Config,
    engine:          DecisionEngine,
    tracker:         PositionTracker,
    risk:            RiskManager,
    ledger:          SessionLedger,
    market:          Box<dyn MarketData>,
    executor:        Box<dyn OrderExecutor>,
    notifier:        Box<dyn Notifier>,
    /// Open time of the last bar on which an order filled.
    last_traded_bar: Option<DateTime<Utc>>,
}

impl CycleOrchestrator {
    pub fn new(
        config: Config,
        market: Box<dyn MarketData>,
        executor: Box<dyn OrderExecutor>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            engine:          DecisionEngine::new(config.ema_fast, config.ema_slow),
            tracker:         PositionTracker::new(),
            risk:            RiskManager::new(config.risk.clone(), Utc::now()),
            ledger:          SessionLedger::default(),
            config,
            market,
            executor,
            notifier,
            last_traded_bar: None,
        }
    }

    pub fn position(&self) -> &Position {
        self.tracker.position()
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    // ─── Main Loop ────────────────────────────────────────────────────────────

    /// Runs cycles until `shutdown` resolves.  A cycle in progress always
    /// completes; shutdown is only observed during the sleep.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.notify(CycleEvent::Started {
            symbol:        self.config.symbol.clone(),
            timeframe:     self.config.timeframe.to_string(),
            ema_fast:      self.config.ema_fast,
            ema_slow:      self.config.ema_slow,
            paper_trading: self.executor.is_paper(),
        })
        .await;

        loop {
            debug!("🔄 Cycle starting...");

            match self.run_cycle().await {
                Ok(outcome) => info!(?outcome, position = %self.position().state(), "Cycle complete"),
                Err(e) => error!(error = %e, "❌ Cycle skipped — will retry next interval"),
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        self.notify(CycleEvent::Stopped {
            summary:       self.ledger.summary(),
            open_position: self.position().as_long().cloned().map(Box::new),
        })
        .await;

        for trade in self.ledger.trades() {
            info!(
                reason = %trade.reason,
                entry  = trade.entry_price,
                exit   = trade.exit_price,
                pnl    = trade.pnl,
                "Session trade"
            );
        }
        if self.position().is_long() {
            warn!(
                entry  = ?self.position().entry_price(),
                stop   = ?self.position().stop_price(),
                target = ?self.position().target_price(),
                "Position left open at shutdown"
            );
        }
        info!(status = ?self.risk.status(Utc::now()), "Risk status at shutdown");
    }

    // ─── One Cycle ────────────────────────────────────────────────────────────

    /// Errors mean the cycle was skipped before any position change.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, BotError> {
        let bars = self
            .market
            .fetch_recent_bars(&self.config.symbol, self.config.timeframe, self.config.history_bars)
            .await?;
        bar::validate_series(&bars)?;

        let eval = self.engine.evaluate(&bars, self.tracker.position());
        debug!(
            bars  = bars.len(),
            event = ?eval.event,
            fast  = ?eval.fast,
            slow  = ?eval.slow,
            "Signal evaluated"
        );

        if let TradeAction::Hold { reason: HoldReason::InsufficientHistory, .. } = eval.action {
            let err = BotError::InsufficientHistory {
                have: bars.len(),
                need: self.engine.slow_period(),
            };
            warn!(error = %err, "Signal detection skipped");
        }

        let latest_bar = bars.last().map(|b| b.timestamp);
        let action = suppress_repeat_entry(eval.action, self.last_traded_bar, latest_bar);

        match action {
            TradeAction::Hold { price, reason } => {
                if let (Some(open), Some(p)) = (self.tracker.position().as_long(), price) {
                    debug!(
                        price      = p,
                        stop       = open.stop_price,
                        target     = open.target_price,
                        check      = ?self.tracker.check_stop_or_target(p),
                        unrealised = open.unrealised_pnl(p),
                        "Holding LONG"
                    );
                }
                self.notify(CycleEvent::Held {
                    symbol: self.config.symbol.clone(),
                    price,
                    reason,
                })
                .await;
                Ok(CycleOutcome::Held(reason))
            }
            TradeAction::EnterLong { price } => Ok(self.enter(price, latest_bar).await),
            TradeAction::ExitLong { price, reason } => Ok(self.exit(price, reason, latest_bar).await),
        }
    }

    async fn enter(&mut self, price: f64, bar_time: Option<DateTime<Utc>>) -> CycleOutcome {
        // ── Risk Check ────────────────────────────────────────────────────────
        if let RiskDecision::Blocked(reason) = self.risk.pre_entry_check(Utc::now()) {
            return self.block_entry(reason, HoldReason::RiskBlocked).await;
        }

        // ── Levels (ก่อนส่ง Order เสมอ) ───────────────────────────────────────
        if self
            .config
            .stop_policy
            .levels(price, self.config.risk_reward_ratio)
            .is_none()
        {
            let reason = format!(
                "stop distance {:.2} leaves no stop above zero at entry {price:.2}",
                self.config.stop_policy.distance(price)
            );
            return self.block_entry(reason, HoldReason::InvalidLevels).await;
        }

        let order = OrderRequest {
            symbol:          self.config.symbol.clone(),
            side:            Side::Buy,
            quantity:        self.config.order_quantity,
            reference_price: price,
        };

        // ── Position Size vs Balance ──────────────────────────────────────────
        if self.config.risk.needs_balance() {
            let balance = match self.executor.quote_balance().await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    warn!(error = %e, "Balance query failed");
                    None
                }
            };
            if let RiskDecision::Blocked(reason) = self.risk.check_entry_size(order.notional(), balance) {
                return self.block_entry(reason, HoldReason::RiskBlocked).await;
            }
        }

        // ── Execute ───────────────────────────────────────────────────────────
        let fill = match self.executor.submit_market_order(&order).await {
            Ok(fill) => fill,
            Err(e) => return self.order_failed(Side::Buy, e).await,
        };

        // ── Update Position ───────────────────────────────────────────────────
        let opened = self.tracker.open(
            fill.fill_price,
            fill.quantity,
            self.config.risk_reward_ratio,
            self.config.stop_policy,
            fill.filled_at,
        );
        let position = match opened {
            Ok(open) => open.clone(),
            Err(e) => return self.defect(e).await,
        };

        self.risk.record_entry(Utc::now());
        self.last_traded_bar = bar_time;

        info!(
            order_id = %fill.order_id,
            entry    = position.entry_price,
            stop     = position.stop_price,
            target   = position.target_price,
            "🎯 Position opened"
        );

        self.notify(CycleEvent::PositionOpened {
            symbol:    self.config.symbol.clone(),
            position:  Box::new(position),
            simulated: fill.simulated,
        })
        .await;

        CycleOutcome::Entered { price: fill.fill_price }
    }

    async fn exit(
        &mut self,
        price: f64,
        reason: ExitReason,
        bar_time: Option<DateTime<Utc>>,
    ) -> CycleOutcome {
        let quantity = match self.tracker.position().as_long() {
            Some(open) => open.quantity,
            None => {
                let err = BotError::InvalidStateTransition {
                    state:     self.tracker.position().state(),
                    attempted: "close",
                };
                return self.defect(err).await;
            }
        };

        let order = OrderRequest {
            symbol:          self.config.symbol.clone(),
            side:            Side::Sell,
            quantity,
            reference_price: price,
        };

        let fill = match self.executor.submit_market_order(&order).await {
            Ok(fill) => fill,
            Err(e) => return self.order_failed(Side::Sell, e).await,
        };

        let trade = match self.tracker.close(fill.fill_price, reason, fill.filled_at) {
            Ok(trade) => trade,
            Err(e) => return self.defect(e).await,
        };

        self.risk.record_exit(trade.pnl, Utc::now());
        self.ledger.record(trade.clone());
        self.last_traded_bar = bar_time;

        info!(
            order_id = %fill.order_id,
            reason   = %reason,
            exit     = trade.exit_price,
            pnl      = trade.pnl,
            "🏁 Position closed"
        );

        let pnl = trade.pnl;
        self.notify(CycleEvent::PositionClosed {
            symbol:    self.config.symbol.clone(),
            trade:     Box::new(trade),
            simulated: fill.simulated,
        })
        .await;

        CycleOutcome::Exited { reason, pnl }
    }

    // ─── Failure paths ────────────────────────────────────────────────────────

    async fn block_entry(&mut self, reason: String, hold: HoldReason) -> CycleOutcome {
        warn!(reason = %reason, "Entry blocked by risk guard");
        self.notify(CycleEvent::RiskBlocked {
            symbol: self.config.symbol.clone(),
            reason,
        })
        .await;
        CycleOutcome::Held(hold)
    }

    async fn order_failed(&mut self, side: Side, err: BotError) -> CycleOutcome {
        let kind = match &err {
            BotError::OrderExecution { kind, .. } => *kind,
            _ => OrderErrorKind::Transient,
        };

        error!(side = %side, error = %err, "Order failed — position unchanged");
        self.risk.record_failure(Utc::now());

        self.notify(CycleEvent::OrderFailed {
            symbol: self.config.symbol.clone(),
            side:   side.to_string(),
            error:  err.to_string(),
        })
        .await;

        CycleOutcome::OrderFailed(kind)
    }

    async fn defect(&mut self, err: BotError) -> CycleOutcome {
        error!(error = %err, defect = err.is_defect(), "🐞 Position tracker refused transition");
        self.risk.kill(&format!("internal error: {err}"));
        self.notify(CycleEvent::Defect { error: err.to_string() }).await;
        CycleOutcome::Defect
    }

    async fn notify(&self, event: CycleEvent) {
        debug!(event = %event.to_json(), "Cycle event");

        if !event.should_notify() {
            return;
        }
        if let Err(e) = self.notifier.send_message(&event.to_message()).await {
            warn!(error = %e, "Notification failed — continuing");
        }
    }
}

/// A bullish crossover is acted on at most once per bar.  When the poll
/// interval is shorter than the timeframe the same closed bar is seen again,
/// and without this a stop-out could be followed by an immediate re-entry.
pub fn suppress_repeat_entry(
    action: TradeAction,
    last_traded_bar: Option<DateTime<Utc>>,
    latest_bar: Option<DateTime<Utc>>,
) -> TradeAction {
    match action {
        TradeAction::EnterLong { price } if latest_bar.is_some() && latest_bar == last_traded_bar => {
            TradeAction::hold(Some(price), HoldReason::BarAlreadyTraded)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::config::{make_config, Timeframe};
    use crate::engine::tracker::StopPolicy;
    use crate::exchange::{Fill, PaperExecutor};
    use crate::models::bar::make_bars;
    use crate::models::{PositionState, PriceBar};

    // ─── Scripted collaborators ──────────────────────────────────────────────

    struct ScriptedMarket {
        script: Mutex<VecDeque<Result<Vec<PriceBar>, String>>>,
    }

    impl ScriptedMarket {
        fn new(script: Vec<Result<Vec<PriceBar>, String>>) -> Self {
            Self { script: Mutex::new(script.into()) }
        }
    }

    #[async_trait]
    impl MarketData for ScriptedMarket {
        async fn fetch_recent_bars(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _count: usize,
        ) -> Result<Vec<PriceBar>, BotError> {
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(bars)) => Ok(bars),
                Some(Err(msg)) => Err(BotError::DataFetch(msg)),
                None => Err(BotError::DataFetch("script exhausted".into())),
            }
        }
    }

    /// Fills at the reference price except on the listed call numbers.
    #[derive(Clone, Default)]
    struct FlakyExecutor {
        fail_on: Vec<usize>,
        /// Free quote balance; `None` reads as 1000.
        balance: Option<f64>,
        orders:  Arc<Mutex<Vec<OrderRequest>>>,
    }

    #[async_trait]
    impl OrderExecutor for FlakyExecutor {
        async fn submit_market_order(&self, order: &OrderRequest) -> Result<Fill, BotError> {
            let call = {
                let mut orders = self.orders.lock().unwrap();
                orders.push(order.clone());
                orders.len()
            };
            if self.fail_on.contains(&call) {
                return Err(BotError::order(OrderErrorKind::Transient, "exchange timeout"));
            }
            Ok(Fill {
                order_id:   format!("T-{call}"),
                fill_price: order.reference_price,
                quantity:   order.quantity,
                filled_at:  Utc::now(),
                simulated:  true,
            })
        }

        async fn quote_balance(&self) -> Result<f64, BotError> {
            Ok(self.balance.unwrap_or(1_000.0))
        }

        fn is_paper(&self) -> bool {
            true
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        fail:     bool,
        messages: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_message(&self, text: &str) -> Result<(), BotError> {
            self.messages.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(BotError::Notification("chat down".into()));
            }
            Ok(())
        }
    }

    fn orchestrator(
        script: Vec<Result<Vec<PriceBar>, String>>,
        executor: FlakyExecutor,
        notifier: RecordingNotifier,
    ) -> CycleOrchestrator {
        orchestrator_with(make_config(), script, Box::new(executor), notifier)
    }

    fn orchestrator_with(
        config: Config,
        script: Vec<Result<Vec<PriceBar>, String>>,
        executor: Box<dyn OrderExecutor>,
        notifier: RecordingNotifier,
    ) -> CycleOrchestrator {
        CycleOrchestrator::new(
            config,
            Box::new(ScriptedMarket::new(script)),
            executor,
            Box::new(notifier),
        )
    }

    // fast=2 / slow=3: the jump to 12 crosses fast above slow on the last bar
    fn bullish_bars() -> Vec<PriceBar> {
        make_bars(&[10.0, 9.0, 8.0, 7.0, 12.0])
    }

    // same history plus a bar closing at 6 — below the stop at 12 - 5 = 7
    fn stop_bars() -> Vec<PriceBar> {
        make_bars(&[10.0, 9.0, 8.0, 7.0, 12.0, 6.0])
    }

    #[tokio::test]
    async fn test_bullish_enters_at_close() {
        let executor = FlakyExecutor::default();
        let notifier = RecordingNotifier::default();
        let mut bot = orchestrator(vec![Ok(bullish_bars())], executor.clone(), notifier.clone());

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Entered { price: 12.0 });

        let pos = bot.position();
        assert_eq!(pos.state(), PositionState::Long);
        assert_eq!(pos.entry_price(), Some(12.0));
        assert_eq!(pos.stop_price(), Some(7.0));
        assert_eq!(pos.target_price(), Some(22.0));

        let orders = executor.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
        assert!(notifier.messages.lock().unwrap()[0].contains("BUY BTCUSDT"));
    }

    #[tokio::test]
    async fn test_short_history_holds_without_orders() {
        let executor = FlakyExecutor::default();
        let mut bot = orchestrator(
            vec![Ok(make_bars(&[100.0, 101.0]))],
            executor.clone(),
            RecordingNotifier::default(),
        );

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Held(HoldReason::InsufficientHistory));
        assert_eq!(bot.position(), &Position::Flat);
        assert!(executor.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_exit_keeps_position_and_retries() {
        // call 1 = entry (ok), call 2 = exit (fails), call 3 = exit retry (ok)
        let executor = FlakyExecutor { fail_on: vec![2], ..Default::default() };
        let notifier = RecordingNotifier::default();
        let mut bot = orchestrator(
            vec![Ok(bullish_bars()), Ok(stop_bars()), Ok(stop_bars())],
            executor.clone(),
            notifier.clone(),
        );

        bot.run_cycle().await.unwrap();
        let before = bot.position().clone();

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::OrderFailed(OrderErrorKind::Transient));
        assert_eq!(bot.position(), &before);
        assert!(notifier
            .messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("SELL BTCUSDT failed")));

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Exited { reason: ExitReason::Stop, pnl: -6.0 });
        assert_eq!(bot.position(), &Position::Flat);
        assert_eq!(bot.ledger().trades().len(), 1);
        assert_eq!(executor.orders.lock().unwrap()[2].side, Side::Sell);
    }

    #[tokio::test]
    async fn test_failed_entry_leaves_flat() {
        let executor = FlakyExecutor { fail_on: vec![1], ..Default::default() };
        let mut bot = orchestrator(vec![Ok(bullish_bars())], executor, RecordingNotifier::default());

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::OrderFailed(OrderErrorKind::Transient));
        assert_eq!(bot.position(), &Position::Flat);
    }

    #[tokio::test]
    async fn test_fetch_error_skips_cycle() {
        let executor = FlakyExecutor::default();
        let mut bot = orchestrator(
            vec![Err("connection reset".into())],
            executor.clone(),
            RecordingNotifier::default(),
        );

        let err = bot.run_cycle().await.unwrap_err();
        assert!(matches!(err, BotError::DataFetch(_)));
        assert_eq!(bot.position(), &Position::Flat);
        assert!(executor.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unordered_bars_skip_cycle() {
        let mut bars = bullish_bars();
        bars.swap(0, 1);
        let mut bot = orchestrator(vec![Ok(bars)], FlakyExecutor::default(), RecordingNotifier::default());

        assert!(matches!(bot.run_cycle().await, Err(BotError::DataFetch(_))));
        assert_eq!(bot.position(), &Position::Flat);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_block_trading() {
        let notifier = RecordingNotifier { fail: true, ..Default::default() };
        let mut bot = orchestrator(vec![Ok(bullish_bars())], FlakyExecutor::default(), notifier);

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Entered { price: 12.0 });
        assert!(bot.position().is_long());
    }

    #[tokio::test]
    async fn test_risk_guard_blocks_entry() {
        let executor = FlakyExecutor::default();
        let notifier = RecordingNotifier::default();
        let mut bot = orchestrator(vec![Ok(bullish_bars())], executor.clone(), notifier.clone());
        bot.risk.kill("maintenance");

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Held(HoldReason::RiskBlocked));
        assert!(executor.orders.lock().unwrap().is_empty());
        assert!(notifier.messages.lock().unwrap()[0].contains("blocked"));
    }

    #[tokio::test]
    async fn test_unusable_stop_sends_no_order() {
        // 50 below an entry at 12 is no stop at all
        let config = Config { stop_policy: StopPolicy::Absolute(50.0), ..make_config() };
        config.validate().unwrap();

        let executor = FlakyExecutor::default();
        let notifier = RecordingNotifier::default();
        let mut bot = orchestrator_with(
            config,
            vec![Ok(bullish_bars())],
            Box::new(executor.clone()),
            notifier.clone(),
        );

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Held(HoldReason::InvalidLevels));
        assert!(executor.orders.lock().unwrap().is_empty());
        assert_eq!(bot.position(), &Position::Flat);
        assert!(notifier.messages.lock().unwrap()[0].contains("blocked"));
    }

    #[tokio::test]
    async fn test_paper_stop_exit_below_min_notional_closes() {
        // entry notional 12 clears MIN_NOTIONAL 10, the stop fill at 6 does not
        let mut bot = orchestrator_with(
            make_config(),
            vec![Ok(bullish_bars()), Ok(stop_bars())],
            Box::new(PaperExecutor::new(10.0, 1_000.0)),
            RecordingNotifier::default(),
        );

        assert_eq!(bot.run_cycle().await.unwrap(), CycleOutcome::Entered { price: 12.0 });
        assert_eq!(
            bot.run_cycle().await.unwrap(),
            CycleOutcome::Exited { reason: ExitReason::Stop, pnl: -6.0 }
        );
        assert_eq!(bot.position(), &Position::Flat);
    }

    #[tokio::test]
    async fn test_position_size_cap_blocks_entry() {
        // 10% of 50 = 5 quote, the entry costs 12
        let executor = FlakyExecutor { balance: Some(50.0), ..Default::default() };
        let notifier = RecordingNotifier::default();
        let mut bot = orchestrator(vec![Ok(bullish_bars())], executor.clone(), notifier.clone());

        let outcome = bot.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Held(HoldReason::RiskBlocked));
        assert!(executor.orders.lock().unwrap().is_empty());
        assert!(notifier.messages.lock().unwrap()[0].contains("exceeds 10% of balance"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_and_reports() {
        let notifier = RecordingNotifier::default();
        let mut bot = orchestrator(vec![Ok(bullish_bars())], FlakyExecutor::default(), notifier.clone());

        bot.run(async {}).await;

        let messages = notifier.messages.lock().unwrap();
        assert!(messages.first().unwrap().contains("started"));
        let last = messages.last().unwrap();
        assert!(last.contains("stopped"));
        assert!(last.contains("Position still open"));
    }

    #[test]
    fn test_repeat_entry_on_same_bar_suppressed() {
        let bar = make_bars(&[1.0])[0].timestamp;
        let enter = TradeAction::EnterLong { price: 10.0 };

        assert_eq!(
            suppress_repeat_entry(enter, Some(bar), Some(bar)),
            TradeAction::hold(Some(10.0), HoldReason::BarAlreadyTraded)
        );
        assert_eq!(suppress_repeat_entry(enter, None, Some(bar)), enter);

        let exit = TradeAction::ExitLong { price: 10.0, reason: ExitReason::Stop };
        assert_eq!(suppress_repeat_entry(exit, Some(bar), Some(bar)), exit);
    }
}
