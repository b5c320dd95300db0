//! # EMA Cross — Single-Instrument Trend-Following Loop
//!
//! ## Flow
//! ```text
//! loop every POLL_INTERVAL_SECS:
//!   1. Fetch recent closed bars          (exchange::market)
//!   2. EMA fast / slow → crossover       (engine::indicator, engine::signal)
//!   3. Stop / target / signal → action   (engine::decision)
//!   4. Risk guard → submit market order  (risk, exchange::executor)
//!   5. Update FLAT ⇄ LONG                (engine::tracker)
//!   6. Notify operator                   (notifier)
//! ```
//!
//! ## Environment Variables
//!
//! | Variable             | Default                   | Description                         |
//! |----------------------|---------------------------|-------------------------------------|
//! | `SYMBOL`             | `BTCUSDT`                 | Exchange symbol                     |
//! | `TIMEFRAME`          | `1h`                      | Kline interval                      |
//! | `EMA_FAST`           | `12`                      | Fast EMA period                     |
//! | `EMA_SLOW`           | `26`                      | Slow EMA period                     |
//! | `PAPER_TRADING`      | `true`                    | Simulate fills                      |
//! | `PAPER_BALANCE`      | `1000`                    | Virtual quote balance (paper)       |
//! | `BINANCE_BASE_URL`   | `https://api.binance.com` | REST endpoint                       |
//! | `RUST_LOG`           | `emacross=debug`          | Tracing filter                      |
//!
//! The full list lives in [`config`].

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod engine;
mod error;
mod events;
mod exchange;
mod models;
mod notifier;
mod risk;

use config::{Config, ConfigError};
use engine::cycle::CycleOrchestrator;
use error::BotError;
use exchange::{BinanceExecutor, BinanceMarketData, OrderExecutor, PaperExecutor};

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional — prod can use real env vars) ─────────────────
    dotenvy::dotenv().ok();

    // ── 2. Initialise structured logging ─────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("emacross=debug".parse()?)
            .add_directive("reqwest=warn".parse()?))
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════╗
  ║   EMA CROSS — Trend-Following Loop        ║
  ║   Fetch · Evaluate · Execute · Notify     ║
  ╚═══════════════════════════════════════════╝"#);

    // ── 3. Config ────────────────────────────────────────────────────────────
    let config = Config::from_env().context("Failed to load config")?;
    let client = reqwest::Client::new();

    info!(
        symbol    = %config.symbol,
        timeframe = %config.timeframe,
        ema_fast  = config.ema_fast,
        ema_slow  = config.ema_slow,
        stop      = ?config.stop_policy,
        rr        = config.risk_reward_ratio,
        paper     = config.paper_trading,
        interval  = ?config.poll_interval,
        "Trading loop configured"
    );

    if config.poll_interval > config.timeframe.duration() {
        warn!(
            interval = ?config.poll_interval,
            bar      = ?config.timeframe.duration(),
            "Poll interval is longer than one bar — crossovers can be missed"
        );
    }

    // ── 4. Wire collaborators ────────────────────────────────────────────────
    let market = BinanceMarketData::new(client.clone(), config.exchange_url.clone());
    let executor = build_executor(&config, &client).context("Failed to build order executor")?;
    let notifier = notifier::from_config(client.clone(), config.telegram.clone());

    // ── 5. Run until Ctrl-C ──────────────────────────────────────────────────
    let mut orchestrator = CycleOrchestrator::new(config, Box::new(market), executor, notifier);

    orchestrator
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("👋 Bye");
    Ok(())
}

fn build_executor(config: &Config, client: &reqwest::Client) -> Result<Box<dyn OrderExecutor>, BotError> {
    if config.paper_trading {
        info!("📝 PAPER TRADING — orders are simulated");
        return Ok(Box::new(PaperExecutor::new(config.min_notional, config.paper_balance)));
    }

    let credentials = config
        .credentials
        .clone()
        .ok_or(ConfigError::MissingCredentials)?;

    info!(test_endpoint = config.use_test_endpoint, "💸 LIVE TRADING — orders go to the exchange");
    Ok(Box::new(BinanceExecutor::new(
        client.clone(),
        config.exchange_url.clone(),
        credentials,
        config.min_notional,
        config.quote_asset.clone(),
        config.use_test_endpoint,
    )))
}
