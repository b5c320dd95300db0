//! # exchange::market — Kline history จาก Binance
//!
//! `GET /api/v3/klines?symbol=..&interval=..&limit=..` returns rows of the form
//!
//! ```json
//! [ 1499040000000, "0.016", "0.8", "0.015", "0.0159", "148976.1", 1499644799999, ... ]
//! ```
//!
//! i.e. open time (ms), O, H, L, C, volume as strings, close time (ms).  The
//! newest row is usually still forming and is dropped.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Timeframe;
use crate::error::BotError;
use crate::exchange::MarketData;
use crate::models::PriceBar;

/// Exchange-side cap on `limit`.
const MAX_KLINES: usize = 1000;

pub struct BinanceMarketData {
    client:   reqwest::Client,
    base_url: String,
}

impl BinanceMarketData {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MarketData for BinanceMarketData {
    async fn fetch_recent_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<PriceBar>, BotError> {
        // +1 เผื่อแท่งที่ยังไม่ปิด
        let limit = (count + 1).min(MAX_KLINES);
        let url = format!(
            "{}/api/v3/klines?symbol={symbol}&interval={timeframe}&limit={limit}",
            self.base_url
        );

        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| BotError::DataFetch(format!("klines unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::DataFetch(format!("klines HTTP {status}: {body}")));
        }

        let rows: Vec<Vec<Value>> = resp
            .json()
            .await
            .map_err(|e| BotError::DataFetch(format!("klines parse error: {e}")))?;

        let mut bars = parse_klines(&rows, Utc::now())?;
        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }

        debug!(symbol, %timeframe, bars = bars.len(), "Klines fetched");
        Ok(bars)
    }
}

/// Rows → closed bars.  Rows whose close time is after `now` are dropped.
pub fn parse_klines(rows: &[Vec<Value>], now: DateTime<Utc>) -> Result<Vec<PriceBar>, BotError> {
    let mut bars = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        if row.len() < 7 {
            return Err(BotError::DataFetch(format!(
                "kline row {i} has {} fields, expected at least 7",
                row.len()
            )));
        }

        let close_time = millis(&row[6], i)?;
        if close_time > now {
            debug!(row = i, %close_time, "Skipping unclosed kline");
            continue;
        }

        bars.push(PriceBar::new(
            millis(&row[0], i)?,
            number(&row[1], i)?,
            number(&row[2], i)?,
            number(&row[3], i)?,
            number(&row[4], i)?,
            number(&row[5], i)?,
        ));
    }

    if bars.len() < rows.len().saturating_sub(1) {
        warn!(rows = rows.len(), closed = bars.len(), "More than one unclosed kline in response");
    }

    Ok(bars)
}

fn millis(value: &Value, row: usize) -> Result<DateTime<Utc>, BotError> {
    value
        .as_i64()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| BotError::DataFetch(format!("kline row {row}: bad timestamp {value}")))
}

/// Binance sends prices as strings; accept plain numbers too.
fn number(value: &Value, row: usize) -> Result<f64, BotError> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| BotError::DataFetch(format!("kline row {row}: bad number {value}")))
}
