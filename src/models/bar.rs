//! # models::bar
//!
//! Defines [`PriceBar`] — one OHLCV candle as returned by the exchange's
//! kline endpoint.  Bars are immutable once fetched; the pipeline only ever
//! reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BotError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Open time of the bar.
    pub timestamp: DateTime<Utc>,
    pub open:      f64,
    pub high:      f64,
    pub low:       f64,
    pub close:     f64,
    pub volume:    f64,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self { timestamp, open, high, low, close, volume }
    }
}

/// Close prices of `bars`, index-aligned.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Bars must be strictly increasing in time with no duplicates.
///
/// A violation means the data source handed us something we cannot align
/// EMA values against, so the cycle is treated as a failed fetch.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), BotError> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(BotError::DataFetch(format!(
                "bars out of order at index {}: {} then {}",
                i + 1,
                pair[0].timestamp,
                pair[1].timestamp,
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    use chrono::TimeZone;

    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            PriceBar::new(
                start + chrono::Duration::hours(i as i64),
                c, c + 0.5, c - 0.5, c, 1000.0,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_series_is_valid() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        assert!(validate_series(&bars).is_ok());
        assert_eq!(closes(&bars), vec![100.0, 101.0, 102.0]);
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0]);
        bars[2].timestamp = bars[1].timestamp;
        assert!(matches!(validate_series(&bars), Err(BotError::DataFetch(_))));
    }

    #[test]
    fn test_empty_and_single_are_valid() {
        assert!(validate_series(&[]).is_ok());
        assert!(validate_series(&make_bars(&[1.0])).is_ok());
    }
}
