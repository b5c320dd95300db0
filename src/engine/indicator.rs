//! # engine::indicator
//!
//! **Indicator Engine** — fast / slow EMA series from close prices.
//!
//! ```text
//! k       = 2 / (period + 1)
//! ema[p-1] = SMA(price[0..p])            ← seed
//! ema[i]   = price[i]*k + ema[i-1]*(1-k)  for i >= p
//! ```
//!
//! Entries before the seed are `None`.  Output is always index-aligned with the
//! input, so `ema[i]` belongs to `bars[i]`.

use crate::models::{bar, PriceBar};

/// EMA of `prices` with an SMA seed.
///
/// Never fails: `period == 0` or `prices.len() < period` gives an all-`None`
/// series of the same length.  A non-finite price leaves every entry from that
/// index on as `None`.
pub fn compute_ema(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut result = vec![None; n];

    if period == 0 || n < period {
        return result;
    }

    let seed_window = &prices[..period];
    if seed_window.iter().any(|p| !p.is_finite()) {
        return result;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    result[period - 1] = Some(prev);

    for i in period..n {
        let price = prices[i];
        if !price.is_finite() {
            break;
        }
        prev = price * k + prev * (1.0 - k);
        result[i] = Some(prev);
    }

    result
}

/// Fast and slow EMA over the same bars.
#[derive(Debug, Clone, PartialEq)]
pub struct EmaPair {
    pub fast: Vec<Option<f64>>,
    pub slow: Vec<Option<f64>>,
}

impl EmaPair {
    pub fn from_bars(bars: &[PriceBar], fast_period: usize, slow_period: usize) -> Self {
        let closes = bar::closes(bars);
        Self {
            fast: compute_ema(&closes, fast_period),
            slow: compute_ema(&closes, slow_period),
        }
    }

    /// Most recent `(fast, slow)` if both are defined.
    pub fn latest(&self) -> Option<(f64, f64)> {
        match (self.fast.last(), self.slow.last()) {
            (Some(&Some(f)), Some(&Some(s))) => Some((f, s)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bar::make_bars;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_length_matches_and_warmup_is_none() {
        let prices: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        for period in 1..=20 {
            let ema = compute_ema(&prices, period);
            assert_eq!(ema.len(), prices.len());
            assert!(ema[..period - 1].iter().all(Option::is_none), "period {period}");
            assert!(ema[period - 1..].iter().all(Option::is_some), "period {period}");
        }
    }

    #[test]
    fn test_period_one_equals_price() {
        let prices = [3.0, 7.0, 5.0];
        let ema = compute_ema(&prices, 1);
        assert_eq!(ema, vec![Some(3.0), Some(7.0), Some(5.0)]);
    }

    #[test]
    fn test_sma_seed_then_recurrence() {
        // period 3 → k = 0.5, seed = (2+4+6)/3 = 4
        let ema = compute_ema(&[2.0, 4.0, 6.0, 8.0, 10.0], 3);
        assert_eq!(ema[..2], [None, None]);
        assert!((ema[2].unwrap() - 4.0).abs() < EPS);
        assert!((ema[3].unwrap() - 6.0).abs() < EPS); // 8*0.5 + 4*0.5
        assert!((ema[4].unwrap() - 8.0).abs() < EPS); // 10*0.5 + 6*0.5
    }

    #[test]
    fn test_short_input_is_all_none() {
        let ema = compute_ema(&[1.0, 2.0], 5);
        assert_eq!(ema, vec![None, None]);
        assert!(compute_ema(&[], 3).is_empty());
        assert_eq!(compute_ema(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn test_monotonic_input_gives_monotonic_ema_converging() {
        // rising then flat at 100 → EMA rises monotonically toward 100
        let mut prices: Vec<f64> = (0..10).map(|i| 50.0 + i as f64 * 5.0).collect();
        prices.extend(std::iter::repeat(100.0).take(200));

        let ema: Vec<f64> = compute_ema(&prices, 5).into_iter().flatten().collect();
        assert!(ema.windows(2).all(|w| w[1] >= w[0]));
        assert!(ema.iter().all(|&v| v <= 100.0));
        assert!((100.0 - ema.last().unwrap()).abs() < 1e-6);
    }

    #[test]
    fn test_falling_input_gives_falling_ema() {
        let prices: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let ema: Vec<f64> = compute_ema(&prices, 4).into_iter().flatten().collect();
        assert!(ema.windows(2).all(|w| w[1] < w[0]));
        assert!(ema.iter().zip(prices[3..].iter()).all(|(e, p)| e >= p));
    }

    #[test]
    fn test_nan_taints_rest_of_series() {
        let ema = compute_ema(&[1.0, 2.0, 3.0, f64::NAN, 5.0], 2);
        assert!(ema[1].is_some() && ema[2].is_some());
        assert_eq!(ema[3..], [None, None]);

        let seeded_nan = compute_ema(&[f64::NAN, 2.0, 3.0], 2);
        assert!(seeded_nan.iter().all(Option::is_none));
    }

    #[test]
    fn test_pair_latest() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        let pair = EmaPair::from_bars(&bars, 2, 3);
        let (fast, slow) = pair.latest().unwrap();
        assert!(fast > slow);

        let short = EmaPair::from_bars(&bars[..2], 2, 3);
        assert!(short.latest().is_none());
    }
}
