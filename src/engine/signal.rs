//! # engine::signal
//!
//! **Signal Detector** — crossover between the fast and slow EMA.
//!
//! Only the last two aligned pairs are read.  The comparison is strict:
//! `fast == slow` counts as "not above", so an exact tie never flips the
//! state back and forth.
//!
//! ```text
//! prev: fast <= slow  →  curr: fast >  slow   ⇒ BULLISH
//! prev: fast >  slow  →  curr: fast <= slow   ⇒ BEARISH
//! otherwise                                   ⇒ NONE
//! ```

use crate::models::CrossoverEvent;

/// Classify one transition between two consecutive `(fast, slow)` pairs.
pub fn classify(prev: (f64, f64), curr: (f64, f64)) -> CrossoverEvent {
    let was_above = prev.0 > prev.1;
    let is_above  = curr.0 > curr.1;

    match (was_above, is_above) {
        (false, true) => CrossoverEvent::Bullish,
        (true, false) => CrossoverEvent::Bearish,
        _             => CrossoverEvent::None,
    }
}

/// Crossover at the end of two index-aligned EMA series.
///
/// Returns `None` (the event) unless both series hold values at the last two
/// indices.
pub fn detect_crossover(fast: &[Option<f64>], slow: &[Option<f64>]) -> CrossoverEvent {
    match (last_two(fast), last_two(slow)) {
        (Some((f_prev, f_curr)), Some((s_prev, s_curr))) => {
            classify((f_prev, s_prev), (f_curr, s_curr))
        }
        _ => CrossoverEvent::None,
    }
}

fn last_two(series: &[Option<f64>]) -> Option<(f64, f64)> {
    match series {
        [.., Some(prev), Some(curr)] => Some((*prev, *curr)),
        _ => None,
    }
}
