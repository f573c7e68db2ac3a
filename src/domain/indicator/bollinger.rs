//! Bollinger Bands.
//!
//! - Middle: rolling mean of close over `window` bars
//! - Upper: Middle + k × StdDev
//! - Lower: Middle - k × StdDev
//!
//! StdDev is the sample standard deviation (divides by N-1).
//! Bars before the first full window have no bands.

use super::rolling::{present, rolling_mean, rolling_std};

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_K: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

pub fn calculate_bollinger(closes: &[f64], window: usize, k: f64) -> Vec<Option<BollingerBands>> {
    let values = present(closes);
    let middle = rolling_mean(&values, window, window);
    let stddev = rolling_std(&values, window, window);

    middle
        .iter()
        .zip(stddev.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(BollingerBands {
                lower: m - k * s,
                middle: *m,
                upper: m + k * s,
            }),
            _ => None,
        })
        .collect()
}
