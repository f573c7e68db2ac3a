//! RSI (Relative Strength Index).
//!
//! Average gain and average loss are simple rolling means over `period`
//! price changes (not Wilder's smoothing), with a minimum of one observation
//! so early bars already carry a value. A small epsilon on the average loss
//! keeps the ratio finite:
//!
//! RSI = 100 - 100 / (1 + avg_gain / (avg_loss + 1e-9))
//!
//! The first bar has no price change and therefore no RSI.

use super::rolling::{diff, rolling_mean};

pub const DEFAULT_PERIOD: usize = 14;
pub const LOSS_EPSILON: f64 = 1e-9;

pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let delta = diff(closes);
    let gains: Vec<Option<f64>> = delta.iter().map(|d| d.map(|v| v.max(0.0))).collect();
    let losses: Vec<Option<f64>> = delta.iter().map(|d| d.map(|v| (-v).max(0.0))).collect();

    let avg_gain = rolling_mean(&gains, period, 1);
    let avg_loss = rolling_mean(&losses, period, 1);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(g, l)| match (g, l) {
            (Some(g), Some(l)) => {
                let rs = g / (l + LOSS_EPSILON);
                Some(100.0 - 100.0 / (1.0 + rs))
            }
            _ => None,
        })
        .collect()
}
