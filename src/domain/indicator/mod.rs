//! Technical indicators and the per-bar snapshot they are fused into.
//!
//! - `IndicatorConfig`: window/period parameters
//! - `IndicatorSnapshot`: every indicator value for a single bar
//! - `IndicatorFrame`: snapshots for a whole window, oldest to newest
//! - `IndicatorEngine`: computes a frame from a `BarSeries`
//!
//! Values that need more history than the window provides are `None`, never zero.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rolling;
pub mod rsi;

pub use bollinger::{calculate_bollinger, BollingerBands};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdValue};
pub use rsi::calculate_rsi;

use chrono::NaiveDateTime;

use crate::domain::bar::BarSeries;
use crate::domain::error::TraderError;
use rolling::{pct_change, present, rolling_mean, rolling_sum};

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub ma_short: usize,
    pub ma_mid: usize,
    pub ma_long: usize,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volume_window: usize,
    pub trend_window: usize,
    /// Fewer bars than this is reported as insufficient data.
    pub min_bars: usize,
    /// Minimum window while a position is open. Exit checks only need the
    /// short indicators, so this may sit below `min_bars`.
    pub exit_min_bars: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            rsi_period: rsi::DEFAULT_PERIOD,
            ma_short: 5,
            ma_mid: 10,
            ma_long: 20,
            bollinger_window: bollinger::DEFAULT_WINDOW,
            bollinger_k: bollinger::DEFAULT_K,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            volume_window: 10,
            trend_window: 5,
            min_bars: 30,
            exit_min_bars: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub rsi: Option<f64>,
    pub ma_short: Option<f64>,
    pub ma_mid: Option<f64>,
    pub ma_long: Option<f64>,
    pub bollinger: Option<BollingerBands>,
    pub macd: MacdValue,
    /// (high - low) / low of this bar.
    pub volatility: f64,
    pub volume_ratio: Option<f64>,
    pub price_change: Option<f64>,
    /// Sum of the most recent `trend_window` one-bar price changes.
    pub trend: Option<f64>,
}

/// Indicator snapshots for a window of bars, oldest first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    snapshots: Vec<IndicatorSnapshot>,
}

impl IndicatorFrame {
    /// Wrap precomputed snapshots. Needs at least two (latest and previous).
    pub fn from_snapshots(snapshots: Vec<IndicatorSnapshot>) -> Option<Self> {
        (snapshots.len() >= 2).then_some(IndicatorFrame { snapshots })
    }

    pub fn latest(&self) -> &IndicatorSnapshot {
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// The bar before the latest one. Frames hold at least two bars.
    pub fn previous(&self) -> &IndicatorSnapshot {
        &self.snapshots[self.snapshots.len() - 2]
    }

    /// The snapshot `n` bars before the latest (`back(0)` is the latest).
    pub fn back(&self, n: usize) -> Option<&IndicatorSnapshot> {
        self.snapshots
            .len()
            .checked_sub(n + 1)
            .map(|idx| &self.snapshots[idx])
    }

    pub fn snapshots(&self) -> &[IndicatorSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Deterministic, stateless indicator computation over a bar window.
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn compute(&self, series: &BarSeries) -> Result<IndicatorFrame, TraderError> {
        self.compute_with_minimum(series, self.config.min_bars)
    }

    /// Like [`compute`](Self::compute) but with the bar requirement given by
    /// the caller. Never goes below two bars.
    pub fn compute_with_minimum(
        &self,
        series: &BarSeries,
        min_bars: usize,
    ) -> Result<IndicatorFrame, TraderError> {
        let cfg = &self.config;
        let minimum = min_bars.max(2);
        if series.len() < minimum {
            return Err(TraderError::InsufficientData {
                bars: series.len(),
                minimum,
            });
        }

        let closes = series.closes();
        let close_values = present(&closes);
        let volumes = present(&series.volumes());

        let rsi = calculate_rsi(&closes, cfg.rsi_period);
        let ma_short = rolling_mean(&close_values, cfg.ma_short, cfg.ma_short);
        let ma_mid = rolling_mean(&close_values, cfg.ma_mid, cfg.ma_mid);
        let ma_long = rolling_mean(&close_values, cfg.ma_long, cfg.ma_long);
        let bands = calculate_bollinger(&closes, cfg.bollinger_window, cfg.bollinger_k);
        let macd = calculate_macd(&closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal);
        let volume_mean = rolling_mean(&volumes, cfg.volume_window, cfg.volume_window);
        let price_change = pct_change(&closes);
        let trend = rolling_sum(&price_change, cfg.trend_window, cfg.trend_window);

        let snapshots = series
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| IndicatorSnapshot {
                timestamp: bar.timestamp,
                close: bar.close,
                rsi: rsi[i],
                ma_short: ma_short[i],
                ma_mid: ma_mid[i],
                ma_long: ma_long[i],
                bollinger: bands[i],
                macd: macd.get(i).copied().unwrap_or(MacdValue {
                    line: 0.0,
                    signal: 0.0,
                    histogram: 0.0,
                }),
                volatility: bar.range_volatility(),
                volume_ratio: volume_mean[i]
                    .filter(|mean| *mean > 0.0)
                    .map(|mean| bar.volume / mean),
                price_change: price_change[i],
                trend: trend[i],
            })
            .collect();

        Ok(IndicatorFrame { snapshots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        BarSeries::from_bars(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Bar {
                    timestamp: start + Duration::minutes(i as i64),
                    open: close,
                    high: close * 1.001,
                    low: close * 0.999,
                    close,
                    volume: 100.0 + i as f64,
                })
                .collect(),
        )
    }

    #[test]
    fn insufficient_data_below_min_bars() {
        let engine = IndicatorEngine::default();
        match engine.compute(&series(&[100.0; 29])) {
            Err(TraderError::InsufficientData { bars, minimum }) => {
                assert_eq!(bars, 29);
                assert_eq!(minimum, 30);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn explicit_minimum_overrides_min_bars() {
        let engine = IndicatorEngine::default();
        let frame = engine.compute_with_minimum(&series(&[100.0; 22]), 20).unwrap();
        assert_eq!(frame.len(), 22);
        assert!(frame.latest().ma_long.is_some());
        assert!(engine.compute_with_minimum(&series(&[100.0; 1]), 0).is_err());
    }

    #[test]
    fn frame_covers_every_bar() {
        let engine = IndicatorEngine::default();
        let frame = engine.compute(&series(&[100.0; 40])).unwrap();
        assert_eq!(frame.len(), 40);
        assert_eq!(frame.latest().timestamp, frame.snapshots()[39].timestamp);
        assert_eq!(frame.previous().timestamp, frame.snapshots()[38].timestamp);
        assert_eq!(frame.back(5).unwrap().timestamp, frame.snapshots()[34].timestamp);
        assert!(frame.back(40).is_none());
    }

    #[test]
    fn moving_averages_unavailable_until_window_fills() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let frame = IndicatorEngine::default().compute(&series(&closes)).unwrap();
        let snaps = frame.snapshots();
        assert!(snaps[3].ma_short.is_none());
        assert!(snaps[4].ma_short.is_some());
        assert!(snaps[18].ma_long.is_none());
        assert!(snaps[19].ma_long.is_some());
        assert!(snaps[18].bollinger.is_none());
        assert!(snaps[9].volume_ratio.is_some());
        assert!(snaps[8].volume_ratio.is_none());
        assert!(snaps[4].trend.is_none());
        assert!(snaps[5].trend.is_some());
    }

    #[test]
    fn latest_values_match_primitives() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 7) as f64).collect();
        let frame = IndicatorEngine::default().compute(&series(&closes)).unwrap();
        let latest = frame.latest();

        let ma5 = closes[25..].iter().sum::<f64>() / 5.0;
        assert!((latest.ma_short.unwrap() - ma5).abs() < 1e-9);

        let trend: f64 = (25..30).map(|i| closes[i] / closes[i - 1] - 1.0).sum();
        assert!((latest.trend.unwrap() - trend).abs() < 1e-12);

        let vol_mean = (20..30).map(|i| 100.0 + i as f64).sum::<f64>() / 10.0;
        assert!((latest.volume_ratio.unwrap() - 129.0 / vol_mean).abs() < 1e-12);
    }

    #[test]
    fn volatility_is_range_based() {
        let frame = IndicatorEngine::default().compute(&series(&[100.0; 30])).unwrap();
        let expected = (100.0 * 1.001 - 100.0 * 0.999) / (100.0 * 0.999);
        assert!((frame.latest().volatility - expected).abs() < 1e-12);
    }
}
