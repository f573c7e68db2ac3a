//! Snapshot builders for scorer and exit tests.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::domain::indicator::{BollingerBands, IndicatorFrame, IndicatorSnapshot, MacdValue};

pub fn minute(n: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 30)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        + Duration::minutes(n)
}

/// A snapshot that scores zero on every factor.
pub fn neutral(close: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        timestamp: minute(0),
        close,
        rsi: Some(50.0),
        ma_short: Some(close),
        ma_mid: Some(close),
        ma_long: Some(close),
        bollinger: Some(BollingerBands {
            lower: close * 0.9,
            middle: close,
            upper: close * 1.1,
        }),
        macd: MacdValue {
            line: 0.0,
            signal: 0.0,
            histogram: 0.0,
        },
        volatility: 0.001,
        volume_ratio: Some(1.0),
        price_change: Some(0.0),
        trend: Some(0.0),
    }
}

/// Frame of `n` neutral bars whose last two entries are replaced by
/// `previous` and `latest`.
pub fn frame(previous: IndicatorSnapshot, latest: IndicatorSnapshot) -> IndicatorFrame {
    frame_with_history(8, previous, latest)
}

pub fn frame_with_history(
    n: usize,
    previous: IndicatorSnapshot,
    latest: IndicatorSnapshot,
) -> IndicatorFrame {
    let mut snapshots: Vec<IndicatorSnapshot> = (0..n.saturating_sub(2))
        .map(|i| IndicatorSnapshot {
            timestamp: minute(i as i64),
            ..neutral(previous.close)
        })
        .collect();
    let base = snapshots.len() as i64;
    snapshots.push(IndicatorSnapshot {
        timestamp: minute(base),
        ..previous
    });
    snapshots.push(IndicatorSnapshot {
        timestamp: minute(base + 1),
        ..latest
    });
    IndicatorFrame::from_snapshots(snapshots).unwrap()
}
