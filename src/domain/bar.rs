//! OHLCV bar representation and ordered bar history.

use chrono::NaiveDateTime;

/// Timestamp format used by the bar table and CSV imports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high - low) / low
    pub fn range_volatility(&self) -> f64 {
        (self.high - self.low) / self.low
    }
}

/// Bars in ascending timestamp order with no duplicate timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self { bars: Vec::new() }
    }

    /// Build a series from bars in any order. The first bar seen for a
    /// timestamp wins.
    pub fn from_bars(bars: Vec<Bar>) -> Self {
        let mut series = Self::new();
        for bar in bars {
            series.insert(bar);
        }
        series
    }

    /// Insert-if-absent. Returns `false` when a bar with the same timestamp
    /// is already present.
    pub fn insert(&mut self, bar: Bar) -> bool {
        match self
            .bars
            .binary_search_by(|b| b.timestamp.cmp(&bar.timestamp))
        {
            Ok(_) => false,
            Err(idx) => {
                self.bars.insert(idx, bar);
                true
            }
        }
    }

    /// The most recent `n` bars (or fewer when history is short).
    pub fn recent(&self, n: usize) -> BarSeries {
        let start = self.bars.len().saturating_sub(n);
        BarSeries {
            bars: self.bars[start..].to_vec(),
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}
