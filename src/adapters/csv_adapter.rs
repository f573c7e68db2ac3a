//! Minute bars from a CSV file: `timestamp,open,high,low,close,volume`.

use crate::domain::bar::{Bar, BarSeries, TIMESTAMP_FORMAT};
use crate::domain::error::TraderError;
use crate::ports::bar_feed_port::BarFeed;
use chrono::NaiveDateTime;
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    path: PathBuf,
}

fn column<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, TraderError> {
    record.get(idx).map(str::trim).ok_or_else(|| TraderError::Feed {
        reason: format!("missing {name} column"),
    })
}

fn number(record: &StringRecord, idx: usize, name: &str) -> Result<f64, TraderError> {
    column(record, idx, name)?
        .parse()
        .map_err(|e| TraderError::Feed {
            reason: format!("invalid {name} value: {e}"),
        })
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Every bar in the file. Duplicate timestamps keep the first row.
    pub fn read_bars(&self) -> Result<BarSeries, TraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TraderError::Feed {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result?;
            let ts = column(&record, 0, "timestamp")?;
            let timestamp = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).map_err(|e| {
                TraderError::Feed {
                    reason: format!("invalid timestamp '{ts}': {e}"),
                }
            })?;

            bars.push(Bar {
                timestamp,
                open: number(&record, 1, "open")?,
                high: number(&record, 2, "high")?,
                low: number(&record, 3, "low")?,
                close: number(&record, 4, "close")?,
                volume: number(&record, 5, "volume")?,
            });
        }

        let read = bars.len();
        let series = BarSeries::from_bars(bars);
        if series.len() < read {
            log::warn!(
                "{}: dropped {} rows with duplicate timestamps",
                self.path.display(),
                read - series.len()
            );
        }
        Ok(series)
    }
}

impl BarFeed for CsvAdapter {
    fn recent_bars(&self, n: usize) -> Result<BarSeries, TraderError> {
        Ok(self.read_bars()?.recent(n))
    }
}
