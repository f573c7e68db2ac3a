//! Market data feed port.

use crate::domain::bar::BarSeries;
use crate::domain::error::TraderError;

pub trait BarFeed {
    /// The most recent `n` bars, oldest first. May hold fewer than `n` bars
    /// when history is short; never unordered or duplicated.
    fn recent_bars(&self, n: usize) -> Result<BarSeries, TraderError>;
}
