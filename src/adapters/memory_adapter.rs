//! In-memory port implementations for replay and tests.

use std::cell::{Cell, RefCell};

use crate::domain::bar::{Bar, BarSeries};
use crate::domain::error::TraderError;
use crate::domain::trade::{TradeRecord, TradeType};
use crate::ports::bar_feed_port::BarFeed;
use crate::ports::ledger_port::LedgerStore;
use crate::ports::trade_history_port::TradeHistory;

#[derive(Debug, Default)]
pub struct InMemoryTradeHistory {
    records: RefCell<Vec<TradeRecord>>,
}

impl InMemoryTradeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TradeRecord>) -> Self {
        Self {
            records: RefCell::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl TradeHistory for InMemoryTradeHistory {
    fn append_record(&self, record: &TradeRecord) -> Result<(), TraderError> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }

    fn latest_record(&self) -> Result<Option<TradeRecord>, TraderError> {
        Ok(self.records.borrow().last().cloned())
    }

    fn latest_record_of_type(
        &self,
        trade_type: TradeType,
    ) -> Result<Option<TradeRecord>, TraderError> {
        Ok(self
            .records
            .borrow()
            .iter()
            .rev()
            .find(|r| r.trade_type == trade_type)
            .cloned())
    }

    fn records(&self) -> Result<Vec<TradeRecord>, TraderError> {
        Ok(self.records.borrow().clone())
    }
}

#[derive(Debug)]
pub struct InMemoryLedgerStore {
    balance: Cell<f64>,
}

impl InMemoryLedgerStore {
    pub fn new(balance: f64) -> Self {
        Self {
            balance: Cell::new(balance),
        }
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> Result<f64, TraderError> {
        Ok(self.balance.get())
    }

    fn store(&self, balance: f64) -> Result<(), TraderError> {
        self.balance.set(balance);
        Ok(())
    }
}

/// Feeds a fixed bar history one bar at a time. [`advance`](Self::advance)
/// reveals the next bar; `recent_bars` only sees bars revealed so far.
#[derive(Debug)]
pub struct ReplayFeed {
    bars: Vec<Bar>,
    cursor: Cell<usize>,
}

impl ReplayFeed {
    /// `revealed` bars are visible before the first `advance`.
    pub fn new(series: BarSeries, revealed: usize) -> Self {
        let bars = series.bars().to_vec();
        let cursor = revealed.min(bars.len());
        Self {
            bars,
            cursor: Cell::new(cursor),
        }
    }

    /// Reveal one more bar. Returns `false` once the history is exhausted.
    pub fn advance(&self) -> bool {
        let next = self.cursor.get() + 1;
        if next > self.bars.len() {
            return false;
        }
        self.cursor.set(next);
        true
    }

    pub fn revealed(&self) -> usize {
        self.cursor.get()
    }

    pub fn remaining(&self) -> usize {
        self.bars.len() - self.cursor.get()
    }

    pub fn current(&self) -> Option<&Bar> {
        self.cursor
            .get()
            .checked_sub(1)
            .and_then(|idx| self.bars.get(idx))
    }
}

impl BarFeed for ReplayFeed {
    fn recent_bars(&self, n: usize) -> Result<BarSeries, TraderError> {
        let end = self.cursor.get();
        let start = end.saturating_sub(n);
        Ok(BarSeries::from_bars(self.bars[start..end].to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_util::minute;

    fn bar(i: i64) -> Bar {
        Bar {
            timestamp: minute(i),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0 + i as f64,
            volume: 10.0,
        }
    }

    fn record(trade_type: TradeType, price: f64) -> TradeRecord {
        TradeRecord {
            trade_type,
            price,
            amount: 1.0,
            roi: None,
            executed_at: minute(0),
            is_simulated: true,
            seed_balance_after: 0.0,
        }
    }

    #[test]
    fn history_latest_of_type() {
        let history = InMemoryTradeHistory::new();
        assert!(history.latest_record().unwrap().is_none());
        history.append_record(&record(TradeType::Buy, 1.0)).unwrap();
        history.append_record(&record(TradeType::Sell, 2.0)).unwrap();
        history.append_record(&record(TradeType::Buy, 3.0)).unwrap();

        assert_eq!(history.latest_record().unwrap().unwrap().price, 3.0);
        assert_eq!(
            history
                .latest_record_of_type(TradeType::Sell)
                .unwrap()
                .unwrap()
                .price,
            2.0
        );
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn ledger_store_round_trip() {
        let store = InMemoryLedgerStore::new(10.0);
        store.store(12.5).unwrap();
        assert_eq!(store.load().unwrap(), 12.5);
    }

    #[test]
    fn replay_reveals_one_bar_at_a_time() {
        let feed = ReplayFeed::new(BarSeries::from_bars((0..5).map(bar).collect()), 2);
        assert_eq!(feed.recent_bars(10).unwrap().len(), 2);
        assert!(feed.advance());
        let window = feed.recent_bars(2).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window.latest().unwrap().close, 102.0);
        assert_eq!(feed.current().unwrap().close, 102.0);
        assert!(feed.advance());
        assert!(feed.advance());
        assert!(!feed.advance());
        assert_eq!(feed.remaining(), 0);
    }
}
