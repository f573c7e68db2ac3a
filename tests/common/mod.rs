#![allow(dead_code)]

use autotrader::adapters::memory_adapter::InMemoryTradeHistory;
use autotrader::domain::bar::{Bar, BarSeries};
use autotrader::domain::error::TraderError;
use autotrader::domain::retry::RetryPolicy;
use autotrader::domain::strategy::TraderConfig;
use autotrader::domain::trade::{TradeRecord, TradeType};
use autotrader::ports::bar_feed_port::BarFeed;
use autotrader::ports::notifier_port::Notifier;
use autotrader::ports::order_port::{BuyFill, OrderExecutor, SellFill};
use autotrader::ports::trade_history_port::TradeHistory;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::{Cell, RefCell};

pub fn minute(n: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 30)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        + Duration::minutes(n)
}

/// Simulated-mode config with a retry policy that never sleeps.
pub fn test_config() -> TraderConfig {
    TraderConfig {
        retry: RetryPolicy::immediate(2),
        interval: std::time::Duration::ZERO,
        ..TraderConfig::default()
    }
}

pub fn make_bar(n: i64, open: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: minute(n),
        open,
        high: open.max(close) * 1.001,
        low: open.min(close) * 0.999,
        close,
        volume,
    }
}

/// Bars whose opens follow the previous close.
pub fn chained_bars(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    let mut prev = closes.first().copied().unwrap_or(100.0);
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            let bar = make_bar(i as i64, prev, close, volume);
            prev = close;
            bar
        })
        .collect()
}

pub const DIP_DROP: f64 = 4.5;

/// 59 minutes of a slow climb (+0.1 per bar) followed by a gap down on heavy
/// volume. The final bar scores 70: RSI under 30, close under the lower
/// band, short MA still above long MA and a volume spike.
pub fn dip_bars() -> Vec<Bar> {
    let mut closes: Vec<f64> = (0..59).map(|i| 100.0 + 0.1 * i as f64).collect();
    closes.push(closes[58] - DIP_DROP);
    let mut volumes = vec![100.0; 59];
    volumes.push(170.0);

    let mut bars = chained_bars(&closes[..59], &volumes[..59]);
    let close = closes[59];
    bars.push(make_bar(59, close * 1.002, close, volumes[59]));
    bars
}

pub fn dip_series() -> BarSeries {
    BarSeries::from_bars(dip_bars())
}

/// A quiet bar closing at `close`, one minute after the latest bar.
pub fn next_bar(series: &BarSeries, close: f64) -> Bar {
    let latest = series.latest().unwrap();
    Bar {
        timestamp: latest.timestamp + Duration::minutes(1),
        open: close,
        high: close * 1.001,
        low: close * 0.999,
        close,
        volume: 100.0,
    }
}

pub fn record(
    trade_type: TradeType,
    price: f64,
    amount: f64,
    is_simulated: bool,
    executed_at: NaiveDateTime,
) -> TradeRecord {
    TradeRecord {
        trade_type,
        price,
        amount,
        roi: None,
        executed_at,
        is_simulated,
        seed_balance_after: 100_000.0,
    }
}

/// Bar feed backed by a mutable series; `fail_next` makes the next calls
/// return a feed error.
pub struct MockFeed {
    pub series: RefCell<BarSeries>,
    pub failures: Cell<u32>,
    pub calls: Cell<u32>,
}

impl MockFeed {
    pub fn new(series: BarSeries) -> Self {
        Self {
            series: RefCell::new(series),
            failures: Cell::new(0),
            calls: Cell::new(0),
        }
    }

    pub fn push(&self, bar: Bar) {
        self.series.borrow_mut().insert(bar);
    }

    pub fn fail_next(&self, n: u32) {
        self.failures.set(n);
    }

    pub fn latest_close(&self) -> f64 {
        self.series.borrow().latest().unwrap().close
    }
}

impl BarFeed for MockFeed {
    fn recent_bars(&self, n: usize) -> Result<BarSeries, TraderError> {
        self.calls.set(self.calls.get() + 1);
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Err(TraderError::Feed {
                reason: "exchange unreachable".into(),
            });
        }
        Ok(self.series.borrow().recent(n))
    }
}

/// Order executor that fills at a fixed price and records every call.
pub struct MockExecutor {
    pub price: Cell<f64>,
    pub reject: Cell<bool>,
    pub buys: RefCell<Vec<f64>>,
    pub sells: RefCell<Vec<f64>>,
}

impl MockExecutor {
    pub fn new(price: f64) -> Self {
        Self {
            price: Cell::new(price),
            reject: Cell::new(false),
            buys: RefCell::new(Vec::new()),
            sells: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(price: f64) -> Self {
        let executor = Self::new(price);
        executor.reject.set(true);
        executor
    }
}

impl OrderExecutor for MockExecutor {
    fn submit_market_buy(&self, notional: f64) -> Result<BuyFill, TraderError> {
        self.buys.borrow_mut().push(notional);
        if self.reject.get() {
            return Err(TraderError::OrderTransport {
                reason: "connection reset".into(),
            });
        }
        let price = self.price.get();
        Ok(BuyFill {
            filled_amount: notional / price,
            filled_price: price,
        })
    }

    fn submit_market_sell(&self, amount: f64) -> Result<SellFill, TraderError> {
        self.sells.borrow_mut().push(amount);
        if self.reject.get() {
            return Err(TraderError::OrderTransport {
                reason: "connection reset".into(),
            });
        }
        Ok(SellFill {
            filled_price: self.price.get(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
    pub fail: Cell<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.borrow().iter().any(|m| m.contains(needle))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) -> Result<(), TraderError> {
        if self.fail.get() {
            return Err(TraderError::Io(std::io::Error::other("webhook down")));
        }
        self.messages.borrow_mut().push(message.to_string());
        Ok(())
    }
}

/// Trade history whose appends fail with a store error while `fail_appends`
/// is set. Reads always succeed.
pub struct FlakyHistory {
    pub inner: InMemoryTradeHistory,
    pub fail_appends: Cell<bool>,
    pub append_calls: Cell<u32>,
}

impl FlakyHistory {
    pub fn new(inner: InMemoryTradeHistory) -> Self {
        Self {
            inner,
            fail_appends: Cell::new(true),
            append_calls: Cell::new(0),
        }
    }
}

impl TradeHistory for FlakyHistory {
    fn append_record(&self, record: &TradeRecord) -> Result<(), TraderError> {
        self.append_calls.set(self.append_calls.get() + 1);
        if self.fail_appends.get() {
            return Err(TraderError::Database {
                reason: "disk I/O error".into(),
            });
        }
        self.inner.append_record(record)
    }

    fn latest_record(&self) -> Result<Option<TradeRecord>, TraderError> {
        self.inner.latest_record()
    }

    fn latest_record_of_type(
        &self,
        trade_type: TradeType,
    ) -> Result<Option<TradeRecord>, TraderError> {
        self.inner.latest_record_of_type(trade_type)
    }

    fn records(&self) -> Result<Vec<TradeRecord>, TraderError> {
        self.inner.records()
    }
}
