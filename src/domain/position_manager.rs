//! Position state machine and the per-cycle decision.
//!
//! ```text
//! FLAT --(entry signal, funds available)--> OPEN
//! OPEN --(exit trigger, holding > 0)------> FLAT
//! ```
//!
//! The trade history is the source of truth for the state: the latest record
//! decides FLAT (none, or a sell) versus OPEN (a buy). Every transition runs
//! its side effects in the order order -> ledger -> record. A failed order
//! leaves the ledger and the history untouched. Once an order fills, a failed
//! ledger or history write halts the manager: every later cycle returns
//! [`TraderError::Unreconciled`] without placing orders.

use std::cell::RefCell;

use chrono::NaiveDateTime;

use crate::domain::error::TraderError;
use crate::domain::exit::{ExitEvaluator, ExitReason};
use crate::domain::indicator::{IndicatorEngine, IndicatorFrame};
use crate::domain::ledger::CapitalLedger;
use crate::domain::retry::RetryPolicy;
use crate::domain::scoring::EntryScorer;
use crate::domain::strategy::TraderConfig;
use crate::domain::trade::{derive_holding, TradeRecord, TradeType};
use crate::ports::bar_feed_port::BarFeed;
use crate::ports::ledger_port::LedgerStore;
use crate::ports::notifier_port::{notify_quietly, Notifier};
use crate::ports::order_port::OrderExecutor;
use crate::ports::trade_history_port::TradeHistory;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionState {
    Flat,
    Open { entry_price: f64, amount: f64 },
}

impl PositionState {
    pub fn from_latest(latest: Option<&TradeRecord>) -> Self {
        match latest {
            Some(r) if r.trade_type == TradeType::Buy => PositionState::Open {
                entry_price: r.price,
                amount: r.amount,
            },
            _ => PositionState::Flat,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open { .. })
    }
}

/// Position state after replaying `records` (oldest first).
pub fn recover(records: &[TradeRecord]) -> PositionState {
    PositionState::from_latest(records.last())
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Too few bars for the indicator set; treated as no signal.
    InsufficientData { bars: usize, minimum: usize },
    /// Flat and the score was below every entry tier.
    NoSignal { score: i32 },
    /// Flat and a recent loss suppressed entry.
    Vetoed,
    /// Entry signal but the ledger cannot cover the notional.
    Skipped { required: f64, available: f64 },
    Entered {
        record: TradeRecord,
        score: i32,
        ratio: f64,
    },
    /// Open and no exit trigger fired.
    Held { roi: f64 },
    Exited {
        record: TradeRecord,
        reason: ExitReason,
    },
    /// Exit requested with nothing held; no order placed.
    Refused,
}

/// The collaborators one decision cycle talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub feed: &'a dyn BarFeed,
    pub executor: &'a dyn OrderExecutor,
    pub history: &'a dyn TradeHistory,
    pub ledger: &'a dyn LedgerStore,
    pub notifier: &'a dyn Notifier,
}

pub struct PositionManager<'a> {
    feed: &'a dyn BarFeed,
    executor: &'a dyn OrderExecutor,
    history: &'a dyn TradeHistory,
    notifier: &'a dyn Notifier,
    ledger: CapitalLedger<'a>,
    engine: IndicatorEngine,
    scorer: EntryScorer,
    exit: ExitEvaluator,
    retry: RetryPolicy,
    trade_amount: f64,
    window: usize,
    is_simulated: bool,
    halted: RefCell<Option<String>>,
}

impl<'a> PositionManager<'a> {
    pub fn new(config: &TraderConfig, ports: Collaborators<'a>) -> Self {
        Self {
            feed: ports.feed,
            executor: ports.executor,
            history: ports.history,
            notifier: ports.notifier,
            ledger: CapitalLedger::new(ports.ledger),
            engine: IndicatorEngine::new(config.indicators.clone()),
            scorer: config.entry_scorer(),
            exit: config.exit.clone(),
            retry: config.retry,
            trade_amount: config.trade_amount,
            window: config.window,
            is_simulated: config.is_simulated(),
            halted: RefCell::new(None),
        }
    }

    pub fn notifier(&self) -> &'a dyn Notifier {
        self.notifier
    }

    pub fn min_bars(&self) -> usize {
        self.engine.config().min_bars
    }

    /// Why trading is halted, if a filled order could not be persisted.
    pub fn halted(&self) -> Option<String> {
        self.halted.borrow().clone()
    }

    pub fn bars_available(&self) -> Result<usize, TraderError> {
        let series = self
            .retry
            .call("fetch bars", || self.feed.recent_bars(self.window))?;
        Ok(series.len())
    }

    pub fn state(&self) -> Result<PositionState, TraderError> {
        let latest = self
            .retry
            .call("load latest trade", || self.history.latest_record())?;
        Ok(PositionState::from_latest(latest.as_ref()))
    }

    /// Quantity held in this manager's simulation mode.
    pub fn holding(&self) -> Result<f64, TraderError> {
        let records = self.retry.call("load trades", || self.history.records())?;
        Ok(derive_holding(&records, self.is_simulated))
    }

    /// Restore the ledger balance from the latest trade record if they
    /// disagree. Returns the balance in effect.
    pub fn reconcile(&self) -> Result<f64, TraderError> {
        let latest = self
            .retry
            .call("load latest trade", || self.history.latest_record())?;
        self.retry
            .call("reconcile ledger", || self.ledger.reconcile(latest.as_ref()))
    }

    /// One decision cycle at wall-clock time `now`.
    pub fn run_cycle(&self, now: NaiveDateTime) -> Result<CycleOutcome, TraderError> {
        if let Some(reason) = self.halted() {
            log::error!("trading halted: {reason}");
            return Err(TraderError::Unreconciled { reason });
        }
        let bars = self
            .retry
            .call("fetch bars", || self.feed.recent_bars(self.window))?;
        let state = self.state()?;
        let minimum = match state {
            PositionState::Flat => self.engine.config().min_bars,
            PositionState::Open { .. } => self.engine.config().exit_min_bars,
        };
        let frame = match self.engine.compute_with_minimum(&bars, minimum) {
            Ok(frame) => frame,
            Err(TraderError::InsufficientData { bars, minimum }) => {
                log::info!("insufficient data ({bars}/{minimum} bars), no signal");
                return Ok(CycleOutcome::InsufficientData { bars, minimum });
            }
            Err(e) => return Err(e),
        };
        log_snapshot(&frame);

        match state {
            PositionState::Flat => self.try_enter(now, &frame),
            PositionState::Open {
                entry_price,
                amount,
            } => self.try_exit(now, entry_price, amount, &frame),
        }
    }

    fn try_enter(
        &self,
        now: NaiveDateTime,
        frame: &IndicatorFrame,
    ) -> Result<CycleOutcome, TraderError> {
        let record_type = self.scorer.cooldown.record_type;
        let veto_record = self.retry.call("load latest trade", || {
            self.history.latest_record_of_type(record_type)
        })?;

        let signal = self
            .scorer
            .check_entry_signal(veto_record.as_ref(), now, frame);
        let Some(score) = signal.score else {
            return Ok(CycleOutcome::Vetoed);
        };
        if !signal.enter {
            return Ok(CycleOutcome::NoSignal { score });
        }

        let notional = self.trade_amount * signal.ratio;
        let available = self.retry.call("load balance", || self.ledger.balance())?;
        if available < notional {
            log::warn!("entry skipped: balance {available:.2} below notional {notional:.2}");
            notify_quietly(
                self.notifier,
                &format!("Entry skipped: balance {available:.2} < required {notional:.2}"),
            );
            return Ok(CycleOutcome::Skipped {
                required: notional,
                available,
            });
        }

        let fill = self.executor.submit_market_buy(notional)?;
        let spent = fill.filled_amount * fill.filled_price;
        let balance_after = self
            .retry
            .call("debit ledger", || self.ledger.settle_fill(spent))
            .map_err(|e| {
                self.halt(format!(
                    "buy {:.8} @ {:.2} filled, ledger debit failed: {e}",
                    fill.filled_amount, fill.filled_price
                ))
            })?;

        let record = TradeRecord {
            trade_type: TradeType::Buy,
            price: fill.filled_price,
            amount: fill.filled_amount,
            roi: None,
            executed_at: now,
            is_simulated: self.is_simulated,
            seed_balance_after: balance_after,
        };
        self.retry
            .call("append trade", || self.history.append_record(&record))
            .map_err(|e| {
                self.halt(format!(
                    "{} {:.8} @ {:.2} filled, history append failed: {e}",
                    record.trade_type, record.amount, record.price
                ))
            })?;

        log::info!(
            "bought {:.8} @ {:.2} (score {score}, ratio {:.1}), balance {balance_after:.2}",
            record.amount,
            record.price,
            signal.ratio
        );
        notify_quietly(
            self.notifier,
            &format!(
                "BUY {:.8} @ {:.2} | score {score} | entry {:.0}% | balance {balance_after:.2}",
                record.amount,
                record.price,
                signal.ratio * 100.0
            ),
        );

        Ok(CycleOutcome::Entered {
            record,
            score,
            ratio: signal.ratio,
        })
    }

    fn try_exit(
        &self,
        now: NaiveDateTime,
        entry_price: f64,
        amount: f64,
        frame: &IndicatorFrame,
    ) -> Result<CycleOutcome, TraderError> {
        match self.exit.evaluate(entry_price, frame) {
            Some(reason) => self.close_position(now, entry_price, amount, reason),
            None => Ok(CycleOutcome::Held {
                roi: self.exit.roi(entry_price, frame.latest().close),
            }),
        }
    }

    /// Sell up to `requested` units. The quantity is clamped to the current
    /// holding; with nothing held the sell is refused outright.
    pub fn close_position(
        &self,
        now: NaiveDateTime,
        entry_price: f64,
        requested: f64,
        reason: ExitReason,
    ) -> Result<CycleOutcome, TraderError> {
        let holding = self.holding()?;
        if holding <= 0.0 {
            log::warn!("sell refused: no holding (requested {requested:.8})");
            notify_quietly(self.notifier, "Sell refused: no holding");
            return Ok(CycleOutcome::Refused);
        }
        let amount = requested.min(holding);
        if amount < requested {
            log::warn!("sell clamped from {requested:.8} to holding {amount:.8}");
        }

        let fill = self.executor.submit_market_sell(amount)?;
        let roi = self.exit.roi(entry_price, fill.filled_price);
        let proceeds = fill.filled_price * amount;
        let balance_after = self
            .retry
            .call("credit ledger", || self.ledger.credit(proceeds))
            .map_err(|e| {
                self.halt(format!(
                    "sell {amount:.8} @ {:.2} filled, ledger credit failed: {e}",
                    fill.filled_price
                ))
            })?;

        let record = TradeRecord {
            trade_type: TradeType::Sell,
            price: fill.filled_price,
            amount,
            roi: Some(roi),
            executed_at: now,
            is_simulated: self.is_simulated,
            seed_balance_after: balance_after,
        };
        self.retry
            .call("append trade", || self.history.append_record(&record))
            .map_err(|e| {
                self.halt(format!(
                    "{} {:.8} @ {:.2} filled, history append failed: {e}",
                    record.trade_type, record.amount, record.price
                ))
            })?;

        log::info!(
            "sold {amount:.8} @ {:.2} ({reason}), roi {:.4}%, balance {balance_after:.2}",
            record.price,
            roi * 100.0
        );
        notify_quietly(
            self.notifier,
            &format!(
                "SELL {amount:.8} @ {:.2} | {reason} | roi {:.2}% | balance {balance_after:.2}",
                record.price,
                roi * 100.0
            ),
        );

        Ok(CycleOutcome::Exited { record, reason })
    }

    fn halt(&self, reason: String) -> TraderError {
        log::error!("trading halted: {reason}");
        notify_quietly(
            self.notifier,
            &format!("Trading halted, manual reconciliation required: {reason}"),
        );
        *self.halted.borrow_mut() = Some(reason.clone());
        TraderError::Unreconciled { reason }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn log_snapshot(frame: &IndicatorFrame) {
    let s = frame.latest();
    log::info!(
        "{} close {:.2} rsi {} ma {}/{}/{} macd hist {:.4} vol {:.4} volume x{} trend {}",
        s.timestamp,
        s.close,
        fmt_opt(s.rsi),
        fmt_opt(s.ma_short),
        fmt_opt(s.ma_mid),
        fmt_opt(s.ma_long),
        s.macd.histogram,
        s.volatility,
        fmt_opt(s.volume_ratio),
        s.trend.map_or_else(|| "n/a".to_string(), |t| format!("{t:.4}")),
    );
}
