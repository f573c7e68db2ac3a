//! The polling loop around [`PositionManager::run_cycle`].
//!
//! A failed cycle is logged and notified, and the loop carries on unless the
//! manager has halted on an unpersisted fill. Shutdown is honored only
//! between cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::domain::error::TraderError;
use crate::domain::position_manager::{CycleOutcome, PositionManager};
use crate::ports::notifier_port::notify_quietly;

/// Longest single sleep while waiting for the next cycle.
const WAIT_SLICE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub cycles: usize,
    pub failures: usize,
    pub entries: usize,
    pub exits: usize,
}

impl SessionReport {
    fn record(&mut self, result: &Result<CycleOutcome, TraderError>) {
        self.cycles += 1;
        match result {
            Ok(CycleOutcome::Entered { .. }) => self.entries += 1,
            Ok(CycleOutcome::Exited { .. }) => self.exits += 1,
            Ok(_) => {}
            Err(_) => self.failures += 1,
        }
    }
}

pub struct Session<'a> {
    manager: PositionManager<'a>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl<'a> Session<'a> {
    pub fn new(manager: PositionManager<'a>, interval: Duration, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    pub fn manager(&self) -> &PositionManager<'a> {
        &self.manager
    }

    /// Warn when the feed cannot yet cover the indicator set.
    pub fn warm_up(&self) -> Result<usize, TraderError> {
        let available = self.manager.bars_available()?;
        let min_bars = self.manager.min_bars();
        if available < min_bars {
            log::warn!(
                "feed holds {available} bars, indicators need {min_bars}; entries stay off until it catches up"
            );
        }
        Ok(available)
    }

    /// Run one cycle, absorbing any failure into the log and the notifier.
    pub fn step(&self, now: NaiveDateTime) -> Result<CycleOutcome, TraderError> {
        let result = self.manager.run_cycle(now);
        match &result {
            Ok(outcome) => log::debug!("cycle outcome: {outcome:?}"),
            Err(e) => {
                log::error!("cycle failed: {e}");
                notify_quietly(self.manager.notifier(), &format!("Cycle failed: {e}"));
            }
        }
        result
    }

    /// Cycle until shutdown is requested or `max_cycles` cycles have run.
    pub fn run<C>(&self, max_cycles: Option<usize>, clock: C) -> SessionReport
    where
        C: Fn() -> NaiveDateTime,
    {
        let mut report = SessionReport::default();

        if let Err(e) = self.manager.reconcile() {
            log::error!("ledger reconciliation failed: {e}");
        }
        if let Err(e) = self.warm_up() {
            log::error!("warm-up check failed: {e}");
        }
        notify_quietly(self.manager.notifier(), "Trading session started");

        while !self.stop_requested() {
            if max_cycles.is_some_and(|max| report.cycles >= max) {
                break;
            }
            let started = Instant::now();
            let result = self.step(clock());
            report.record(&result);

            if self.manager.halted().is_some() {
                log::error!("stopping session: manual reconciliation required");
                break;
            }
            if max_cycles.is_some_and(|max| report.cycles >= max) {
                break;
            }
            self.wait(self.interval.saturating_sub(started.elapsed()));
        }

        log::info!(
            "session stopped after {} cycles ({} failed, {} entries, {} exits)",
            report.cycles,
            report.failures,
            report.entries,
            report.exits
        );
        notify_quietly(self.manager.notifier(), "Trading session stopped");
        report
    }

    fn stop_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn wait(&self, total: Duration) {
        let deadline = Instant::now() + total;
        loop {
            if self.stop_requested() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep((deadline - now).min(WAIT_SLICE));
        }
    }
}
