//! Capital ledger: the balance available for new entries.
//!
//! Every mutation is a load-modify-store against the injected [`LedgerStore`].
//! One writer per store is assumed.

use crate::domain::error::TraderError;
use crate::domain::trade::TradeRecord;
use crate::ports::ledger_port::LedgerStore;

/// Balances closer than this are treated as equal when reconciling.
const RECONCILE_TOLERANCE: f64 = 1e-6;

pub struct CapitalLedger<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> CapitalLedger<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    pub fn balance(&self) -> Result<f64, TraderError> {
        self.store.load()
    }

    /// Withdraw `amount`. Refuses, leaving the balance untouched, when it
    /// exceeds what is available.
    pub fn debit(&self, amount: f64) -> Result<f64, TraderError> {
        let available = self.store.load()?;
        if amount > available {
            return Err(TraderError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        let balance = available - amount;
        self.store.store(balance)?;
        log::debug!("ledger debit {amount:.2} -> {balance:.2}");
        Ok(balance)
    }

    /// Charge the cost of an order that already filled. The fill cannot be
    /// undone, so instead of refusing an overshoot the debit is capped at the
    /// available balance and the balance floors at zero.
    pub fn settle_fill(&self, cost: f64) -> Result<f64, TraderError> {
        let available = self.store.load()?;
        let charged = cost.min(available);
        if cost - charged > RECONCILE_TOLERANCE {
            log::warn!(
                "fill cost {cost:.2} exceeds balance {available:.2}; ledger floored at zero"
            );
        }
        self.debit(charged)
    }

    pub fn credit(&self, amount: f64) -> Result<f64, TraderError> {
        let balance = self.store.load()? + amount;
        self.store.store(balance)?;
        log::debug!("ledger credit {amount:.2} -> {balance:.2}");
        Ok(balance)
    }

    /// Align the stored balance with the balance recorded by the latest
    /// trade. Trade history wins; returns the balance in effect afterwards.
    pub fn reconcile(&self, latest: Option<&TradeRecord>) -> Result<f64, TraderError> {
        let current = self.store.load()?;
        let Some(record) = latest else {
            return Ok(current);
        };
        if (record.seed_balance_after - current).abs() <= RECONCILE_TOLERANCE {
            return Ok(current);
        }
        log::warn!(
            "ledger balance {current:.2} disagrees with last {} record ({:.2}); restoring from history",
            record.trade_type,
            record.seed_balance_after
        );
        self.store.store(record.seed_balance_after)?;
        Ok(record.seed_balance_after)
    }
}
