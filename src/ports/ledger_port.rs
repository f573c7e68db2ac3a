//! Durable storage for the capital ledger balance.

use crate::domain::error::TraderError;

/// A single persisted scalar. Implementations assume one writer; concurrent
/// writers need compare-and-swap or row locking in the store itself.
pub trait LedgerStore {
    fn load(&self) -> Result<f64, TraderError>;

    fn store(&self, balance: f64) -> Result<(), TraderError>;
}
