//! Ledger balance kept in a small JSON file: `{"balance": 100000.0}`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::TraderError;
use crate::ports::ledger_port::LedgerStore;

#[derive(Debug, Serialize, Deserialize)]
struct SeedState {
    balance: f64,
}

#[derive(Debug, Clone)]
pub struct JsonLedgerAdapter {
    path: PathBuf,
}

impl JsonLedgerAdapter {
    /// Open the seed file, creating it with `initial_seed` if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P, initial_seed: f64) -> Result<Self, TraderError> {
        let adapter = Self {
            path: path.as_ref().to_path_buf(),
        };
        if !adapter.path.exists() {
            log::info!(
                "creating seed file {} with balance {initial_seed:.2}",
                adapter.path.display()
            );
            adapter.store(initial_seed)?;
        }
        Ok(adapter)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonLedgerAdapter {
    fn load(&self) -> Result<f64, TraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TraderError::Ledger {
            reason: format!("{}: {e}", self.path.display()),
        })?;
        let state: SeedState = serde_json::from_str(&content)?;
        Ok(state.balance)
    }

    fn store(&self, balance: f64) -> Result<(), TraderError> {
        let json = serde_json::to_string_pretty(&SeedState { balance })?;
        // Write-then-rename so a crash never leaves a truncated file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| TraderError::Ledger {
                reason: format!("{}: {e}", self.path.display()),
            })
    }
}
