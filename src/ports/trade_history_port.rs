//! Append-only trade history port.

use crate::domain::error::TraderError;
use crate::domain::trade::{TradeRecord, TradeType};

pub trait TradeHistory {
    fn append_record(&self, record: &TradeRecord) -> Result<(), TraderError>;

    fn latest_record(&self) -> Result<Option<TradeRecord>, TraderError>;

    fn latest_record_of_type(
        &self,
        trade_type: TradeType,
    ) -> Result<Option<TradeRecord>, TraderError>;

    /// Every record, oldest first.
    fn records(&self) -> Result<Vec<TradeRecord>, TraderError>;
}
