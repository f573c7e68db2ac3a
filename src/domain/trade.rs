//! Trade records and replay over the trade history.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            other => Err(format!("unknown trade type '{other}'")),
        }
    }
}

/// One executed order. Written once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub trade_type: TradeType,
    pub price: f64,
    pub amount: f64,
    /// Realized return of the round trip; `None` for buys.
    pub roi: Option<f64>,
    pub executed_at: NaiveDateTime,
    pub is_simulated: bool,
    pub seed_balance_after: f64,
}

/// sum(buy.amount) - sum(sell.amount) over records of the given simulation mode.
pub fn derive_holding(records: &[TradeRecord], is_simulated: bool) -> f64 {
    records
        .iter()
        .filter(|r| r.is_simulated == is_simulated)
        .fold(0.0, |acc, r| match r.trade_type {
            TradeType::Buy => acc + r.amount,
            TradeType::Sell => acc - r.amount,
        })
}

/// Holding after each record (same mode filter as [`derive_holding`]).
pub fn holding_prefixes(records: &[TradeRecord], is_simulated: bool) -> Vec<f64> {
    let mut holding = 0.0;
    records
        .iter()
        .filter(|r| r.is_simulated == is_simulated)
        .map(|r| {
            match r.trade_type {
                TradeType::Buy => holding += r.amount,
                TradeType::Sell => holding -= r.amount,
            }
            holding
        })
        .collect()
}

/// Aggregate statistics over the closed round trips of a history.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSummary {
    pub buys: usize,
    pub sells: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub average_roi: f64,
    /// Product of (1 + roi) over all sells, minus one.
    pub compounded_roi: f64,
    pub last_balance: Option<f64>,
}

impl TradeSummary {
    pub fn from_records(records: &[TradeRecord]) -> Self {
        let buys = records
            .iter()
            .filter(|r| r.trade_type == TradeType::Buy)
            .count();
        let rois: Vec<f64> = records
            .iter()
            .filter(|r| r.trade_type == TradeType::Sell)
            .filter_map(|r| r.roi)
            .collect();
        let sells = records.len() - buys;
        let wins = rois.iter().filter(|r| **r > 0.0).count();
        let losses = rois.iter().filter(|r| **r < 0.0).count();

        let (win_rate, average_roi) = if rois.is_empty() {
            (0.0, 0.0)
        } else {
            (
                wins as f64 / rois.len() as f64,
                rois.iter().sum::<f64>() / rois.len() as f64,
            )
        };
        let compounded_roi = rois.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;

        TradeSummary {
            buys,
            sells,
            wins,
            losses,
            win_rate,
            average_roi,
            compounded_roi,
            last_balance: records.last().map(|r| r.seed_balance_after),
        }
    }
}
