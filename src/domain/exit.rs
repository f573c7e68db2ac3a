//! Exit evaluation for an open position.
//!
//! Triggers are checked in a fixed priority order and the first one that
//! holds wins:
//!
//! 1. net ROI at or above take-profit
//! 2. RSI overbought
//! 3. short MA crossing below mid MA
//! 4. net ROI at or below stop-loss

use std::fmt;

use crate::domain::indicator::IndicatorFrame;

pub const DEFAULT_FEE_RATE: f64 = 0.0005;
pub const DEFAULT_TAKE_PROFIT: f64 = 0.015;
pub const DEFAULT_STOP_LOSS: f64 = -0.007;
pub const DEFAULT_OVERBOUGHT_RSI: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    Overbought,
    MaCrossDown,
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::TakeProfit => "take-profit",
            ExitReason::Overbought => "rsi overbought",
            ExitReason::MaCrossDown => "short MA crossed below mid MA",
            ExitReason::StopLoss => "stop-loss",
        };
        f.write_str(s)
    }
}

/// Return of a round trip with the fee charged on both legs.
pub fn net_roi(entry_price: f64, close: f64, fee_rate: f64) -> f64 {
    (close * (1.0 - fee_rate)) / (entry_price * (1.0 + fee_rate)) - 1.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitEvaluator {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub overbought_rsi: f64,
    pub fee_rate: f64,
}

impl Default for ExitEvaluator {
    fn default() -> Self {
        ExitEvaluator {
            take_profit: DEFAULT_TAKE_PROFIT,
            stop_loss: DEFAULT_STOP_LOSS,
            overbought_rsi: DEFAULT_OVERBOUGHT_RSI,
            fee_rate: DEFAULT_FEE_RATE,
        }
    }
}

impl ExitEvaluator {
    pub fn roi(&self, entry_price: f64, close: f64) -> f64 {
        net_roi(entry_price, close, self.fee_rate)
    }

    /// The first exit trigger that holds for the latest bar, if any.
    pub fn evaluate(&self, entry_price: f64, frame: &IndicatorFrame) -> Option<ExitReason> {
        let latest = frame.latest();
        let prev = frame.previous();
        let roi = self.roi(entry_price, latest.close);

        let reason = if roi >= self.take_profit {
            Some(ExitReason::TakeProfit)
        } else if latest.rsi.is_some_and(|rsi| rsi > self.overbought_rsi) {
            Some(ExitReason::Overbought)
        } else if crossed_below(prev.ma_short, prev.ma_mid, latest.ma_short, latest.ma_mid) {
            Some(ExitReason::MaCrossDown)
        } else if roi <= self.stop_loss {
            Some(ExitReason::StopLoss)
        } else {
            None
        };

        match reason {
            Some(r) => log::info!("sell signal: {r} (roi {:.4}%)", roi * 100.0),
            None => log::debug!("holding (roi {:.4}%)", roi * 100.0),
        }
        reason
    }

    pub fn should_exit(&self, entry_price: f64, frame: &IndicatorFrame) -> bool {
        self.evaluate(entry_price, frame).is_some()
    }
}

fn crossed_below(
    prev_short: Option<f64>,
    prev_mid: Option<f64>,
    short: Option<f64>,
    mid: Option<f64>,
) -> bool {
    match (prev_short, prev_mid, short, mid) {
        (Some(ps), Some(pm), Some(s), Some(m)) => ps >= pm && s < m,
        _ => false,
    }
}
