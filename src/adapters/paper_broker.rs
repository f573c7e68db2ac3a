//! Simulated order execution that fills at the latest bar close.

use crate::domain::error::TraderError;
use crate::ports::bar_feed_port::BarFeed;
use crate::ports::order_port::{BuyFill, OrderExecutor, SellFill};

pub struct PaperBroker<'a> {
    feed: &'a dyn BarFeed,
}

impl<'a> PaperBroker<'a> {
    pub fn new(feed: &'a dyn BarFeed) -> Self {
        Self { feed }
    }

    fn last_price(&self) -> Result<f64, TraderError> {
        let series = self.feed.recent_bars(1)?;
        match series.latest() {
            Some(bar) if bar.close > 0.0 => Ok(bar.close),
            Some(bar) => Err(TraderError::OrderRejected {
                reason: format!("no valid price (close {})", bar.close),
            }),
            None => Err(TraderError::OrderRejected {
                reason: "no market price available".to_string(),
            }),
        }
    }
}

impl OrderExecutor for PaperBroker<'_> {
    fn submit_market_buy(&self, notional: f64) -> Result<BuyFill, TraderError> {
        if notional.is_nan() || notional <= 0.0 {
            return Err(TraderError::OrderRejected {
                reason: format!("invalid buy notional {notional}"),
            });
        }
        let price = self.last_price()?;
        let fill = BuyFill {
            filled_amount: notional / price,
            filled_price: price,
        };
        log::info!(
            "paper buy: {:.8} @ {:.2}",
            fill.filled_amount,
            fill.filled_price
        );
        Ok(fill)
    }

    fn submit_market_sell(&self, amount: f64) -> Result<SellFill, TraderError> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(TraderError::OrderRejected {
                reason: format!("invalid sell amount {amount}"),
            });
        }
        let price = self.last_price()?;
        log::info!("paper sell: {amount:.8} @ {price:.2}");
        Ok(SellFill {
            filled_price: price,
        })
    }
}
