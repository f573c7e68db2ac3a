//! Order execution port.

use crate::domain::error::TraderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyFill {
    pub filled_amount: f64,
    pub filled_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellFill {
    pub filled_price: f64,
}

/// Market orders against the venue. Any error means the order did not fill.
pub trait OrderExecutor {
    /// Buy for `notional` units of quote currency.
    fn submit_market_buy(&self, notional: f64) -> Result<BuyFill, TraderError>;

    /// Sell `amount` units of the asset.
    fn submit_market_sell(&self, amount: f64) -> Result<SellFill, TraderError>;
}
