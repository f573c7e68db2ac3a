//! Port traits for the collaborators the decision engine talks to.

pub mod bar_feed_port;
pub mod config_port;
pub mod ledger_port;
pub mod notifier_port;
pub mod order_port;
pub mod trade_history_port;
