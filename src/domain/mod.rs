//! Core domain types and decision logic.

pub mod bar;
pub mod config_validation;
pub mod error;
pub mod exit;
pub mod indicator;
pub mod ledger;
pub mod position_manager;
pub mod retry;
pub mod scoring;
pub mod session;
pub mod strategy;
pub mod trade;

#[cfg(test)]
pub mod test_util;
