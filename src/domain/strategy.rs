//! Trader configuration aggregate built from a [`ConfigPort`].

use std::time::Duration;

use crate::domain::config_validation::validate_trader_config;
use crate::domain::error::TraderError;
use crate::domain::exit::ExitEvaluator;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::retry::RetryPolicy;
use crate::domain::scoring::{CooldownRule, EntryScorer};
use crate::domain::trade::TradeType;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TRADE_AMOUNT: f64 = 10_000.0;
pub const DEFAULT_INITIAL_SEED: f64 = 100_000.0;
pub const DEFAULT_INTERVAL_SECS: i64 = 60;
pub const DEFAULT_WINDOW: i64 = 60;
pub const DEFAULT_LEDGER_PATH: &str = "seed_state.json";

#[derive(Debug, Clone, PartialEq)]
pub struct TraderConfig {
    /// Quote-currency notional of a full-size entry.
    pub trade_amount: f64,
    pub initial_seed: f64,
    pub live_mode: bool,
    pub interval: Duration,
    /// Bars requested from the feed each cycle.
    pub window: usize,
    pub indicators: IndicatorConfig,
    pub exit: ExitEvaluator,
    pub cooldown: CooldownRule,
    pub retry: RetryPolicy,
    pub sqlite_path: Option<String>,
    pub sqlite_pool_size: u32,
    pub ledger_path: String,
}

impl Default for TraderConfig {
    fn default() -> Self {
        TraderConfig {
            trade_amount: DEFAULT_TRADE_AMOUNT,
            initial_seed: DEFAULT_INITIAL_SEED,
            live_mode: false,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS as u64),
            window: DEFAULT_WINDOW as usize,
            indicators: IndicatorConfig::default(),
            exit: ExitEvaluator::default(),
            cooldown: CooldownRule::default(),
            retry: RetryPolicy::default(),
            sqlite_path: None,
            sqlite_pool_size: 4,
            ledger_path: DEFAULT_LEDGER_PATH.to_string(),
        }
    }
}

fn usize_of(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    config.get_int(section, key, default as i64).max(0) as usize
}

impl TraderConfig {
    /// Validate and load. Keys that are absent take their defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        validate_trader_config(config)?;
        let d = TraderConfig::default();
        let ind = &d.indicators;

        let record_type = match config.get_string("cooldown", "record_type") {
            Some(s) => s.parse::<TradeType>().map_err(|reason| TraderError::ConfigInvalid {
                section: "cooldown".to_string(),
                key: "record_type".to_string(),
                reason,
            })?,
            None => d.cooldown.record_type,
        };

        Ok(TraderConfig {
            trade_amount: config.get_double("trader", "trade_amount", d.trade_amount),
            initial_seed: config.get_double("trader", "initial_seed", d.initial_seed),
            live_mode: config.get_bool("trader", "live_mode", d.live_mode),
            interval: Duration::from_secs(
                config
                    .get_int("trader", "interval_secs", DEFAULT_INTERVAL_SECS)
                    .max(0) as u64,
            ),
            window: usize_of(config, "trader", "window", d.window),
            indicators: IndicatorConfig {
                rsi_period: usize_of(config, "indicators", "rsi_period", ind.rsi_period),
                ma_short: usize_of(config, "indicators", "ma_short", ind.ma_short),
                ma_mid: usize_of(config, "indicators", "ma_mid", ind.ma_mid),
                ma_long: usize_of(config, "indicators", "ma_long", ind.ma_long),
                bollinger_window: usize_of(
                    config,
                    "indicators",
                    "bollinger_window",
                    ind.bollinger_window,
                ),
                bollinger_k: config.get_double("indicators", "bollinger_k", ind.bollinger_k),
                macd_fast: usize_of(config, "indicators", "macd_fast", ind.macd_fast),
                macd_slow: usize_of(config, "indicators", "macd_slow", ind.macd_slow),
                macd_signal: usize_of(config, "indicators", "macd_signal", ind.macd_signal),
                volume_window: usize_of(config, "indicators", "volume_window", ind.volume_window),
                trend_window: usize_of(config, "indicators", "trend_window", ind.trend_window),
                min_bars: usize_of(config, "indicators", "min_bars", ind.min_bars),
                exit_min_bars: usize_of(
                    config,
                    "indicators",
                    "exit_min_bars",
                    ind.exit_min_bars
                        .min(usize_of(config, "indicators", "min_bars", ind.min_bars)),
                ),
            },
            exit: ExitEvaluator {
                take_profit: config.get_double("exit", "take_profit", d.exit.take_profit),
                stop_loss: config.get_double("exit", "stop_loss", d.exit.stop_loss),
                overbought_rsi: config.get_double("exit", "overbought_rsi", d.exit.overbought_rsi),
                fee_rate: config.get_double("trader", "fee_rate", d.exit.fee_rate),
            },
            cooldown: CooldownRule {
                record_type,
                loss_threshold: config.get_double(
                    "cooldown",
                    "loss_threshold",
                    d.cooldown.loss_threshold,
                ),
                window: chrono::Duration::minutes(config.get_int(
                    "cooldown",
                    "minutes",
                    d.cooldown.window.num_minutes(),
                )),
            },
            retry: RetryPolicy {
                max_attempts: config
                    .get_int("retry", "max_attempts", d.retry.max_attempts as i64)
                    .max(1) as u32,
                delay: Duration::from_millis(
                    config
                        .get_int("retry", "delay_ms", d.retry.delay.as_millis() as i64)
                        .max(0) as u64,
                ),
            },
            sqlite_path: config.get_string("sqlite", "path"),
            sqlite_pool_size: config
                .get_int("sqlite", "pool_size", d.sqlite_pool_size as i64)
                .max(1) as u32,
            ledger_path: config
                .get_string("ledger", "path")
                .unwrap_or(d.ledger_path),
        })
    }

    pub fn entry_scorer(&self) -> EntryScorer {
        EntryScorer {
            cooldown: self.cooldown.clone(),
            ..EntryScorer::default()
        }
    }

    pub fn fee_rate(&self) -> f64 {
        self.exit.fee_rate
    }

    /// Records produced under this configuration are simulated unless live.
    pub fn is_simulated(&self) -> bool {
        !self.live_mode
    }
}
