//! Configuration validation.
//!
//! Checks every configured value before a session starts. Absent keys take
//! their defaults and are validated as such.

use crate::domain::error::TraderError;
use crate::domain::trade::TradeType;
use crate::ports::config_port::ConfigPort;

fn invalid(section: &str, key: &str, reason: &str) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_trader_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_amounts(config)?;
    validate_fee_rate(config)?;
    validate_schedule(config)?;
    validate_exit(config)?;
    validate_cooldown(config)?;
    validate_indicators(config)?;
    validate_retry(config)?;
    Ok(())
}

fn validate_amounts(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_double("trader", "trade_amount", 10_000.0) <= 0.0 {
        return Err(invalid(
            "trader",
            "trade_amount",
            "trade_amount must be positive",
        ));
    }
    if config.get_double("trader", "initial_seed", 100_000.0) <= 0.0 {
        return Err(invalid(
            "trader",
            "initial_seed",
            "initial_seed must be positive",
        ));
    }
    Ok(())
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_double("trader", "fee_rate", 0.0005);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "trader",
            "fee_rate",
            "fee_rate must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_schedule(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_int("trader", "interval_secs", 60) < 0 {
        return Err(invalid(
            "trader",
            "interval_secs",
            "interval_secs must be non-negative",
        ));
    }
    let window = config.get_int("trader", "window", 60);
    let min_bars = config.get_int("indicators", "min_bars", 30);
    if min_bars < 2 {
        return Err(invalid(
            "indicators",
            "min_bars",
            "min_bars must be at least 2",
        ));
    }
    if window < min_bars {
        return Err(invalid(
            "trader",
            "window",
            "window must be at least min_bars",
        ));
    }
    let exit_min_bars = config.get_int("indicators", "exit_min_bars", 20_i64.min(min_bars));
    if exit_min_bars < 2 || exit_min_bars > min_bars {
        return Err(invalid(
            "indicators",
            "exit_min_bars",
            "exit_min_bars must lie between 2 and min_bars",
        ));
    }
    Ok(())
}

fn validate_exit(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_double("exit", "take_profit", 0.015) <= 0.0 {
        return Err(invalid(
            "exit",
            "take_profit",
            "take_profit must be positive",
        ));
    }
    if config.get_double("exit", "stop_loss", -0.007) >= 0.0 {
        return Err(invalid("exit", "stop_loss", "stop_loss must be negative"));
    }
    let rsi = config.get_double("exit", "overbought_rsi", 70.0);
    if !(0.0..=100.0).contains(&rsi) {
        return Err(invalid(
            "exit",
            "overbought_rsi",
            "overbought_rsi must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_cooldown(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_int("cooldown", "minutes", 5) < 0 {
        return Err(invalid(
            "cooldown",
            "minutes",
            "minutes must be non-negative",
        ));
    }
    if let Some(s) = config.get_string("cooldown", "record_type") {
        s.parse::<TradeType>()
            .map_err(|reason| invalid("cooldown", "record_type", &reason))?;
    }
    Ok(())
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let period = |key: &str, default: i64| config.get_int("indicators", key, default);

    for (key, default) in [
        ("rsi_period", 14),
        ("bollinger_window", 20),
        ("macd_signal", 9),
        ("volume_window", 10),
        ("trend_window", 5),
    ] {
        if period(key, default) < 1 {
            return Err(invalid("indicators", key, "period must be at least 1"));
        }
    }

    let short = period("ma_short", 5);
    let mid = period("ma_mid", 10);
    let long = period("ma_long", 20);
    if short < 1 || short >= mid || mid > long {
        return Err(invalid(
            "indicators",
            "ma_short",
            "moving average windows must satisfy 1 <= short < mid <= long",
        ));
    }

    let fast = period("macd_fast", 12);
    let slow = period("macd_slow", 26);
    if fast < 1 || fast >= slow {
        return Err(invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be at least 1 and below macd_slow",
        ));
    }

    if config.get_double("indicators", "bollinger_k", 2.0) <= 0.0 {
        return Err(invalid(
            "indicators",
            "bollinger_k",
            "bollinger_k must be positive",
        ));
    }
    Ok(())
}

fn validate_retry(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_int("retry", "max_attempts", 3) < 1 {
        return Err(invalid(
            "retry",
            "max_attempts",
            "max_attempts must be at least 1",
        ));
    }
    if config.get_int("retry", "delay_ms", 1000) < 0 {
        return Err(invalid(
            "retry",
            "delay_ms",
            "delay_ms must be non-negative",
        ));
    }
    Ok(())
}
