//! Configuration validation.
//!
//! Validates every config field before any price data is read.

use crate::domain::comparison::RankingMetric;
use crate::domain::error::EngineError;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_data_config(config)?;
    validate_engine_config(config)?;
    validate_goal_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_price_dir(config)?;
    validate_codes(config)?;
    validate_dates(config)?;
    validate_min_history(config)?;
    Ok(())
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_risk_free_rate(config)?;
    validate_max_weight(config)?;
    validate_positive_int(config, "engine", "sharpe_iterations")?;
    validate_positive_int(config, "engine", "momentum_lookback")?;
    validate_positive_int(config, "engine", "min_variance_max_iterations")?;
    validate_seed(config)?;
    validate_volatility_floor(config)?;
    validate_kelly_max_fraction(config)?;
    validate_ranking(config)?;
    Ok(())
}

pub fn validate_goal_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let initial = config.get_double("goal", "initial_capital", 2_000_000.0);
    if initial <= 0.0 {
        return Err(invalid("goal", "initial_capital", "initial_capital must be positive"));
    }
    let target = config.get_double("goal", "target_capital", 10_000_000.0);
    if target <= initial {
        return Err(invalid(
            "goal",
            "target_capital",
            "target_capital must exceed initial_capital",
        ));
    }
    validate_positive_int(config, "goal", "horizon_years")?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Reads an optional `YYYY-MM-DD` value.
pub fn optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, EngineError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    section,
                    key,
                    &format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
        _ => Ok(None),
    }
}

/// Reads an optional floating-point value; absent or blank is `None`.
pub fn optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, EngineError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => {
            let value = config.get_double(section, key, f64::NAN);
            if value.is_nan() {
                Err(invalid(section, key, &format!("{} must be a number", key)))
            } else {
                Ok(Some(value))
            }
        }
        _ => Ok(None),
    }
}

fn validate_price_dir(config: &dyn ConfigPort) -> Result<(), EngineError> {
    match config.get_string("data", "price_dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(EngineError::ConfigMissing {
            section: "data".to_string(),
            key: "price_dir".to_string(),
        }),
    }
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), EngineError> {
    match config.get_string("data", "codes") {
        Some(s) if !s.trim().is_empty() => parse_codes(&s)
            .map(|_| ())
            .map_err(|e| invalid("data", "codes", &e.to_string())),
        _ => Err(EngineError::ConfigMissing {
            section: "data".to_string(),
            key: "codes".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let start = optional_date(config, "data", "start_date")?;
    let end = optional_date(config, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

fn validate_min_history(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_positive_int(config, "data", "min_history")
}

fn validate_positive_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), EngineError> {
    // Absent keys take their (positive) defaults.
    let value = config.get_int(section, key, 1);
    if value < 1 {
        return Err(invalid(section, key, &format!("{} must be at least 1", key)));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let value = config.get_double("engine", "risk_free_rate", 0.06);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "engine",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_max_weight(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if let Some(cap) = optional_double(config, "engine", "max_weight")? {
        if !(cap > 0.0 && cap <= 1.0) {
            return Err(invalid("engine", "max_weight", "max_weight must be in (0, 1]"));
        }
    }
    Ok(())
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if config.get_int("engine", "seed", 42) < 0 {
        return Err(invalid("engine", "seed", "seed must be non-negative"));
    }
    Ok(())
}

fn validate_volatility_floor(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let value = config.get_double("engine", "volatility_floor", 1e-6);
    if value < 0.0 {
        return Err(invalid(
            "engine",
            "volatility_floor",
            "volatility_floor must be non-negative",
        ));
    }
    Ok(())
}

fn validate_kelly_max_fraction(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let value = config.get_double("engine", "kelly_max_fraction", 0.25);
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(
            "engine",
            "kelly_max_fraction",
            "kelly_max_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_ranking(config: &dyn ConfigPort) -> Result<(), EngineError> {
    match config.get_string("engine", "ranking") {
        Some(s) if !s.trim().is_empty() => s
            .parse::<RankingMetric>()
            .map(|_| ())
            .map_err(|e| invalid("engine", "ranking", &e.to_string())),
        _ => Ok(()),
    }
}
