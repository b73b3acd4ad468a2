//! Edit-time checks for indicator parameters.

use crate::config::{ConfigError, MAX_INDICATORS, MAX_PERIOD, MIN_PERIOD};
use crate::models::indicators::{IndicatorKind, IndicatorSpec};

fn validate_period(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if !(MIN_PERIOD..=MAX_PERIOD).contains(&value) {
        return Err(ConfigError::InvalidPeriod { name, value });
    }
    Ok(())
}

pub fn validate_spec(spec: &IndicatorSpec) -> Result<(), ConfigError> {
    match spec.kind {
        IndicatorKind::Ema { period } => validate_period("EMA", period),
        IndicatorKind::Macd { fast, slow, signal } => {
            validate_period("MACD fast", fast)?;
            validate_period("MACD slow", slow)?;
            validate_period("MACD signal", signal)?;
            if fast >= slow {
                return Err(ConfigError::InvalidMacdPeriods { fast, slow });
            }
            Ok(())
        }
    }
}

pub fn validate_indicators(specs: &[IndicatorSpec]) -> Result<(), ConfigError> {
    if specs.len() > MAX_INDICATORS {
        return Err(ConfigError::TooManyIndicators);
    }
    specs.iter().try_for_each(validate_spec)
}
