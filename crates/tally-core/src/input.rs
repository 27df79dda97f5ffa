//! Input-range contract for collaborators.
//!
//! The engine accepts any value; callers run raw input through
//! [`RangeConfig::parse_value`] before calling into it.

use crate::types::InputMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_INTEGER_MIN: i64 = 1;
pub const DEFAULT_INTEGER_MAX: i64 = 50;
pub const DEFAULT_DECIMAL_MIN: f64 = 0.0;
pub const DEFAULT_DECIMAL_MAX: f64 = 3.0;

/// Maximum fractional digits accepted in decimal mode.
pub const MAX_DECIMAL_PLACES: usize = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("no value given")]
    Empty,
    #[error("`{0}` is not an integer")]
    NotAnInteger(String),
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("`{0}` has more than two decimal places")]
    TooManyDecimals(String),
    #[error("{value} is outside the allowed range {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("{0} must not be negative")]
    Negative(f64),
    #[error("{mode} range minimum {min} must be below maximum {max}")]
    InvalidRange { mode: InputMode, min: f64, max: f64 },
}

/// Per-device bounds on a single contribution value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    #[serde(default = "default_integer_min")]
    pub integer_min: i64,
    #[serde(default = "default_integer_max")]
    pub integer_max: i64,
    #[serde(default = "default_decimal_min")]
    pub decimal_min: f64,
    #[serde(default = "default_decimal_max")]
    pub decimal_max: f64,
}

fn default_integer_min() -> i64 {
    DEFAULT_INTEGER_MIN
}

fn default_integer_max() -> i64 {
    DEFAULT_INTEGER_MAX
}

fn default_decimal_min() -> f64 {
    DEFAULT_DECIMAL_MIN
}

fn default_decimal_max() -> f64 {
    DEFAULT_DECIMAL_MAX
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            integer_min: DEFAULT_INTEGER_MIN,
            integer_max: DEFAULT_INTEGER_MAX,
            decimal_min: DEFAULT_DECIMAL_MIN,
            decimal_max: DEFAULT_DECIMAL_MAX,
        }
    }
}

impl RangeConfig {
    /// Both ranges must be non-empty.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.integer_min >= self.integer_max {
            return Err(InputError::InvalidRange {
                mode: InputMode::Integer,
                min: self.integer_min as f64,
                max: self.integer_max as f64,
            });
        }
        if self.decimal_min >= self.decimal_max {
            return Err(InputError::InvalidRange {
                mode: InputMode::Decimal,
                min: self.decimal_min,
                max: self.decimal_max,
            });
        }
        Ok(())
    }

    /// Inclusive bounds for `mode`.
    pub fn bounds(&self, mode: InputMode) -> (f64, f64) {
        match mode {
            InputMode::Integer => (self.integer_min as f64, self.integer_max as f64),
            InputMode::Decimal => (self.decimal_min, self.decimal_max),
        }
    }

    pub fn check(&self, mode: InputMode, value: f64) -> Result<(), InputError> {
        let (min, max) = self.bounds(mode);
        if value < min || value > max {
            return Err(InputError::OutOfRange { value, min, max });
        }
        Ok(())
    }

    /// Parse and range-check a raw contribution value.
    pub fn parse_value(&self, mode: InputMode, raw: &str) -> Result<f64, InputError> {
        let value = parse_number(mode, raw)?;
        self.check(mode, value)?;
        Ok(value)
    }

    pub fn describe(&self, mode: InputMode) -> String {
        match mode {
            InputMode::Integer => format!("{}-{} integer", self.integer_min, self.integer_max),
            InputMode::Decimal => format!(
                "{}-{} decimal ({MAX_DECIMAL_PLACES} places)",
                crate::format::format_number(self.decimal_min),
                crate::format::format_number(self.decimal_max)
            ),
        }
    }
}

/// Parse `raw` according to the mode's format rules, without range checks.
/// Decimal values are rounded to two places.
pub fn parse_number(mode: InputMode, raw: &str) -> Result<f64, InputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InputError::Empty);
    }
    match mode {
        InputMode::Integer => raw
            .parse::<i64>()
            .map(|v| v as f64)
            .map_err(|_| InputError::NotAnInteger(raw.to_string())),
        InputMode::Decimal => {
            let value: f64 = raw
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite())
                .ok_or_else(|| InputError::NotANumber(raw.to_string()))?;
            if let Some((_, frac)) = raw.split_once('.') {
                if frac.len() > MAX_DECIMAL_PLACES {
                    return Err(InputError::TooManyDecimals(raw.to_string()));
                }
            }
            Ok((value * 100.0).round() / 100.0)
        }
    }
}

/// Parse a threshold value: any finite, non-negative number.
pub fn parse_non_negative(raw: &str) -> Result<f64, InputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InputError::Empty);
    }
    let value: f64 = raw
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| InputError::NotANumber(raw.to_string()))?;
    if value < 0.0 {
        return Err(InputError::Negative(value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_mode_accepts_in_range() {
        let cfg = RangeConfig::default();
        assert_eq!(cfg.parse_value(InputMode::Integer, " 25 ").unwrap(), 25.0);
        assert_eq!(cfg.parse_value(InputMode::Integer, "50").unwrap(), 50.0);
    }

    #[test]
    fn integer_mode_rejects_bad_input() {
        let cfg = RangeConfig::default();
        assert_eq!(cfg.parse_value(InputMode::Integer, ""), Err(InputError::Empty));
        assert!(matches!(
            cfg.parse_value(InputMode::Integer, "2.5"),
            Err(InputError::NotAnInteger(_))
        ));
        assert!(matches!(
            cfg.parse_value(InputMode::Integer, "0"),
            Err(InputError::OutOfRange { .. })
        ));
        assert!(matches!(
            cfg.parse_value(InputMode::Integer, "51"),
            Err(InputError::OutOfRange { .. })
        ));
    }

    #[test]
    fn decimal_mode_limits_places_and_range() {
        let cfg = RangeConfig::default();
        assert_eq!(cfg.parse_value(InputMode::Decimal, "1.25").unwrap(), 1.25);
        assert_eq!(cfg.parse_value(InputMode::Decimal, "3").unwrap(), 3.0);
        assert!(matches!(
            cfg.parse_value(InputMode::Decimal, "1.255"),
            Err(InputError::TooManyDecimals(_))
        ));
        assert!(matches!(
            cfg.parse_value(InputMode::Decimal, "3.01"),
            Err(InputError::OutOfRange { .. })
        ));
        assert!(matches!(
            cfg.parse_value(InputMode::Decimal, "abc"),
            Err(InputError::NotANumber(_))
        ));
    }

    #[test]
    fn validate_requires_min_below_max() {
        assert!(RangeConfig::default().validate().is_ok());
        let cfg = RangeConfig {
            integer_min: 10,
            integer_max: 10,
            ..RangeConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(InputError::InvalidRange { mode: InputMode::Integer, .. })
        ));
        let cfg = RangeConfig {
            decimal_min: 2.0,
            decimal_max: 1.0,
            ..RangeConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(InputError::InvalidRange { mode: InputMode::Decimal, .. })
        ));
    }

    #[test]
    fn partial_range_file_fills_defaults() {
        let cfg: RangeConfig = serde_json::from_str(r#"{"integer_max": 80}"#).unwrap();
        assert_eq!(cfg.integer_max, 80);
        assert_eq!(cfg.integer_min, DEFAULT_INTEGER_MIN);
        assert_eq!(cfg.decimal_max, DEFAULT_DECIMAL_MAX);
    }

    #[test]
    fn thresholds_must_be_non_negative() {
        assert_eq!(parse_non_negative("3000").unwrap(), 3000.0);
        assert_eq!(parse_non_negative("-1"), Err(InputError::Negative(-1.0)));
        assert!(matches!(parse_non_negative("inf"), Err(InputError::NotANumber(_))));
    }
}
