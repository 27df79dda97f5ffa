use serde::{Deserialize, Serialize};

/// Default change target for a fresh process.
pub const DEFAULT_TARGET: f64 = 3000.0;

/// Default lower limit: the reminder band opens at this total.
pub const DEFAULT_LOWER_LIMIT: f64 = 0.0;

/// Default upper limit: above this total a change is forced.
pub const DEFAULT_UPPER_LIMIT: f64 = 5000.0;

/// Label used for the single contribution written by `Engine::seed`.
pub const SEED_LABEL: &str = "sample";

/// One recorded batch quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contribution {
    #[serde(alias = "batch_id")]
    pub batch_label: String,
    pub value: f64,
}

impl Contribution {
    pub fn new(batch_label: impl Into<String>, value: f64) -> Self {
        Self {
            batch_label: batch_label.into(),
            value,
        }
    }

    pub fn is_fractional(&self) -> bool {
        self.value.fract() != 0.0
    }
}

/// How collaborators validate and format values. Core arithmetic ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    #[default]
    Integer,
    Decimal,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Integer => "integer",
            InputMode::Decimal => "decimal",
        }
    }

    /// The other mode.
    pub fn toggled(&self) -> Self {
        match self {
            InputMode::Integer => InputMode::Decimal,
            InputMode::Decimal => InputMode::Integer,
        }
    }
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown input mode `{0}` (expected `integer` or `decimal`)")]
pub struct ParseInputModeError(pub String);

impl std::str::FromStr for InputMode {
    type Err = ParseInputModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "integer" | "int" => Ok(InputMode::Integer),
            "decimal" | "dec" => Ok(InputMode::Decimal),
            other => Err(ParseInputModeError(other.to_string())),
        }
    }
}

/// Target, lower limit and upper limit. No ordering is enforced between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub target: f64,
    pub lower_limit: f64,
    pub upper_limit: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            lower_limit: DEFAULT_LOWER_LIMIT,
            upper_limit: DEFAULT_UPPER_LIMIT,
        }
    }
}

/// Which threshold field a setter or undo record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdField {
    Target,
    LowerLimit,
    UpperLimit,
}

impl ThresholdField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdField::Target => "target",
            ThresholdField::LowerLimit => "lower_limit",
            ThresholdField::UpperLimit => "upper_limit",
        }
    }
}

impl std::fmt::Display for ThresholdField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Thresholds {
    pub fn get(&self, field: ThresholdField) -> f64 {
        match field {
            ThresholdField::Target => self.target,
            ThresholdField::LowerLimit => self.lower_limit,
            ThresholdField::UpperLimit => self.upper_limit,
        }
    }

    /// Replace one field, returning the value it held before.
    pub fn replace(&mut self, field: ThresholdField, value: f64) -> f64 {
        let slot = match field {
            ThresholdField::Target => &mut self.target,
            ThresholdField::LowerLimit => &mut self.lower_limit,
            ThresholdField::UpperLimit => &mut self.upper_limit,
        };
        std::mem::replace(slot, value)
    }
}

/// Status derived from total against thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Normal,
    NeedsChange,
    OverUpper,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Normal => write!(f, "normal"),
            Status::NeedsChange => write!(f, "needs change"),
            Status::OverUpper => write!(f, "over upper"),
        }
    }
}

/// Post-mutation fields handed to the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub total: f64,
    pub target: f64,
    pub lower_limit: f64,
    pub upper_limit: f64,
    pub input_mode: InputMode,
}
