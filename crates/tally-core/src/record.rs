use crate::engine::Engine;
use crate::types::{
    Contribution, InputMode, Thresholds, DEFAULT_LOWER_LIMIT, DEFAULT_TARGET, DEFAULT_UPPER_LIMIT,
};
use serde::{Deserialize, Serialize};

/// Flat persisted form of an [`Engine`].
///
/// The undo history is not part of the record. Records written before the
/// ledger existed carry only an aggregate `total`; that field is ignored and
/// such a record loads as an empty ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRecord {
    #[serde(default, alias = "batches")]
    pub contributions: Vec<Contribution>,
    #[serde(default = "default_target")]
    pub target: f64,
    #[serde(default = "default_lower_limit")]
    pub lower_limit: f64,
    #[serde(default = "default_upper_limit")]
    pub upper_limit: f64,
    #[serde(default)]
    pub input_mode: InputMode,
    #[serde(default, alias = "liquid_change_reminded")]
    pub reminder_flag: bool,
}

fn default_target() -> f64 {
    DEFAULT_TARGET
}

fn default_lower_limit() -> f64 {
    DEFAULT_LOWER_LIMIT
}

fn default_upper_limit() -> f64 {
    DEFAULT_UPPER_LIMIT
}

impl Default for EngineRecord {
    fn default() -> Self {
        Engine::default().to_record()
    }
}

impl EngineRecord {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Engine {
    pub fn to_record(&self) -> EngineRecord {
        let t = self.thresholds();
        EngineRecord {
            contributions: self.contributions().to_vec(),
            target: t.target,
            lower_limit: t.lower_limit,
            upper_limit: t.upper_limit,
            input_mode: self.input_mode(),
            reminder_flag: self.is_reminded(),
        }
    }

    pub fn from_record(record: EngineRecord) -> Self {
        let thresholds = Thresholds {
            target: record.target,
            lower_limit: record.lower_limit,
            upper_limit: record.upper_limit,
        };
        Engine::from_parts(
            record.contributions,
            thresholds,
            record.input_mode,
            record.reminder_flag,
        )
    }
}

impl From<EngineRecord> for Engine {
    fn from(record: EngineRecord) -> Self {
        Engine::from_record(record)
    }
}

impl From<&Engine> for EngineRecord {
    fn from(engine: &Engine) -> Self {
        engine.to_record()
    }
}
