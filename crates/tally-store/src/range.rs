use crate::store::{write_atomic, EngineStore};
use tally_core::RangeConfig;

impl EngineStore {
    /// Input range for a device. A missing file is created with defaults;
    /// an unreadable one yields defaults.
    pub fn load_range(&self, device_id: &str) -> RangeConfig {
        let path = self.paths.range_file(device_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let defaults = RangeConfig::default();
                if self.has_device(device_id) {
                    if let Err(e) = self.save_range(device_id, &defaults) {
                        tracing::warn!(device_id, error = %e, "failed to write default range");
                    }
                }
                return defaults;
            }
            Err(e) => {
                tracing::warn!(device_id, error = %e, "failed to read range config");
                return RangeConfig::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(device_id, error = %e, "failed to parse range config");
                RangeConfig::default()
            }
        }
    }

    /// Validate and persist a device's input range.
    pub fn save_range(&self, device_id: &str, range: &RangeConfig) -> anyhow::Result<()> {
        range.validate()?;
        let json = serde_json::to_string_pretty(range)?;
        write_atomic(&self.paths.range_file(device_id), json.as_bytes())
    }
}
