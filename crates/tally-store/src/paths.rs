use crate::key::ProcessKey;
use std::path::PathBuf;

/// All well-known paths under a tally data directory.
#[derive(Debug, Clone)]
pub struct TallyPaths {
    pub root: PathBuf,
    pub devices_dir: PathBuf,
    pub activity_jsonl: PathBuf,
    pub config_json: PathBuf,
    pub lock_file: PathBuf,
}

impl TallyPaths {
    /// Derive all paths from a data directory. Pure computation, no I/O.
    pub fn discover(data_dir: impl Into<PathBuf>) -> Self {
        let root = data_dir.into();
        Self {
            devices_dir: root.join("devices"),
            activity_jsonl: root.join("activity.jsonl"),
            config_json: root.join("config.json"),
            lock_file: root.join("LOCK"),
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.devices_dir)?;
        Ok(())
    }

    /// Check whether the layout has been created.
    pub fn is_initialized(&self) -> bool {
        self.devices_dir.is_dir()
    }

    /// `devices/<device_id>/`
    pub fn device_dir(&self, device_id: &str) -> PathBuf {
        self.devices_dir.join(device_id)
    }

    /// `devices/<device_id>/processes/`
    pub fn processes_dir(&self, device_id: &str) -> PathBuf {
        self.device_dir(device_id).join("processes")
    }

    /// `devices/<device_id>/processes/<process_type>.json`
    pub fn process_file(&self, key: &ProcessKey) -> PathBuf {
        self.processes_dir(key.device_id())
            .join(format!("{}.json", key.process_type()))
    }

    /// `devices/<device_id>/undo/<process_type>.json`
    pub fn undo_file(&self, key: &ProcessKey) -> PathBuf {
        self.device_dir(key.device_id())
            .join("undo")
            .join(format!("{}.json", key.process_type()))
    }

    /// `devices/<device_id>/range.json`
    pub fn range_file(&self, device_id: &str) -> PathBuf {
        self.device_dir(device_id).join("range.json")
    }
}

/// Per-user default data directory.
/// `$XDG_DATA_HOME/tally` or platform equivalent, falling back to `~/.tally`.
pub fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("tally")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".tally")
    } else {
        PathBuf::from(".tally")
    }
}
