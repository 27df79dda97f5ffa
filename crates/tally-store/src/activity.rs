use crate::key::ProcessKey;
use crate::paths::TallyPaths;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tally_core::{InputMode, Snapshot};

/// What a logged operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Add,
    Reset,
    Undo,
    SetTarget,
    SetLowerLimit,
    SetUpperLimit,
    Seed,
    SetInputMode,
    CreateProcess,
    DeleteProcess,
    CreateDevice,
    DeleteDevice,
    ClearDevice,
    SetRange,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Add => "add",
            Action::Reset => "reset",
            Action::Undo => "undo",
            Action::SetTarget => "set_target",
            Action::SetLowerLimit => "set_lower_limit",
            Action::SetUpperLimit => "set_upper_limit",
            Action::Seed => "seed",
            Action::SetInputMode => "set_input_mode",
            Action::CreateProcess => "create_process",
            Action::DeleteProcess => "delete_process",
            Action::CreateDevice => "create_device",
            Action::DeleteDevice => "delete_device",
            Action::ClearDevice => "clear_device",
            Action::SetRange => "set_range",
        };
        f.write_str(s)
    }
}

/// One line of `activity.jsonl`.
///
/// Device-level entries carry no process and no engine fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub entry_id: String,
    pub timestamp: String,
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_label: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<InputMode>,
}

impl ActivityEntry {
    /// Device-level entry stamped with the current time.
    pub fn for_device(device_id: &str, action: Action, value: impl Into<String>) -> Self {
        Self {
            entry_id: new_entry_id(),
            timestamp: now_rfc3339(),
            device_id: device_id.to_string(),
            process_type: None,
            action,
            batch_label: None,
            value: value.into(),
            total: None,
            target: None,
            lower_limit: None,
            upper_limit: None,
            input_mode: None,
        }
    }

    /// Process-level entry carrying the engine's post-mutation fields.
    pub fn for_process(
        key: &ProcessKey,
        action: Action,
        value: impl Into<String>,
        snapshot: &Snapshot,
    ) -> Self {
        let mut entry = Self::for_device(key.device_id(), action, value);
        entry.process_type = Some(key.process_type().to_string());
        entry.total = Some(snapshot.total);
        entry.target = Some(snapshot.target);
        entry.lower_limit = Some(snapshot.lower_limit);
        entry.upper_limit = Some(snapshot.upper_limit);
        entry.input_mode = Some(snapshot.input_mode);
        entry
    }

    pub fn with_batch(mut self, batch_label: impl Into<String>) -> Self {
        self.batch_label = Some(batch_label.into());
        self
    }
}

fn new_entry_id() -> String {
    format!("act_{}", ulid::Ulid::new().to_string().to_lowercase())
}

fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Append an entry to activity.jsonl.
pub fn append_activity(paths: &TallyPaths, entry: &ActivityEntry) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    std::fs::create_dir_all(&paths.root)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.activity_jsonl)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Read all entries in append order. Returns empty vec if the file doesn't exist.
///
/// Appends are not atomic, so a crash can leave a torn line behind. Lines
/// that do not parse are skipped with a warning.
pub fn list_activity(paths: &TallyPaths) -> anyhow::Result<Vec<ActivityEntry>> {
    if !paths.activity_jsonl.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&paths.activity_jsonl)?;
    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ActivityEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(line = idx + 1, error = %e, "skipping unreadable activity entry")
            }
        }
    }
    Ok(entries)
}
