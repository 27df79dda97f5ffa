use crate::key::{validate_name, ProcessKey};
use crate::paths::TallyPaths;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tally_core::{Contribution, Engine, EngineRecord, InputMode, Thresholds, UndoHistory};

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// On-disk undo history of one process, stamped with the ledger and
/// thresholds it was written alongside. The record and the journal are two
/// separate writes, so a journal whose stamp disagrees with the record is
/// stale and gets dropped on load.
#[derive(Debug, Serialize, Deserialize)]
struct UndoJournal {
    contributions: usize,
    total: f64,
    last: Option<Contribution>,
    thresholds: Thresholds,
    history: UndoHistory,
}

impl UndoJournal {
    fn new(engine: &Engine) -> Self {
        Self {
            contributions: engine.contributions().len(),
            total: engine.total(),
            last: engine.contributions().last().cloned(),
            thresholds: *engine.thresholds(),
            history: engine.history().clone(),
        }
    }

    fn matches(&self, engine: &Engine) -> bool {
        self.contributions == engine.contributions().len()
            && self.total == engine.total()
            && self.last.as_ref() == engine.contributions().last()
            && &self.thresholds == engine.thresholds()
    }
}

/// File-backed persistence for engines, one JSON record per process.
///
/// Every save overwrites the whole record; a failed write never leaves a
/// partially written file behind. The undo history lives in a separate
/// journal next to the record so that undo works across invocations; a
/// missing or unreadable journal only costs the history.
#[derive(Debug, Clone)]
pub struct EngineStore {
    pub paths: TallyPaths,
}

impl EngineStore {
    /// Open a store rooted at `data_dir`, creating the layout if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let paths = TallyPaths::discover(data_dir);
        paths.ensure_layout()?;
        Ok(Self { paths })
    }

    // ── Engines ──

    pub fn exists(&self, key: &ProcessKey) -> bool {
        self.paths.process_file(key).is_file()
    }

    /// Read a persisted engine. `Ok(None)` when no record exists.
    pub fn try_load(&self, key: &ProcessKey) -> anyhow::Result<Option<Engine>> {
        let path = self.paths.process_file(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let record = EngineRecord::from_json(&content)
            .map_err(|e| anyhow::anyhow!("cannot parse {}: {e}", path.display()))?;
        let mut engine = Engine::from_record(record);
        match self.load_journal(key) {
            Ok(Some(journal)) if journal.matches(&engine) => engine.restore_history(journal.history),
            Ok(Some(_)) => tracing::warn!(%key, "undo journal does not match the record, discarding it"),
            Ok(None) => {}
            Err(e) => tracing::warn!(%key, error = %e, "discarding unreadable undo journal"),
        }
        Ok(Some(engine))
    }

    fn load_journal(&self, key: &ProcessKey) -> anyhow::Result<Option<UndoJournal>> {
        let path = self.paths.undo_file(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Read a persisted engine, falling back to a fresh one when the record
    /// is missing or unreadable.
    pub fn load(&self, key: &ProcessKey) -> Engine {
        match self.try_load(key) {
            Ok(Some(engine)) => engine,
            Ok(None) => Engine::default(),
            Err(e) => {
                tracing::warn!(%key, error = %e, "failed to load process state, starting empty");
                Engine::default()
            }
        }
    }

    pub fn try_save(&self, key: &ProcessKey, engine: &Engine) -> anyhow::Result<()> {
        let json = engine.to_record().to_json_pretty()?;
        write_atomic(&self.paths.process_file(key), json.as_bytes())?;
        let journal = serde_json::to_string(&UndoJournal::new(engine))?;
        write_atomic(&self.paths.undo_file(key), journal.as_bytes())
    }

    /// Create and persist a fresh engine. Fails if the process exists.
    pub fn create(&self, key: &ProcessKey, mode: InputMode) -> anyhow::Result<Engine> {
        if self.exists(key) {
            anyhow::bail!("process {key} already exists");
        }
        let engine = Engine::new(mode);
        self.try_save(key, &engine)?;
        Ok(engine)
    }

    /// Delete a process record and its undo journal. Returns whether it existed.
    pub fn remove(&self, key: &ProcessKey) -> anyhow::Result<bool> {
        let path = self.paths.process_file(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        let journal = self.paths.undo_file(key);
        if journal.exists() {
            fs::remove_file(&journal)?;
        }
        Ok(true)
    }

    // ── Devices ──

    pub fn has_device(&self, device_id: &str) -> bool {
        self.paths.device_dir(device_id).is_dir()
    }

    /// Register a device. Returns `false` if it already existed.
    pub fn add_device(&self, device_id: &str) -> anyhow::Result<bool> {
        validate_name("device", device_id)?;
        if self.has_device(device_id) {
            return Ok(false);
        }
        fs::create_dir_all(self.paths.processes_dir(device_id))?;
        Ok(true)
    }

    /// Delete a device with all its processes and its range config.
    pub fn remove_device(&self, device_id: &str) -> anyhow::Result<bool> {
        validate_name("device", device_id)?;
        let dir = self.paths.device_dir(device_id);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        Ok(true)
    }

    /// All registered devices, sorted by name.
    pub fn list_devices(&self) -> anyhow::Result<Vec<String>> {
        list_names(&self.paths.devices_dir, |entry| {
            entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
        })
    }

    /// All processes of a device, sorted by name.
    pub fn list_processes(&self, device_id: &str) -> anyhow::Result<Vec<String>> {
        let dir = self.paths.processes_dir(device_id);
        let mut names = list_names(&dir, |entry| {
            entry.path().extension().is_some_and(|ext| ext == "json")
        })?;
        for name in &mut names {
            if let Some(stem) = name.strip_suffix(".json") {
                *name = stem.to_string();
            }
        }
        Ok(names)
    }
}

fn list_names(dir: &Path, keep: impl Fn(&fs::DirEntry) -> bool) -> anyhow::Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !keep(&entry) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
