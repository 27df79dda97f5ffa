use std::path::Path;
use std::time::Duration;
use tally_core::{Engine, Reminder, ReminderLevel};
use tally_notify::{NotifyConfig, NotifyEvent};
use tally_store::{
    append_activity, Action, ActivityEntry, EngineStore, LockMode, ProcessKey, TallyPaths,
    WorkspaceLock,
};

/// How long a command waits for another tally command to release the lock.
const LOCK_WAIT: Duration = Duration::from_secs(2);

/// An opened, locked data directory. The lock is held until drop, so one
/// `Workspace` spans one logical operation. Mutating commands use `open`
/// (exclusive); commands that only read use `open_read` (shared).
pub struct Workspace {
    pub store: EngineStore,
    notify: NotifyConfig,
    _lock: WorkspaceLock,
}

impl Workspace {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        Self::open_with(data_dir, LockMode::Exclusive)
    }

    pub fn open_read(data_dir: &Path) -> anyhow::Result<Self> {
        Self::open_with(data_dir, LockMode::Shared)
    }

    fn open_with(data_dir: &Path, mode: LockMode) -> anyhow::Result<Self> {
        let paths = TallyPaths::discover(data_dir);
        if !paths.is_initialized() {
            anyhow::bail!(
                "No tally data directory at {}. Run `tally init` first.",
                paths.root.display()
            );
        }
        let lock = WorkspaceLock::acquire_with(&paths, mode, LOCK_WAIT)?;
        let store = EngineStore::open(data_dir)?;
        let notify = NotifyConfig::load(&store.paths);
        Ok(Self {
            store,
            notify,
            _lock: lock,
        })
    }

    pub fn require_device(&self, device_id: &str) -> anyhow::Result<()> {
        if !self.store.has_device(device_id) {
            anyhow::bail!("Unknown device '{device_id}'. Add it with `tally device add {device_id}`.");
        }
        Ok(())
    }

    /// Load the engine of an existing process.
    pub fn engine(&self, device_id: &str, process_type: &str) -> anyhow::Result<(ProcessKey, Engine)> {
        let key = ProcessKey::new(device_id, process_type)?;
        self.require_device(device_id)?;
        if !self.store.exists(&key) {
            anyhow::bail!(
                "Unknown process '{key}'. Add it with `tally process add {device_id} {process_type}`."
            );
        }
        let engine = self.store.load(&key);
        Ok((key, engine))
    }

    /// Finish a mutation: persist, evaluate the reminder (persisting again
    /// when the flag moved), log the activity and announce the reminder.
    ///
    /// A failed save is reported and does not stop the reminder or the log
    /// entry; the in-memory engine already holds the change.
    pub fn commit(
        &self,
        key: &ProcessKey,
        engine: &mut Engine,
        action: Action,
        value: &str,
        batch_label: Option<&str>,
    ) -> anyhow::Result<Option<Reminder>> {
        self.persist(key, engine);

        let was_reminded = engine.is_reminded();
        let reminder = engine.check_reminder();
        if engine.is_reminded() != was_reminded {
            self.persist(key, engine);
        }

        let mut entry = ActivityEntry::for_process(key, action, value, &engine.snapshot());
        if let Some(label) = batch_label {
            entry = entry.with_batch(label);
        }
        self.record(&entry);

        if let Some(r) = &reminder {
            print_reminder(key, r);
            if let Some(event) = NotifyEvent::from_reminder(key, r) {
                tally_notify::dispatch(&self.notify, &event);
            }
        }
        Ok(reminder)
    }

    fn persist(&self, key: &ProcessKey, engine: &Engine) {
        if let Err(e) = self.store.try_save(key, engine) {
            tracing::warn!(%key, error = %e, "failed to save process state");
            eprintln!("warning: could not save {key}: {e:#}");
        }
    }

    /// Append to the activity log. A failed append does not undo the change.
    pub fn record(&self, entry: &ActivityEntry) {
        if let Err(e) = append_activity(&self.store.paths, entry) {
            tracing::warn!(action = %entry.action, error = %e, "failed to append activity entry");
        }
    }
}

pub fn print_reminder(key: &ProcessKey, reminder: &Reminder) {
    match reminder.level() {
        ReminderLevel::Forced => eprintln!("!! {key}: {reminder}"),
        ReminderLevel::Notice => println!("   {key}: {reminder}"),
    }
}

/// Print a warning when the thresholds no longer make sense together.
/// The engine accepts any combination.
pub fn warn_inverted_thresholds(key: &ProcessKey, engine: &Engine) {
    let t = engine.thresholds();
    if t.lower_limit > t.target || t.target > t.upper_limit {
        eprintln!(
            "warning: {key} thresholds are out of order (lower {} / target {} / upper {})",
            engine.format(t.lower_limit),
            engine.format(t.target),
            engine.format(t.upper_limit)
        );
    }
}
