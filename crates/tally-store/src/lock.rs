use crate::paths::TallyPaths;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers; any number may hold it at once.
    Shared,
    /// One mutation (load, change, save, reminder, log) at a time.
    Exclusive,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::Shared => f.write_str("shared"),
            LockMode::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// Advisory lock on the data directory's `LOCK` file, released on drop.
pub struct WorkspaceLock {
    _file: File,
    mode: LockMode,
}

impl WorkspaceLock {
    /// Exclusive lock without waiting.
    pub fn acquire(paths: &TallyPaths) -> anyhow::Result<Self> {
        Self::acquire_with(paths, LockMode::Exclusive, Duration::ZERO)
    }

    /// Take the lock in `mode`, retrying until `wait` has elapsed while
    /// another command holds a conflicting lock.
    pub fn acquire_with(paths: &TallyPaths, mode: LockMode, wait: Duration) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&paths.root)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&paths.lock_file)
            .map_err(|e| {
                anyhow::anyhow!("cannot open lock file {}: {}", paths.lock_file.display(), e)
            })?;

        let contended = fs2::lock_contended_error().raw_os_error();
        let deadline = Instant::now() + wait;
        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            match attempt {
                Ok(()) => return Ok(Self { _file: file, mode }),
                Err(e) if e.raw_os_error() != contended => {
                    anyhow::bail!("cannot lock {}: {e}", paths.lock_file.display())
                }
                Err(_) if Instant::now() >= deadline => {
                    anyhow::bail!(
                        "tally data at {} is busy: another command holds the lock (wanted {mode} access)",
                        paths.root.display()
                    )
                }
                Err(_) => std::thread::sleep(POLL_INTERVAL),
            }
        }
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}
