use crate::workspace::Workspace;
use clap::Subcommand;
use std::path::Path;
use tally_core::InputMode;
use tally_store::{Action, ActivityEntry, ProcessKey};

#[derive(Subcommand)]
pub enum ProcessCmd {
    /// Add a process type to a device
    Add {
        device: String,
        process: String,
        /// Input mode: integer or decimal
        #[arg(long, default_value = "integer")]
        mode: InputMode,
    },
    /// Delete a process type and its ledger
    Rm {
        device: String,
        process: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// List the process types of a device
    List { device: String },
    /// Show or change the input mode (toggles when no mode is given)
    Mode {
        device: String,
        process: String,
        mode: Option<InputMode>,
    },
}

pub fn run(cmd: ProcessCmd, data_dir: &Path) -> anyhow::Result<()> {
    match cmd {
        ProcessCmd::Add {
            device,
            process,
            mode,
        } => add(data_dir, &device, &process, mode),
        ProcessCmd::Rm { device, process, yes } => remove(data_dir, &device, &process, yes),
        ProcessCmd::List { device } => list(data_dir, &device),
        ProcessCmd::Mode {
            device,
            process,
            mode,
        } => set_mode(data_dir, &device, &process, mode),
    }
}

pub fn add(data_dir: &Path, device: &str, process: &str, mode: InputMode) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    let key = ProcessKey::new(device, process)?;
    ws.require_device(device)?;
    let engine = ws.store.create(&key, mode)?;
    ws.record(&ActivityEntry::for_process(
        &key,
        Action::CreateProcess,
        mode.as_str(),
        &engine.snapshot(),
    ));
    println!("Added process '{key}' ({mode})");
    Ok(())
}

pub fn remove(data_dir: &Path, device: &str, process: &str, yes: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    let (key, engine) = ws.engine(device, process)?;
    if !yes {
        anyhow::bail!(
            "Refusing to delete '{key}' with {} contribution(s) without --yes",
            engine.contributions().len()
        );
    }
    ws.store.remove(&key)?;
    ws.record(&ActivityEntry::for_process(
        &key,
        Action::DeleteProcess,
        engine.format(engine.total()),
        &engine.snapshot(),
    ));
    println!("Deleted process '{key}'");
    Ok(())
}

fn list(data_dir: &Path, device: &str) -> anyhow::Result<()> {
    let ws = Workspace::open_read(data_dir)?;
    ws.require_device(device)?;
    let processes = ws.store.list_processes(device)?;
    if processes.is_empty() {
        println!("No processes on '{device}'.");
        return Ok(());
    }
    for process in &processes {
        let (_, engine) = ws.engine(device, process)?;
        println!(
            "  {process:<20} {:<8} {}",
            engine.input_mode().as_str(),
            engine.format(engine.total())
        );
    }
    Ok(())
}

pub fn set_mode(
    data_dir: &Path,
    device: &str,
    process: &str,
    mode: Option<InputMode>,
) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    let (key, mut engine) = ws.engine(device, process)?;
    let mode = mode.unwrap_or_else(|| engine.input_mode().toggled());
    let prior = engine.set_input_mode(mode);
    if prior == mode {
        println!("'{key}' is already in {mode} mode");
        return Ok(());
    }
    ws.store.try_save(&key, &engine)?;
    ws.record(&ActivityEntry::for_process(
        &key,
        Action::SetInputMode,
        mode.as_str(),
        &engine.snapshot(),
    ));
    println!("'{key}' input mode: {prior} -> {mode}");
    if mode == InputMode::Integer && engine.has_fraction() {
        println!("   note: the ledger still holds fractional contributions");
    }
    Ok(())
}
