use crate::workspace::Workspace;
use clap::Subcommand;
use std::path::Path;
use tally_store::{Action, ActivityEntry};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum DeviceCmd {
    /// Register a device
    Add { device: String },
    /// Delete a device with all of its processes
    Rm {
        device: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// List devices and their process counts
    List,
}

// ── Dispatch ──

pub fn run(cmd: DeviceCmd, data_dir: &Path) -> anyhow::Result<()> {
    match cmd {
        DeviceCmd::Add { device } => add(data_dir, &device),
        DeviceCmd::Rm { device, yes } => remove(data_dir, &device, yes),
        DeviceCmd::List => list(data_dir),
    }
}

// ── Command Implementations ──

pub fn add(data_dir: &Path, device: &str) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    if !ws.store.add_device(device)? {
        println!("Device '{device}' already exists");
        return Ok(());
    }
    let range = ws.store.load_range(device);
    ws.record(&ActivityEntry::for_device(device, Action::CreateDevice, ""));
    println!(
        "Added device '{device}' (integer {}, decimal {})",
        range.describe(tally_core::InputMode::Integer),
        range.describe(tally_core::InputMode::Decimal)
    );
    Ok(())
}

pub fn remove(data_dir: &Path, device: &str, yes: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    ws.require_device(device)?;
    let processes = ws.store.list_processes(device)?;
    if !yes {
        anyhow::bail!(
            "Refusing to delete device '{device}' and its {} process(es) without --yes",
            processes.len()
        );
    }
    ws.store.remove_device(device)?;
    ws.record(&ActivityEntry::for_device(
        device,
        Action::DeleteDevice,
        processes.join(","),
    ));
    println!("Deleted device '{device}'");
    Ok(())
}

fn list(data_dir: &Path) -> anyhow::Result<()> {
    let ws = Workspace::open_read(data_dir)?;
    let devices = ws.store.list_devices()?;
    if devices.is_empty() {
        println!("No devices. Add one with `tally device add <device>`.");
        return Ok(());
    }
    for device in &devices {
        let count = ws.store.list_processes(device)?.len();
        println!("  {device:<20} {count} process(es)");
    }
    Ok(())
}
