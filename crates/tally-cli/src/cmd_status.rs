use crate::workspace::Workspace;
use serde::Serialize;
use std::path::Path;
use tally_core::{Engine, InputMode};

#[derive(Debug, Serialize)]
struct StatusRow {
    device_id: String,
    process_type: String,
    input_mode: InputMode,
    total: f64,
    target: f64,
    lower_limit: f64,
    upper_limit: f64,
    status: String,
    reminded: bool,
    undo_depth: usize,
}

impl StatusRow {
    fn new(device_id: &str, process_type: &str, engine: &Engine) -> Self {
        let t = engine.thresholds();
        Self {
            device_id: device_id.to_string(),
            process_type: process_type.to_string(),
            input_mode: engine.input_mode(),
            total: engine.total(),
            target: t.target,
            lower_limit: t.lower_limit,
            upper_limit: t.upper_limit,
            status: engine.status().to_string(),
            reminded: engine.is_reminded(),
            undo_depth: engine.undo_depth(),
        }
    }
}

fn collect(ws: &Workspace, device: Option<&str>) -> anyhow::Result<Vec<(StatusRow, Engine)>> {
    let devices = match device {
        Some(d) => {
            ws.require_device(d)?;
            vec![d.to_string()]
        }
        None => ws.store.list_devices()?,
    };
    let mut rows = Vec::new();
    for device in &devices {
        for process in ws.store.list_processes(device)? {
            let (_, engine) = ws.engine(device, &process)?;
            rows.push((StatusRow::new(device, &process, &engine), engine));
        }
    }
    Ok(rows)
}

pub fn execute(data_dir: &Path, device: Option<&str>, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open_read(data_dir)?;
    let rows = collect(&ws, device)?;

    if json {
        let out: Vec<&StatusRow> = rows.iter().map(|(row, _)| row).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No processes. Add one with `tally process add <device> <process>`.");
        return Ok(());
    }

    println!(
        "{:<12} {:<16} {:>10} {:>10} {:>10} {:>10}  STATUS",
        "DEVICE", "PROCESS", "TOTAL", "LOWER", "TARGET", "UPPER"
    );
    for (row, engine) in &rows {
        let mark = if row.reminded { " *" } else { "" };
        println!(
            "{:<12} {:<16} {:>10} {:>10} {:>10} {:>10}  {}{mark}",
            row.device_id,
            row.process_type,
            engine.format(row.total),
            engine.format(row.lower_limit),
            engine.format(row.target),
            engine.format(row.upper_limit),
            row.status,
        );
    }
    Ok(())
}
