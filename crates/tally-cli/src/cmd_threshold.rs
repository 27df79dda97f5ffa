use crate::workspace::{warn_inverted_thresholds, Workspace};
use clap::Subcommand;
use std::path::Path;
use tally_core::input::parse_non_negative;
use tally_core::ThresholdField;
use tally_store::Action;

#[derive(Subcommand)]
pub enum SetCmd {
    /// Total at which a change is due
    Target {
        device: String,
        process: String,
        value: String,
    },
    /// Total from which change reminders start
    Lower {
        device: String,
        process: String,
        value: String,
    },
    /// Total above which further additions are refused
    Upper {
        device: String,
        process: String,
        value: String,
    },
}

pub fn run(cmd: SetCmd, data_dir: &Path) -> anyhow::Result<()> {
    let (field, device, process, value) = match cmd {
        SetCmd::Target {
            device,
            process,
            value,
        } => (ThresholdField::Target, device, process, value),
        SetCmd::Lower {
            device,
            process,
            value,
        } => (ThresholdField::LowerLimit, device, process, value),
        SetCmd::Upper {
            device,
            process,
            value,
        } => (ThresholdField::UpperLimit, device, process, value),
    };
    set(data_dir, &device, &process, field, &value)
}

fn action_for(field: ThresholdField) -> Action {
    match field {
        ThresholdField::Target => Action::SetTarget,
        ThresholdField::LowerLimit => Action::SetLowerLimit,
        ThresholdField::UpperLimit => Action::SetUpperLimit,
    }
}

pub fn set(
    data_dir: &Path,
    device: &str,
    process: &str,
    field: ThresholdField,
    raw_value: &str,
) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    let (key, mut engine) = ws.engine(device, process)?;
    let value = parse_non_negative(raw_value)?;

    let prior = engine.set_threshold(field, value);
    let shown = engine.format(value);
    println!("{key}: {field} {} -> {shown}", engine.format(prior));
    warn_inverted_thresholds(&key, &engine);
    ws.commit(&key, &mut engine, action_for(field), &shown, None)?;
    Ok(())
}
