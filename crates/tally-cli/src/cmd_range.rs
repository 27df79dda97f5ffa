use crate::workspace::Workspace;
use clap::Subcommand;
use std::path::Path;
use tally_core::{InputMode, RangeConfig};
use tally_store::{Action, ActivityEntry};

#[derive(Subcommand)]
pub enum RangeCmd {
    /// Show the input range of a device
    Show { device: String },
    /// Change the input range of a device (unset bounds are kept)
    Set {
        device: String,
        #[arg(long)]
        int_min: Option<i64>,
        #[arg(long)]
        int_max: Option<i64>,
        #[arg(long)]
        dec_min: Option<f64>,
        #[arg(long)]
        dec_max: Option<f64>,
    },
}

/// Bounds given on the command line; `None` keeps the current value.
#[derive(Debug, Default, Clone, Copy)]
pub struct RangeUpdate {
    pub integer_min: Option<i64>,
    pub integer_max: Option<i64>,
    pub decimal_min: Option<f64>,
    pub decimal_max: Option<f64>,
}

impl RangeUpdate {
    fn is_empty(&self) -> bool {
        self.integer_min.is_none()
            && self.integer_max.is_none()
            && self.decimal_min.is_none()
            && self.decimal_max.is_none()
    }

    fn apply(&self, mut range: RangeConfig) -> RangeConfig {
        if let Some(v) = self.integer_min {
            range.integer_min = v;
        }
        if let Some(v) = self.integer_max {
            range.integer_max = v;
        }
        if let Some(v) = self.decimal_min {
            range.decimal_min = v;
        }
        if let Some(v) = self.decimal_max {
            range.decimal_max = v;
        }
        range
    }
}

pub fn run(cmd: RangeCmd, data_dir: &Path) -> anyhow::Result<()> {
    match cmd {
        RangeCmd::Show { device } => show(data_dir, &device),
        RangeCmd::Set {
            device,
            int_min,
            int_max,
            dec_min,
            dec_max,
        } => set(
            data_dir,
            &device,
            RangeUpdate {
                integer_min: int_min,
                integer_max: int_max,
                decimal_min: dec_min,
                decimal_max: dec_max,
            },
        ),
    }
}

fn show(data_dir: &Path, device: &str) -> anyhow::Result<()> {
    let ws = Workspace::open_read(data_dir)?;
    ws.require_device(device)?;
    let range = ws.store.load_range(device);
    println!("{device}:");
    println!("  integer  {}", range.describe(InputMode::Integer));
    println!("  decimal  {}", range.describe(InputMode::Decimal));
    Ok(())
}

pub fn set(data_dir: &Path, device: &str, update: RangeUpdate) -> anyhow::Result<()> {
    if update.is_empty() {
        anyhow::bail!("Nothing to change. Pass --int-min, --int-max, --dec-min or --dec-max.");
    }
    let ws = Workspace::open(data_dir)?;
    ws.require_device(device)?;
    let range = update.apply(ws.store.load_range(device));
    ws.store.save_range(device, &range)?;

    let summary = format!(
        "{}; {}",
        range.describe(InputMode::Integer),
        range.describe(InputMode::Decimal)
    );
    ws.record(&ActivityEntry::for_device(device, Action::SetRange, summary.clone()));
    println!("{device}: {summary}");
    Ok(())
}
