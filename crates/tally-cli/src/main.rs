mod cmd_count;
mod cmd_device;
mod cmd_init;
mod cmd_log;
mod cmd_notify;
mod cmd_process;
mod cmd_range;
mod cmd_status;
mod cmd_threshold;
mod workspace;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Count batches per device and process, and get reminded when it is time to change"
)]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TALLY_DATA_DIR")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the data directory
    Init,
    /// Manage devices
    Device {
        #[command(subcommand)]
        cmd: cmd_device::DeviceCmd,
    },
    /// Manage process types of a device
    Process {
        #[command(subcommand)]
        cmd: cmd_process::ProcessCmd,
    },
    /// Record a batch contribution
    Add {
        device: String,
        process: String,
        /// Batch label
        batch: String,
        /// Contribution value, checked against the device's input range
        value: String,
        /// Record even if the upper limit would be exceeded
        #[arg(long)]
        force: bool,
    },
    /// Clear the ledger of a process
    Reset { device: String, process: String },
    /// Reset every process of a device that has a non-zero total
    Clear { device: String },
    /// Revert the most recent change of a process
    Undo { device: String, process: String },
    /// Change a threshold
    Set {
        #[command(subcommand)]
        cmd: cmd_threshold::SetCmd,
    },
    /// Replace the ledger with a single sample contribution
    Seed {
        device: String,
        process: String,
        value: String,
    },
    /// Show totals and status
    Status {
        /// Only show this device
        device: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change a device's input range
    Range {
        #[command(subcommand)]
        cmd: cmd_range::RangeCmd,
    },
    /// Show the activity log, newest first
    Log {
        /// Filter by device
        #[arg(long)]
        device: Option<String>,
        /// Filter by process type
        #[arg(long)]
        process: Option<String>,
        /// Maximum number of entries to show (0 = unlimited)
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Export the activity log to a file
    Export {
        /// Output path
        path: PathBuf,
        /// Output format: csv, json or txt (inferred from the extension, csv if none)
        #[arg(long)]
        format: Option<String>,
        /// Filter by device
        #[arg(long)]
        device: Option<String>,
    },
    /// Notification channels
    Notify {
        #[command(subcommand)]
        cmd: cmd_notify::NotifyCmd,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let data_dir = cli
        .data_dir
        .unwrap_or_else(tally_store::paths::default_data_dir);

    match cli.cmd {
        Command::Init => cmd_init::execute(&data_dir),
        Command::Device { cmd } => cmd_device::run(cmd, &data_dir),
        Command::Process { cmd } => cmd_process::run(cmd, &data_dir),
        Command::Add {
            device,
            process,
            batch,
            value,
            force,
        } => cmd_count::add(&data_dir, &device, &process, &batch, &value, force),
        Command::Reset { device, process } => cmd_count::reset(&data_dir, &device, &process),
        Command::Clear { device } => cmd_count::clear(&data_dir, &device),
        Command::Undo { device, process } => cmd_count::undo(&data_dir, &device, &process),
        Command::Set { cmd } => cmd_threshold::run(cmd, &data_dir),
        Command::Seed {
            device,
            process,
            value,
        } => cmd_count::seed(&data_dir, &device, &process, &value),
        Command::Status { device, json } => cmd_status::execute(&data_dir, device.as_deref(), json),
        Command::Range { cmd } => cmd_range::run(cmd, &data_dir),
        Command::Log {
            device,
            process,
            limit,
            json,
        } => cmd_log::execute(&cmd_log::LogParams {
            data_dir: &data_dir,
            device: device.as_deref(),
            process: process.as_deref(),
            limit,
            json,
        }),
        Command::Export {
            path,
            format,
            device,
        } => cmd_log::export(&data_dir, &path, format.as_deref(), device.as_deref()),
        Command::Notify { cmd } => cmd_notify::run(cmd, &data_dir),
    }
}
