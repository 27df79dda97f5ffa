use clap::Subcommand;
use std::path::Path;
use tally_notify::NotifyConfig;
use tally_store::TallyPaths;

#[derive(Subcommand)]
pub enum NotifyCmd {
    /// Send test notification to all configured channels
    Test,
    /// Show configured notification channels
    Status,
}

pub fn run(cmd: NotifyCmd, data_dir: &Path) -> anyhow::Result<()> {
    let paths = TallyPaths::discover(data_dir);
    let config = NotifyConfig::load(&paths);

    match cmd {
        NotifyCmd::Test => run_test(&paths, &config),
        NotifyCmd::Status => run_status(&config),
    }
}

fn run_test(paths: &TallyPaths, config: &NotifyConfig) -> anyhow::Result<()> {
    if config.channels.is_empty() {
        println!("No notification channels configured.");
        println!();
        println!(
            "Add channels in {} under \"notify_channels\", e.g.:",
            paths.config_json.display()
        );
        println!(
            "  {{\"notify_channels\": [{{\"type\":\"ntfy\",\"url\":\"https://ntfy.sh/my-topic\",\"events\":[\"*\"]}}]}}"
        );
        return Ok(());
    }

    println!(
        "Sending test notification to {} channel(s)...",
        config.channels.len()
    );
    let results = tally_notify::test_channels(config);
    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(()) => println!("  OK  {name}"),
            Err(e) => {
                failed += 1;
                println!("  ERR {name}: {e}");
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} channel(s) failed");
    }
    Ok(())
}

fn run_status(config: &NotifyConfig) -> anyhow::Result<()> {
    if config.channels.is_empty() {
        println!("No notification channels configured.");
        return Ok(());
    }

    println!("{} channel(s) configured:", config.channels.len());
    for ch in &config.channels {
        println!("  - {} ({})", ch.display_name(), ch.events().join(", "));
    }
    Ok(())
}
