use std::path::Path;
use tally_store::{write_atomic, TallyPaths};

pub fn execute(data_dir: &Path) -> anyhow::Result<()> {
    let paths = TallyPaths::discover(data_dir);

    if paths.is_initialized() {
        println!("Already initialized at {}", paths.root.display());
        return Ok(());
    }

    paths.ensure_layout()?;

    if !paths.config_json.exists() {
        let default_config = serde_json::json!({ "notify_channels": [] });
        let json = serde_json::to_string_pretty(&default_config)?;
        write_atomic(&paths.config_json, json.as_bytes())?;
    }

    println!("Initialized tally data directory at {}", paths.root.display());
    println!();
    println!("Next steps:");
    println!("  tally device add <device>");
    println!("  tally process add <device> <process>");
    Ok(())
}
