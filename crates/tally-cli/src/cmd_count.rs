use crate::workspace::Workspace;
use std::path::Path;
use tally_core::input::{parse_number, InputError};
use tally_store::{Action, ActivityEntry};

/// `tally add <device> <process> <batch> <value>`
pub fn add(
    data_dir: &Path,
    device: &str,
    process: &str,
    batch: &str,
    raw_value: &str,
    force: bool,
) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    let (key, mut engine) = ws.engine(device, process)?;

    let batch = batch.trim();
    if batch.is_empty() {
        anyhow::bail!("Batch label must not be empty");
    }
    if engine.is_over_upper() {
        anyhow::bail!(
            "'{key}' is over its upper limit ({}/{}). Reset it before adding more.",
            engine.format(engine.total()),
            engine.format(engine.thresholds().upper_limit)
        );
    }

    let mode = engine.input_mode();
    let range = ws.store.load_range(device);
    let value = range
        .parse_value(mode, raw_value)
        .map_err(|e| anyhow::anyhow!("{e} (allowed: {})", range.describe(mode)))?;

    if !force && engine.would_exceed_upper(value) {
        anyhow::bail!(
            "Adding {} would take '{key}' to {}, above its upper limit {}. Pass --force to record it anyway.",
            engine.format(value),
            engine.format(engine.total() + value),
            engine.format(engine.thresholds().upper_limit)
        );
    }

    let total = engine.add_contribution(batch, value);
    let shown = engine.format(value);
    println!("{key}: +{shown} ({batch}) -> {}", engine.format(total));
    ws.commit(&key, &mut engine, Action::Add, &shown, Some(batch))?;
    Ok(())
}

/// `tally reset <device> <process>`
pub fn reset(data_dir: &Path, device: &str, process: &str) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    let (key, mut engine) = ws.engine(device, process)?;
    let Some(prior) = engine.reset() else {
        println!("'{key}' is already at 0, nothing to reset");
        return Ok(());
    };
    let shown = engine.format(prior);
    println!("{key}: reset (was {shown})");
    ws.commit(&key, &mut engine, Action::Reset, &shown, None)?;
    Ok(())
}

/// `tally clear <device>`: reset every non-zero process of a device.
pub fn clear(data_dir: &Path, device: &str) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    ws.require_device(device)?;

    let mut cleared = Vec::new();
    for process in ws.store.list_processes(device)? {
        let (key, mut engine) = ws.engine(device, &process)?;
        let Some(prior) = engine.reset() else {
            continue;
        };
        let shown = engine.format(prior);
        println!("{key}: reset (was {shown})");
        ws.commit(&key, &mut engine, Action::Reset, &shown, None)?;
        cleared.push(process);
    }

    if cleared.is_empty() {
        println!("Nothing to clear on '{device}'");
        return Ok(());
    }
    ws.record(&ActivityEntry::for_device(
        device,
        Action::ClearDevice,
        cleared.join(","),
    ));
    println!("Cleared {} process(es) on '{device}'", cleared.len());
    Ok(())
}

/// `tally undo <device> <process>`
pub fn undo(data_dir: &Path, device: &str, process: &str) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    let (key, mut engine) = ws.engine(device, process)?;
    let Some(undone) = engine.undo() else {
        println!("Nothing to undo on '{key}'");
        return Ok(());
    };
    let shown = format!("{} {}", undone.kind, engine.format(undone.value));
    println!(
        "{key}: undid {shown} -> {} ({} more)",
        engine.format(engine.total()),
        engine.undo_depth()
    );
    ws.commit(&key, &mut engine, Action::Undo, &shown, None)?;
    Ok(())
}

/// `tally seed <device> <process> <value>`
pub fn seed(data_dir: &Path, device: &str, process: &str, raw_value: &str) -> anyhow::Result<()> {
    let ws = Workspace::open(data_dir)?;
    let (key, mut engine) = ws.engine(device, process)?;
    let value = parse_number(engine.input_mode(), raw_value)?;
    if value < 0.0 {
        return Err(InputError::Negative(value).into());
    }
    let prior = engine.seed(value);
    let shown = engine.format(value);
    println!("{key}: seeded with {shown} (was {})", engine.format(prior));
    ws.commit(&key, &mut engine, Action::Seed, &shown, Some(tally_core::SEED_LABEL))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::tests::setup;
    use tally_core::{Engine, Status};
    use tally_store::{list_activity, EngineStore, ProcessKey};

    fn load(tmp: &tempfile::TempDir) -> Engine {
        let store = EngineStore::open(tmp.path()).unwrap();
        store.load(&ProcessKey::new("D1", "etch").unwrap())
    }

    fn set_limits(tmp: &tempfile::TempDir, lower: f64, target: f64, upper: f64) {
        let store = EngineStore::open(tmp.path()).unwrap();
        let key = ProcessKey::new("D1", "etch").unwrap();
        let mut engine = store.load(&key);
        engine.set_lower_limit(lower);
        engine.set_target(target);
        engine.set_upper_limit(upper);
        store.try_save(&key, &engine).unwrap();
    }

    #[test]
    fn add_validates_against_device_range() {
        let tmp = setup();
        add(tmp.path(), "D1", "etch", "B1", "12", false).unwrap();
        assert!(add(tmp.path(), "D1", "etch", "B2", "51", false).is_err());
        assert!(add(tmp.path(), "D1", "etch", "B2", "1.5", false).is_err());
        assert!(add(tmp.path(), "D1", "etch", " ", "3", false).is_err());

        let engine = load(&tmp);
        assert_eq!(engine.total(), 12.0);
        assert_eq!(engine.contributions().len(), 1);
    }

    #[test]
    fn add_refuses_to_cross_upper_without_force() {
        let tmp = setup();
        set_limits(&tmp, 0.0, 20.0, 30.0);
        add(tmp.path(), "D1", "etch", "B1", "25", false).unwrap();
        assert!(add(tmp.path(), "D1", "etch", "B2", "10", false).is_err());
        add(tmp.path(), "D1", "etch", "B2", "10", true).unwrap();

        let engine = load(&tmp);
        assert_eq!(engine.total(), 35.0);
        assert_eq!(engine.status(), Status::OverUpper);

        // Over the limit: no more additions, forced or not.
        assert!(add(tmp.path(), "D1", "etch", "B3", "1", true).is_err());
    }

    #[test]
    fn reset_then_undo_across_invocations() {
        let tmp = setup();
        add(tmp.path(), "D1", "etch", "B1", "10", false).unwrap();
        add(tmp.path(), "D1", "etch", "B2", "5", false).unwrap();
        reset(tmp.path(), "D1", "etch").unwrap();
        assert_eq!(load(&tmp).total(), 0.0);

        // A second reset is a no-op and pushes nothing.
        reset(tmp.path(), "D1", "etch").unwrap();
        assert_eq!(load(&tmp).undo_depth(), 3);

        undo(tmp.path(), "D1", "etch").unwrap();
        assert_eq!(load(&tmp).total(), 15.0);
        undo(tmp.path(), "D1", "etch").unwrap();
        assert_eq!(load(&tmp).total(), 10.0);
    }

    #[test]
    fn reminder_latch_is_persisted() {
        let tmp = setup();
        set_limits(&tmp, 10.0, 20.0, 30.0);
        add(tmp.path(), "D1", "etch", "B1", "5", false).unwrap();
        assert!(!load(&tmp).is_reminded());
        add(tmp.path(), "D1", "etch", "B2", "6", false).unwrap();
        assert!(load(&tmp).is_reminded());
    }

    #[test]
    fn clear_resets_only_non_zero_processes() {
        let tmp = setup();
        crate::cmd_process::add(tmp.path(), "D1", "rinse", tally_core::InputMode::Integer).unwrap();
        add(tmp.path(), "D1", "etch", "B1", "7", false).unwrap();
        clear(tmp.path(), "D1").unwrap();

        assert_eq!(load(&tmp).total(), 0.0);
        let store = EngineStore::open(tmp.path()).unwrap();
        let log = list_activity(&store.paths).unwrap();
        let last = log.last().unwrap();
        assert_eq!(last.action, Action::ClearDevice);
        assert_eq!(last.value, "etch");
    }

    #[test]
    fn seed_replaces_ledger_and_undoes_in_two_steps() {
        let tmp = setup();
        add(tmp.path(), "D1", "etch", "B1", "4", false).unwrap();
        seed(tmp.path(), "D1", "etch", "200").unwrap();

        let engine = load(&tmp);
        assert_eq!(engine.total(), 200.0);
        assert_eq!(engine.contributions()[0].batch_label, tally_core::SEED_LABEL);
        assert!(seed(tmp.path(), "D1", "etch", "-1").is_err());

        undo(tmp.path(), "D1", "etch").unwrap();
        undo(tmp.path(), "D1", "etch").unwrap();
        assert_eq!(load(&tmp).total(), 4.0);
    }

    #[test]
    fn undo_on_fresh_process_is_a_no_op() {
        let tmp = setup();
        undo(tmp.path(), "D1", "etch").unwrap();
        let store = EngineStore::open(tmp.path()).unwrap();
        assert!(list_activity(&store.paths).unwrap().is_empty());
    }
}
