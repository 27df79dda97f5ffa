use serde::Serialize;
use std::path::Path;
use tally_core::format::format_number;
use tally_store::{list_activity, write_atomic, ActivityEntry, TallyPaths};

pub struct LogParams<'a> {
    pub data_dir: &'a Path,
    pub device: Option<&'a str>,
    pub process: Option<&'a str>,
    pub limit: usize,
    pub json: bool,
}

fn open_paths(data_dir: &Path) -> anyhow::Result<TallyPaths> {
    let paths = TallyPaths::discover(data_dir);
    if !paths.is_initialized() {
        anyhow::bail!(
            "No tally data directory at {}. Run `tally init` first.",
            paths.root.display()
        );
    }
    Ok(paths)
}

fn matches(entry: &ActivityEntry, device: Option<&str>, process: Option<&str>) -> bool {
    if let Some(d) = device {
        if entry.device_id != d {
            return false;
        }
    }
    if let Some(p) = process {
        if entry.process_type.as_deref() != Some(p) {
            return false;
        }
    }
    true
}

pub fn execute(params: &LogParams<'_>) -> anyhow::Result<()> {
    let paths = open_paths(params.data_dir)?;
    let entries = list_activity(&paths)?;

    let mut matched: Vec<&ActivityEntry> = entries
        .iter()
        .rev() // newest first
        .filter(|e| matches(e, params.device, params.process))
        .collect();

    if params.limit > 0 {
        matched.truncate(params.limit);
    }

    if matched.is_empty() {
        println!("No activity matches the filter.");
        return Ok(());
    }

    if params.json {
        for e in &matched {
            println!("{}", serde_json::to_string(e)?);
        }
    } else {
        for e in &matched {
            println!("{}", format_line(e));
        }
        println!("\n({} entries shown)", matched.len());
    }
    Ok(())
}

fn format_line(e: &ActivityEntry) -> String {
    let subject = match &e.process_type {
        Some(p) => format!("{}/{p}", e.device_id),
        None => e.device_id.clone(),
    };
    let mut line = format!("{}  {subject:<24} {:<16}", e.timestamp, e.action.to_string());
    if let Some(batch) = &e.batch_label {
        line.push_str(&format!(" [{batch}]"));
    }
    if !e.value.is_empty() {
        line.push_str(&format!(" {}", e.value));
    }
    if let (Some(total), Some(target)) = (e.total, e.target) {
        line.push_str(&format!(
            "  total={} target={}",
            format_number(total),
            format_number(target)
        ));
    }
    line
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Csv,
    Json,
    Txt,
}

/// Explicit `--format` wins; otherwise the extension decides, and a path
/// without one gets CSV.
fn resolve_format(path: &Path, format: Option<&str>) -> anyhow::Result<ExportFormat> {
    let name = match format {
        Some(f) => f.to_ascii_lowercase(),
        None => match path.extension() {
            None => return Ok(ExportFormat::Csv),
            Some(ext) => ext.to_string_lossy().to_ascii_lowercase(),
        },
    };
    match name.as_str() {
        "csv" => Ok(ExportFormat::Csv),
        "json" => Ok(ExportFormat::Json),
        "txt" | "log" => Ok(ExportFormat::Txt),
        other => anyhow::bail!(
            "Unknown export format '{other}' (expected csv, json or txt; pass --format to override)"
        ),
    }
}

const CSV_HEADER: [&str; 11] = [
    "time",
    "device",
    "process",
    "action",
    "batch",
    "value",
    "total",
    "target",
    "lower_limit",
    "upper_limit",
    "input_mode",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    time: &'a str,
    device: &'a str,
    process: &'a str,
    action: String,
    batch: &'a str,
    value: &'a str,
    total: String,
    target: String,
    lower_limit: String,
    upper_limit: String,
    input_mode: &'a str,
}

impl<'a> CsvRow<'a> {
    fn new(e: &'a ActivityEntry) -> Self {
        let number = |v: Option<f64>| v.map(format_number).unwrap_or_default();
        Self {
            time: &e.timestamp,
            device: &e.device_id,
            process: e.process_type.as_deref().unwrap_or(""),
            action: e.action.to_string(),
            batch: e.batch_label.as_deref().unwrap_or(""),
            value: &e.value,
            total: number(e.total),
            target: number(e.target),
            lower_limit: number(e.lower_limit),
            upper_limit: number(e.upper_limit),
            input_mode: e.input_mode.map(|m| m.as_str()).unwrap_or(""),
        }
    }
}

fn to_csv(entries: &[ActivityEntry]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;
    for e in entries {
        wtr.serialize(CsvRow::new(e))?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("cannot finish CSV output: {}", e.error()))
}

/// `tally export <path>`: write the activity log, oldest first.
pub fn export(
    data_dir: &Path,
    path: &Path,
    format: Option<&str>,
    device: Option<&str>,
) -> anyhow::Result<()> {
    let paths = open_paths(data_dir)?;
    let format = resolve_format(path, format)?;
    let entries: Vec<ActivityEntry> = list_activity(&paths)?
        .into_iter()
        .filter(|e| matches(e, device, None))
        .collect();

    let body = match format {
        ExportFormat::Csv => to_csv(&entries)?,
        ExportFormat::Json => serde_json::to_string_pretty(&entries)?.into_bytes(),
        ExportFormat::Txt => {
            let mut out = String::new();
            for e in &entries {
                out.push_str(&format_line(e));
                out.push('\n');
            }
            out.into_bytes()
        }
    };
    write_atomic(path, &body)?;
    println!("Exported {} entries to {}", entries.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::tests::setup;

    #[test]
    fn export_json_round_trips_entries() {
        let tmp = setup();
        crate::cmd_count::add(tmp.path(), "D1", "etch", "B1", "3", false).unwrap();
        crate::cmd_device::add(tmp.path(), "D2").unwrap();

        let out = tmp.path().join("out.json");
        export(tmp.path(), &out, None, Some("D1")).unwrap();
        let entries: Vec<ActivityEntry> =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].batch_label.as_deref(), Some("B1"));
    }

    #[test]
    fn export_txt_has_one_line_per_entry() {
        let tmp = setup();
        crate::cmd_count::add(tmp.path(), "D1", "etch", "B1", "3", false).unwrap();
        crate::cmd_count::reset(tmp.path(), "D1", "etch").unwrap();

        let out = tmp.path().join("activity.txt");
        export(tmp.path(), &out, None, None).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("D1/etch"));
        assert!(lines[0].contains("[B1]"));
        assert!(lines[1].contains("reset"));
    }

    #[test]
    fn export_csv_has_header_and_one_row_per_entry() {
        let tmp = setup();
        crate::cmd_count::add(tmp.path(), "D1", "etch", "B1", "3", false).unwrap();
        crate::cmd_count::add(tmp.path(), "D1", "etch", "B2", "12", false).unwrap();
        crate::cmd_device::add(tmp.path(), "D2").unwrap();

        let out = tmp.path().join("activity.csv");
        export(tmp.path(), &out, None, None).unwrap();

        let mut rdr = csv::Reader::from_path(&out).unwrap();
        let header: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, CSV_HEADER);
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][1], "D1");
        assert_eq!(&rows[1][2], "etch");
        assert_eq!(&rows[1][3], "add");
        assert_eq!(&rows[1][4], "B2");
        assert_eq!(&rows[1][5], "12");
        assert_eq!(&rows[1][6], "15");
        assert_eq!(&rows[1][10], "integer");
        assert_eq!(&rows[2][1], "D2");
        assert_eq!(&rows[2][2], "");
        assert_eq!(&rows[2][6], "");
    }

    #[test]
    fn export_survives_a_torn_log_line() {
        let tmp = setup();
        crate::cmd_count::add(tmp.path(), "D1", "etch", "B1", "3", false).unwrap();
        let paths = TallyPaths::discover(tmp.path());
        let mut log = std::fs::read_to_string(&paths.activity_jsonl).unwrap();
        log.push_str("{\"entry_id\":\"act_x\",\"times");
        std::fs::write(&paths.activity_jsonl, log).unwrap();

        let out = tmp.path().join("out.json");
        export(tmp.path(), &out, None, None).unwrap();
        let entries: Vec<ActivityEntry> =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn format_is_explicit_or_inferred() {
        let p = Path::new("x.json");
        assert_eq!(resolve_format(p, None).unwrap(), ExportFormat::Json);
        assert_eq!(resolve_format(p, Some("txt")).unwrap(), ExportFormat::Txt);
        assert_eq!(resolve_format(p, Some("CSV")).unwrap(), ExportFormat::Csv);
        assert_eq!(resolve_format(Path::new("x.csv"), None).unwrap(), ExportFormat::Csv);
        assert_eq!(resolve_format(Path::new("export"), None).unwrap(), ExportFormat::Csv);
        assert!(resolve_format(Path::new("x.xlsx"), None).is_err());
        assert!(resolve_format(p, Some("yaml")).is_err());
    }

    #[test]
    fn log_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        let params = LogParams {
            data_dir: &tmp.path().join("missing"),
            device: None,
            process: None,
            limit: 0,
            json: false,
        };
        assert!(execute(&params).is_err());
    }
}
