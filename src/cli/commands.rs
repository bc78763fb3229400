//! Command implementations for the replay CLI
//!
//! `parse` feeds recorded payloads through [`BQuery`] on a replay session;
//! `verify` re-runs recorded BQL parse cases.

use crate::cli::args::{
    Args, Commands, OutputFormat, OutputKind, ParseArgs, QueryKind, VerifyArgs, output_kind,
};
use crate::config::BQueryConfig;
use crate::debug::{DebugCase, PARSE_CASE_PREFIX};
use crate::diagnostics::TracingSink;
use crate::parsers::TableGrouping;
use crate::query::BQuery;
use crate::request::RequestOptions;
use crate::session::ReplaySession;
use anyhow::{Context, Result, bail};
use chrono::Local;
use colored::*;
use polars::prelude::*;
use serde_json::Value;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Summary of a verify run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyStats {
    pub cases: usize,
    pub passed: usize,
    pub failed: usize,
    pub unreadable: usize,
}

/// Main command runner
pub fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Commands::Parse(parse_args) => run_parse(parse_args),
        Commands::Verify(verify_args) => {
            let stats = run_verify(verify_args)?;
            print_verify_summary(&stats);
            if stats.failed > 0 || stats.unreadable > 0 {
                bail!(
                    "{} of {} debug cases did not verify",
                    stats.failed + stats.unreadable,
                    stats.cases
                );
            }
            Ok(())
        }
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bbg_polars={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load the recorded payloads from a plain JSON list or a debug snapshot
pub fn load_payloads(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;

    match document {
        Value::Array(payloads) => Ok(payloads),
        Value::Object(mut snapshot) => match snapshot.remove("responses") {
            Some(Value::Array(payloads)) => Ok(payloads),
            _ => bail!(
                "{} is not a response snapshot: missing 'responses' list",
                path.display()
            ),
        },
        _ => bail!("{} must hold a JSON list of payloads", path.display()),
    }
}

fn load_config(args: &ParseArgs) -> Result<BQueryConfig> {
    let config = match &args.config_file {
        Some(path) => BQueryConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BQueryConfig::default(),
    };
    Ok(match args.grouping {
        Some(grouping) => config.with_grouping(grouping.into()),
        None => config,
    })
}

/// Replay a response file and print or write the resulting frames
pub fn run_parse(args: &ParseArgs) -> Result<()> {
    args.validate()?;
    let payloads = load_payloads(&args.input)?;
    info!(
        "Replaying {} payloads from {}",
        payloads.len(),
        args.input.display()
    );

    let config = load_config(args)?;
    let mut bq = BQuery::new(ReplaySession::from_payloads(payloads), config)?;
    bq.connect()?;

    let frames = parse_frames(&mut bq, args)?;
    for (name, mut frame) in frames {
        match &args.output {
            Some(output) => {
                let path = output_path_for(output, name.as_deref());
                write_frame(&mut frame, &path)?;
                info!("Wrote {} rows to {}", frame.height(), path.display());
            }
            None => print_frame(name.as_deref(), &mut frame, args.format)?,
        }
    }
    Ok(())
}

/// Run the query matching `args.kind`; BQL tables keep their names
fn parse_frames(
    bq: &mut BQuery<ReplaySession>,
    args: &ParseArgs,
) -> Result<Vec<(Option<String>, DataFrame)>> {
    let fields = args.field_refs();
    let security = args.security.as_deref().unwrap_or_default();
    let securities: Vec<&str> = args.security.as_deref().into_iter().collect();
    let query = args.query.as_deref().unwrap_or_default();
    let options = RequestOptions::new();
    let today = Local::now().date_naive();

    let frame = match args.kind {
        QueryKind::Bdp => bq.bdp(&securities, &fields, &options)?,
        QueryKind::Bdh => bq.bdh(
            &securities,
            &fields,
            args.start.unwrap_or(today),
            args.end.unwrap_or(today),
            &options,
        )?,
        QueryKind::Bdib => {
            let now = Local::now().naive_local();
            bq.bdib(security, "TRADE", 1, now, now, &options)?
        }
        QueryKind::Bsrch => bq.bsrch(query, &options)?,
        QueryKind::Bql => {
            let result = bq.bql(query)?;
            if args.combine {
                return Ok(vec![(None, result.combine()?)]);
            }
            return Ok(result
                .iter()
                .map(|(name, frame)| (Some(name.to_string()), frame.clone()))
                .collect());
        }
    };
    Ok(vec![(None, frame)])
}

/// Named BQL tables get their name appended to the file stem
fn output_path_for(output: &Path, name: Option<&str>) -> PathBuf {
    let Some(name) = name else {
        return output.to_path_buf();
    };
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match output.extension() {
        Some(ext) => format!("{}_{}.{}", stem, name, ext.to_string_lossy()),
        None => format!("{}_{}", stem, name),
    };
    output.with_file_name(file_name)
}

/// Write a frame as CSV or Parquet depending on the file extension
pub fn write_frame(frame: &mut DataFrame, path: &Path) -> Result<()> {
    let kind = output_kind(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    match kind {
        OutputKind::Csv => {
            CsvWriter::new(file)
                .include_header(true)
                .finish(frame)
                .with_context(|| format!("Failed to write CSV {}", path.display()))?;
        }
        OutputKind::Parquet => {
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(frame)
                .with_context(|| format!("Failed to write Parquet {}", path.display()))?;
        }
    }
    Ok(())
}

fn print_frame(name: Option<&str>, frame: &mut DataFrame, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if let Some(name) = name {
                println!("{}", name.bold());
            }
            println!("{}", frame);
        }
        OutputFormat::Csv => {
            if let Some(name) = name {
                println!("# {}", name);
            }
            CsvWriter::new(io::stdout())
                .include_header(true)
                .finish(frame)
                .context("Failed to write CSV to stdout")?;
        }
    }
    Ok(())
}

/// Re-run every parse case in a directory
pub fn run_verify(args: &VerifyArgs) -> Result<VerifyStats> {
    if !args.dir.is_dir() {
        bail!("Not a directory: {}", args.dir.display());
    }

    let pattern = args
        .dir
        .join(format!("{}*.json", PARSE_CASE_PREFIX))
        .to_string_lossy()
        .to_string();
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .context("Invalid debug case pattern")?
        .filter_map(|entry| entry.ok())
        .collect();
    paths.sort();

    let grouping: TableGrouping = args.grouping.into();
    let sink = TracingSink;
    let mut stats = VerifyStats::default();

    for path in &paths {
        stats.cases += 1;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let case = match DebugCase::load(path) {
            Ok(case) => case,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                println!("{} {} ({})", "ERROR".red().bold(), file_name, e);
                stats.unreadable += 1;
                continue;
            }
        };

        let outcome = case.verify(grouping, &sink);
        if outcome.passed() {
            println!("{} {}", "PASS".green().bold(), file_name);
            stats.passed += 1;
        } else {
            println!(
                "{} {} (expected {} tables, rebuilt {}; mismatched: {})",
                "FAIL".red().bold(),
                file_name,
                outcome.expected,
                outcome.rebuilt,
                outcome.mismatched.join(", ")
            );
            stats.failed += 1;
        }
    }

    Ok(stats)
}

fn print_verify_summary(stats: &VerifyStats) {
    println!();
    if stats.cases == 0 {
        println!("{}", "No debug cases found".yellow());
        return;
    }
    let summary = format!(
        "{} cases: {} passed, {} failed, {} unreadable",
        stats.cases, stats.passed, stats.failed, stats.unreadable
    );
    if stats.failed == 0 && stats.unreadable == 0 {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_payloads_accepts_list_and_snapshot() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("list.json");
        fs::write(&list, r#"[{"a": 1}, {"b": 2}]"#).unwrap();
        assert_eq!(load_payloads(&list).unwrap().len(), 2);

        let snapshot = dir.path().join("responses_1.json");
        fs::write(
            &snapshot,
            json!({"request": {}, "responses": [{"a": 1}]}).to_string(),
        )
        .unwrap();
        assert_eq!(load_payloads(&snapshot).unwrap(), vec![json!({"a": 1})]);
    }

    #[test]
    fn test_load_payloads_rejects_scalars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "42").unwrap();
        assert!(load_payloads(&path).is_err());
    }

    #[test]
    fn test_output_path_for_named_tables() {
        let output = Path::new("out/result.parquet");
        assert_eq!(output_path_for(output, None), PathBuf::from("out/result.parquet"));
        assert_eq!(
            output_path_for(output, Some("px_last")),
            PathBuf::from("out/result_px_last.parquet")
        );
    }

    #[test]
    fn test_write_frame_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("frame.csv");
        let mut df = df!("ID" => ["A", "B"], "px" => [1.5, 2.5]).unwrap();

        write_frame(&mut df, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("ID,px"));
        assert_eq!(written.lines().count(), 3);
    }

    fn parse_args_with(extra: &[&str]) -> ParseArgs {
        let mut argv = vec!["bbg-replay", "parse", "--kind", "bql", "responses.json"];
        argv.extend_from_slice(extra);
        match Args::parse_from(argv).command {
            Commands::Parse(parse) => parse,
            other => panic!("expected parse command, got {other:?}"),
        }
    }

    #[test]
    fn test_load_config_keeps_file_grouping() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{"grouping": "shared_id"}"#).unwrap();

        let args = parse_args_with(&["--config", config_path.to_str().unwrap()]);
        assert_eq!(load_config(&args).unwrap().grouping, TableGrouping::SharedId);
    }

    #[test]
    fn test_grouping_flag_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{"grouping": "shared_id"}"#).unwrap();

        let args = parse_args_with(&[
            "--config",
            config_path.to_str().unwrap(),
            "--grouping",
            "per-field",
        ]);
        assert_eq!(load_config(&args).unwrap().grouping, TableGrouping::PerField);
        assert_eq!(
            load_config(&parse_args_with(&[])).unwrap().grouping,
            TableGrouping::PerField
        );
    }

    #[test]
    fn test_verify_empty_directory() {
        let dir = TempDir::new().unwrap();
        let args = VerifyArgs {
            dir: dir.path().to_path_buf(),
            grouping: crate::cli::args::GroupingArg::PerField,
        };
        assert_eq!(run_verify(&args).unwrap(), VerifyStats::default());
    }
}
