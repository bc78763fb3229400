//! Command-line argument definitions for the replay tool
//!
//! Defines the CLI interface with the clap derive API.

use crate::error::{BbgError, Result};
use crate::parsers::TableGrouping;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// CLI arguments for the Bloomberg response replay tool
///
/// Replays recorded Bloomberg responses through the normalization engine
/// without a terminal connection.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bbg-replay",
    version,
    about = "Replay recorded Bloomberg responses into Polars DataFrames",
    long_about = "Replays response payloads captured from the Bloomberg API through the same \
                  parsers used for live queries, printing or saving the resulting DataFrames. \
                  Also re-runs recorded BQL parse cases to check the table builder."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress log output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Parse a recorded response file into DataFrames
    Parse(ParseArgs),
    /// Re-run recorded BQL parse cases and compare the tables
    Verify(VerifyArgs),
}

/// Query kinds a recorded response file can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryKind {
    Bdp,
    Bdh,
    Bdib,
    Bql,
    Bsrch,
}

/// How parsed frames are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Polars table rendering
    Table,
    /// CSV on stdout
    Csv,
}

/// BQL table grouping strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupingArg {
    PerField,
    SharedId,
}

impl From<GroupingArg> for TableGrouping {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::PerField => TableGrouping::PerField,
            GroupingArg::SharedId => TableGrouping::SharedId,
        }
    }
}

/// Arguments for the parse command
#[derive(Debug, Clone, Parser)]
pub struct ParseArgs {
    /// Kind of query the responses belong to
    #[arg(short = 'k', long = "kind", value_enum)]
    pub kind: QueryKind,

    /// Recorded responses: a JSON list of payloads or a `responses_*.json`
    /// debug snapshot
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Requested fields (comma-separated), required for bdp and bdh
    #[arg(short = 'f', long = "fields", value_delimiter = ',', value_name = "LIST")]
    pub fields: Vec<String>,

    /// Security used for bdp/bdh requests and as the bdib fallback
    #[arg(short = 's', long = "security", value_name = "TICKER")]
    pub security: Option<String>,

    /// BQL expression or BSRCH domain recorded with the request
    #[arg(long = "query", value_name = "TEXT")]
    pub query: Option<String>,

    /// Start date for bdh requests
    #[arg(long = "start", value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// End date for bdh requests
    #[arg(long = "end", value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,

    /// Print format
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Write the result to a .csv or .parquet file instead of printing it
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Join all BQL tables on their shared columns
    #[arg(long = "combine")]
    pub combine: bool,

    /// BQL table grouping strategy; overrides the config file when given
    #[arg(long = "grouping", value_enum)]
    pub grouping: Option<GroupingArg>,

    /// JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,
}

/// Arguments for the verify command
#[derive(Debug, Clone, Parser)]
pub struct VerifyArgs {
    /// Directory holding `bql_parse_results_*.json` files
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// BQL table grouping strategy the cases were recorded with
    #[arg(long = "grouping", value_enum, default_value = "per-field")]
    pub grouping: GroupingArg,
}

impl Args {
    /// Log level derived from the verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl ParseArgs {
    /// Validate the parse command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(BbgError::Configuration {
                message: format!("Input file does not exist: {}", self.input.display()),
            });
        }

        if matches!(self.kind, QueryKind::Bdp | QueryKind::Bdh) && self.fields.is_empty() {
            return Err(BbgError::Configuration {
                message: "--fields is required for bdp and bdh".to_string(),
            });
        }

        if self.kind == QueryKind::Bdib && self.security.is_none() {
            return Err(BbgError::Configuration {
                message: "--security is required for bdib".to_string(),
            });
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(BbgError::Configuration {
                    message: format!("Start date {} is after end date {}", start, end),
                });
            }
        }

        if let Some(output) = &self.output {
            output_kind(output)?;
        }

        Ok(())
    }

    pub fn field_refs(&self) -> Vec<&str> {
        self.fields.iter().map(String::as_str).collect()
    }
}

/// File formats the parse command can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Csv,
    Parquet,
}

/// Determine the output format from a file extension
pub fn output_kind(path: &Path) -> Result<OutputKind> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("csv") => Ok(OutputKind::Csv),
        Some("parquet") => Ok(OutputKind::Parquet),
        _ => Err(BbgError::Configuration {
            message: format!(
                "Unsupported output file {}: expected .csv or .parquet",
                path.display()
            ),
        }),
    }
}
