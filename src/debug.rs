//! Debug snapshots of raw responses and BQL parse cases.
//!
//! When debug mode is on, every request's responses are written to
//! `responses_<timestamp>.json` and every BQL parse to
//! `bql_parse_results_<timestamp>.json`. Parse cases can be loaded back and
//! re-run to check the table builder against a recorded outcome.

use crate::diagnostics::DiagnosticSink;
use crate::error::{BbgError, Result};
use crate::models::SITable;
use crate::parsers::{TableGrouping, parse_result};
use crate::request::Request;
use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of response snapshot files
pub const RESPONSES_PREFIX: &str = "responses_";

/// Prefix of BQL parse case files
pub const PARSE_CASE_PREFIX: &str = "bql_parse_results_";

/// Writes debug snapshots into one directory
#[derive(Debug, Clone)]
pub struct DebugRecorder {
    dir: PathBuf,
}

impl DebugRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a request together with every payload it produced
    pub fn save_responses(&self, request: &Request, responses: &[Value]) -> Result<PathBuf> {
        let snapshot = json!({
            "request": request,
            "responses": responses,
        });
        self.write(RESPONSES_PREFIX, &snapshot)
    }

    /// Save the `results` objects of a BQL response and the tables built
    /// from them
    pub fn save_case(&self, results: &[Map<String, Value>], tables: &[SITable]) -> Result<PathBuf> {
        let case = DebugCase {
            in_results: results.to_vec(),
            out_tables: tables.iter().map(RecordedTable::from).collect(),
        };
        self.write(PARSE_CASE_PREFIX, &case)
    }

    fn write<T: Serialize>(&self, prefix: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%6f");
        let path = self.dir.join(format!("{}{}.json", prefix, timestamp));

        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, value)?;
        debug!("Wrote debug snapshot {}", path.display());
        Ok(path)
    }
}

/// A table as written to a parse case file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedTable {
    pub name: String,
    pub data: Value,
    pub schema: Value,
}

impl From<&SITable> for RecordedTable {
    fn from(table: &SITable) -> Self {
        Self {
            name: table.name.clone(),
            data: table.data_json(),
            schema: table.schema_json(),
        }
    }
}

/// A recorded BQL parse: input `results` objects and the tables they produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugCase {
    /// A single recorded object is accepted as a one-element list
    #[serde(deserialize_with = "one_or_many")]
    pub in_results: Vec<Map<String, Value>>,
    pub out_tables: Vec<RecordedTable>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Map<String, Value>),
    Many(Vec<Map<String, Value>>),
}

fn one_or_many<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<Map<String, Value>>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(results) => vec![results],
        OneOrMany::Many(results) => results,
    })
}

/// Outcome of re-running a recorded parse case
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub expected: usize,
    pub rebuilt: usize,
    /// Names of tables whose rebuilt content differs, in recorded order
    pub mismatched: Vec<String>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.expected == self.rebuilt && self.mismatched.is_empty()
    }
}

impl DebugCase {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| BbgError::InvalidDebugCase {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Rebuild the tables from `in_results` and compare them to `out_tables`
    pub fn verify(&self, grouping: TableGrouping, sink: &dyn DiagnosticSink) -> CaseOutcome {
        let rebuilt: Vec<RecordedTable> = self
            .in_results
            .iter()
            .flat_map(|results| parse_result(results, grouping, sink))
            .map(|table| RecordedTable::from(&table))
            .collect();

        let mismatched = self
            .out_tables
            .iter()
            .enumerate()
            .filter(|(index, expected)| rebuilt.get(*index) != Some(*expected))
            .map(|(_, expected)| expected.name.clone())
            .collect();

        CaseOutcome {
            expected: self.out_tables.len(),
            rebuilt: rebuilt.len(),
            mismatched,
        }
    }
}
