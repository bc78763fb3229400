//! Bloomberg Polars Library
//!
//! Normalizes Bloomberg API responses into Polars DataFrames.
//!
//! This library provides tools for:
//! - Reference (BDP), historical (BDH) and intraday bar (BDIB) queries
//! - BQL queries returned as named tables that can be joined on their IDs
//! - Saved-search (BSRCH) grids with wrapped field values unwrapped
//! - Lenient type mapping and coercion of loosely typed payloads
//! - Replaying recorded responses and debug snapshots without a terminal

pub mod config;
pub mod constants;
pub mod debug;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod models;
pub mod parsers;
pub mod query;
pub mod request;
pub mod result;
pub mod schema;
pub mod session;

// CLI modules
pub mod cli;

// Re-export commonly used types
pub use config::BQueryConfig;
pub use diagnostics::{DiagnosticSink, MemorySink, TracingSink};
pub use error::{BbgError, Result};
pub use models::{ColumnType, Row, SITable, Scalar};
pub use parsers::TableGrouping;
pub use query::BQuery;
pub use request::{Request, RequestOptions};
pub use result::BqlResult;
pub use session::{ReplaySession, Session};
