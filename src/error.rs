//! Error handling for Bloomberg query operations.
//!
//! Fatal conditions (connection, timeout, protocol response errors, search
//! domain errors, combine failures) surface as [`BbgError`]. Recoverable
//! problems such as BQL exception sets or malformed embedded JSON never reach
//! this type; they are reported through a diagnostic sink instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BbgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Connection { message: String },

    #[error("Request timed out after {timeout_ms} milliseconds")]
    Timeout { timeout_ms: u64 },

    #[error("Response error: {message}")]
    Response { message: String },

    #[error("BSRCH error: {message}")]
    Search { message: String },

    #[error("No DataFrames to combine.")]
    NothingToCombine,

    #[error("No common columns found to join on.")]
    NoCommonColumns,

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid debug case in file: {path} - {reason}")]
    InvalidDebugCase { path: PathBuf, reason: String },
}

impl BbgError {
    /// Session could not be started
    pub fn session_start() -> Self {
        Self::Connection {
            message: "Failed to start Bloomberg session.".to_string(),
        }
    }

    /// A logical service could not be opened
    pub fn service_open(service: &str) -> Self {
        Self::Connection {
            message: format!("Failed to open service {}.", service),
        }
    }
}

pub type Result<T> = std::result::Result<T, BbgError>;
