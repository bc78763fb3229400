//! Response parsers
//!
//! Each submodule flattens one kind of vendor response. The functions in this
//! module chain a parser with frame construction for [`crate::BQuery`].

pub mod bql;
pub mod extract;
pub mod intraday;
pub mod reference;
pub mod search;

#[cfg(test)]
mod tests;

pub use bql::{TableGrouping, parse_bql_responses, parse_result};
pub use extract::{decode_payload, extract_results, normalize_quotes};
pub use intraday::parse_bdib_responses;
pub use reference::{parse_bdh_responses, parse_bdp_responses};
pub use search::{coerce_numeric_columns, extract_field_value, parse_bsrch_responses};

use crate::constants::{DATE_COLUMN, TIME_COLUMN};
use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::frame::rows_to_frame;
use crate::models::Temporal;
use polars::prelude::*;
use serde_json::Value;

/// Reference data frame: `security` plus one column per requested field
pub fn reference_frame(
    responses: &[Value],
    fields: &[&str],
    sink: &dyn DiagnosticSink,
) -> Result<DataFrame> {
    rows_to_frame(&parse_bdp_responses(responses, fields, sink), &[])
}

/// Historical frame: `security`, `date` (typed Date) and the requested fields
pub fn history_frame(responses: &[Value], fields: &[&str]) -> Result<DataFrame> {
    rows_to_frame(
        &parse_bdh_responses(responses, fields),
        &[(DATE_COLUMN, Temporal::Date)],
    )
}

/// Intraday bar frame sorted by `time` ascending; ties keep arrival order
pub fn intraday_frame(responses: &[Value], fallback_security: &str) -> Result<DataFrame> {
    let df = rows_to_frame(
        &parse_bdib_responses(responses, fallback_security),
        &[(TIME_COLUMN, Temporal::Datetime)],
    )?;

    if df.get_column_index(TIME_COLUMN).is_none() {
        return Ok(df);
    }
    Ok(df.sort(
        [TIME_COLUMN],
        SortMultipleOptions::default().with_maintain_order(true),
    )?)
}

/// Search grid frame
pub fn search_frame(responses: &[Value], sink: &dyn DiagnosticSink) -> Result<DataFrame> {
    rows_to_frame(&parse_bsrch_responses(responses, sink)?, &[])
}
