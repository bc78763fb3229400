//! Reference (BDP) and historical (BDH) response flatteners.

use crate::constants::{DATE_COLUMN, SECURITY_COLUMN};
use crate::diagnostics::DiagnosticSink;
use crate::models::Row;
use serde_json::Value;
use tracing::debug;

/// Flatten `ReferenceDataResponse` messages into one row per security.
///
/// Columns are `security` followed by the requested fields in request
/// order; fields the response does not carry are null. Securities reported
/// with a `securityError` still get a row and produce a warning.
pub fn parse_bdp_responses(
    responses: &[Value],
    fields: &[&str],
    sink: &dyn DiagnosticSink,
) -> Vec<Row> {
    let mut rows = Vec::new();

    for response in responses {
        let Some(securities) = response.get("securityData").and_then(Value::as_array) else {
            continue;
        };

        for entry in securities {
            let security = entry.get("security").cloned().unwrap_or(Value::Null);
            if let Some(error) = entry.get("securityError") {
                sink.warn(&format!(
                    "Security error for {}: {}",
                    display_value(&security),
                    error_text(error)
                ));
            }

            let field_data = entry.get("fieldData");
            let mut row = Row::new();
            row.insert(SECURITY_COLUMN.to_string(), security);
            for field in fields {
                let value = field_data
                    .and_then(|data| data.get(*field))
                    .cloned()
                    .unwrap_or(Value::Null);
                row.insert((*field).to_string(), value);
            }
            rows.push(row);
        }
    }

    debug!("Parsed {} BDP rows", rows.len());
    rows
}

/// Flatten `HistoricalDataResponse` messages into one row per
/// (security, date).
///
/// Each message carries a single `securityData` object whose `fieldData`
/// list holds one entry per date.
pub fn parse_bdh_responses(responses: &[Value], fields: &[&str]) -> Vec<Row> {
    let mut rows = Vec::new();

    for response in responses {
        let Some(security_data) = response.get("securityData").filter(|v| v.is_object()) else {
            continue;
        };
        let security = security_data
            .get("security")
            .cloned()
            .unwrap_or(Value::Null);
        let Some(entries) = security_data.get("fieldData").and_then(Value::as_array) else {
            continue;
        };

        for entry in entries {
            let mut row = Row::new();
            row.insert(SECURITY_COLUMN.to_string(), security.clone());
            row.insert(
                DATE_COLUMN.to_string(),
                entry.get(DATE_COLUMN).cloned().unwrap_or(Value::Null),
            );
            for field in fields {
                row.insert(
                    (*field).to_string(),
                    entry.get(*field).cloned().unwrap_or(Value::Null),
                );
            }
            rows.push(row);
        }
    }

    debug!("Parsed {} BDH rows", rows.len());
    rows
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn error_text(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| display_value(error))
}
