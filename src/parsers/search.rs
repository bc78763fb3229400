//! Search grid (BSRCH) response flattener.
//!
//! Grid payloads pair a `ColumnTitles` list with `DataRecords`, each record
//! holding one wrapped value per column in `DataFields`.

use crate::constants::SEARCH_VALUE_TAGS;
use crate::diagnostics::DiagnosticSink;
use crate::error::{BbgError, Result};
use crate::models::Row;
use serde_json::{Map, Number, Value};
use tracing::debug;

/// Flatten grid responses into one row per data record.
///
/// The grid is read from `GridResponse` or, when the payload itself carries
/// `ColumnTitles` or `DataRecords`, from the payload root. A non-empty
/// `Error` aborts with [`BbgError::Search`]. When `ReachMax` is set the rows
/// are still returned and a warning is reported. Numeric columns holding
/// blank or numeric strings are coerced to numbers afterwards.
pub fn parse_bsrch_responses(responses: &[Value], sink: &dyn DiagnosticSink) -> Result<Vec<Row>> {
    let mut rows = Vec::new();

    for response in responses {
        let Some(grid) = find_grid(response) else {
            continue;
        };

        if let Some(error) = grid.get("Error").filter(|e| is_present(e)) {
            return Err(BbgError::Search {
                message: value_text(error),
            });
        }

        if grid.get("ReachMax").and_then(Value::as_bool) == Some(true) {
            sink.warn(
                "BSRCH result reached internal limit; results may be truncated. \
                 Narrow the search or raise the LIMIT override.",
            );
        }

        let titles: Vec<String> = grid
            .get("ColumnTitles")
            .and_then(Value::as_array)
            .map(|titles| titles.iter().map(value_text).collect())
            .unwrap_or_default();
        let Some(records) = grid.get("DataRecords").and_then(Value::as_array) else {
            continue;
        };

        for record in records {
            let Some(fields) = record.get("DataFields").and_then(Value::as_array) else {
                continue;
            };
            let row: Row = titles
                .iter()
                .zip(fields)
                .map(|(title, field)| (title.clone(), extract_field_value(field, Some(title))))
                .collect();
            rows.push(row);
        }
    }

    coerce_numeric_columns(&mut rows);
    debug!("Parsed {} BSRCH rows", rows.len());
    Ok(rows)
}

fn find_grid(response: &Value) -> Option<&Map<String, Value>> {
    let object = response.as_object()?;
    if let Some(grid) = object.get("GridResponse").and_then(Value::as_object) {
        return Some(grid);
    }
    if object.contains_key("ColumnTitles") || object.contains_key("DataRecords") {
        return Some(object);
    }
    None
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Unwrap one grid cell.
///
/// A single-key object keyed by a known value tag (`StringData`,
/// `DoubleValue`, `Int32Data`, ...) or by the column title yields its inner
/// value, whatever its type. Other objects are returned unchanged, as are
/// raw scalars.
pub fn extract_field_value(field: &Value, title: Option<&str>) -> Value {
    let Value::Object(object) = field else {
        return field.clone();
    };

    for tag in SEARCH_VALUE_TAGS {
        if let Some(inner) = object.get(tag) {
            return inner.clone();
        }
    }
    if let Some(inner) = title.and_then(|title| object.get(title)) {
        return inner.clone();
    }
    field.clone()
}

/// Coerce columns that mix numbers with blank or numeric strings.
///
/// A column qualifies when it holds at least one number and every string in
/// it is blank or parses as a number. Blank strings become null; numeric
/// strings become integers when they parse as one, floats otherwise.
pub fn coerce_numeric_columns(rows: &mut [Row]) {
    let mut columns: Vec<String> = Vec::new();
    for row in rows.iter() {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    for column in columns {
        let cells = || rows.iter().filter_map(|row| row.get(&column));
        let has_number = cells().any(Value::is_number);
        let strings_ok = cells()
            .filter_map(Value::as_str)
            .all(|s| s.trim().is_empty() || parse_number(s).is_some());
        if !has_number || !strings_ok {
            continue;
        }

        for row in rows.iter_mut() {
            let Some(cell) = row.get_mut(&column) else {
                continue;
            };
            let replacement = match cell {
                Value::String(s) => parse_number(s).map(Value::Number).unwrap_or(Value::Null),
                _ => continue,
            };
            *cell = replacement;
        }
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Number::from(i));
    }
    trimmed.parse::<f64>().ok().and_then(Number::from_f64)
}
