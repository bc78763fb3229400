//! Type mapping and value coercion.
//!
//! Maps vendor type tags onto canonical column types and converts the raw
//! cells of an intermediate table so that each column matches its declared
//! type. Coercion is lenient: anything that cannot be converted becomes null.

use crate::models::{ColumnType, SITable, Scalar};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

/// Map column names to canonical types from their vendor type tags.
///
/// Unknown tags default to [`ColumnType::String`]; order is preserved.
pub fn map_types<I, K, V>(tags: I) -> Vec<(String, ColumnType)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    tags.into_iter()
        .map(|(name, tag)| (name.into(), ColumnType::from_tag(tag.as_ref())))
        .collect()
}

/// Return a new table whose values match the table's own schema.
///
/// Columns without a schema entry are copied unchanged. Applying the
/// coercion to its own output yields the same table.
pub fn apply_schema(table: &SITable) -> SITable {
    let data = table
        .data()
        .iter()
        .map(|(name, values)| {
            let coerced = match table.column_type(name) {
                Some(ty) => values.iter().map(|value| coerce_value(value, ty)).collect(),
                None => values.clone(),
            };
            (name.clone(), coerced)
        })
        .collect();

    debug!(
        "Applied schema to table '{}' ({} columns, {} rows)",
        table.name,
        table.width(),
        table.height()
    );

    SITable::new(table.name.clone(), data, table.schema().to_vec())
}

/// Coerce one cell to the given column type
pub fn coerce_value(value: &Scalar, ty: ColumnType) -> Scalar {
    match ty {
        ColumnType::Float64 => coerce_float(value),
        ColumnType::Int64 => coerce_int(value),
        ColumnType::Date => coerce_date(value),
        ColumnType::Boolean => coerce_bool(value),
        ColumnType::String => value.clone(),
    }
}

fn coerce_float(value: &Scalar) -> Scalar {
    match value {
        Scalar::Float(f) if f.is_nan() => Scalar::Null,
        Scalar::Float(f) => Scalar::Float(*f),
        Scalar::Int(i) => Scalar::Float(*i as f64),
        Scalar::Str(s) => match s.trim() {
            "NaN" => Scalar::Null,
            "Infinity" => Scalar::Float(f64::INFINITY),
            "-Infinity" => Scalar::Float(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Scalar::Float)
                .unwrap_or(Scalar::Null),
        },
        _ => Scalar::Null,
    }
}

/// Integral floats at or beyond this magnitude do not fit in an `i64`
const I64_FLOAT_BOUND: f64 = 9.2e18;

fn coerce_int(value: &Scalar) -> Scalar {
    match value {
        Scalar::Int(i) => Scalar::Int(*i),
        Scalar::Float(f) if f.fract() == 0.0 && f.abs() < I64_FLOAT_BOUND => Scalar::Int(*f as i64),
        Scalar::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Scalar::Int)
            .unwrap_or(Scalar::Null),
        _ => Scalar::Null,
    }
}

fn coerce_date(value: &Scalar) -> Scalar {
    match value {
        Scalar::Date(d) => Scalar::Date(*d),
        Scalar::Datetime(dt) => Scalar::Date(dt.date()),
        Scalar::Str(s) => parse_date(s).map(Scalar::Date).unwrap_or(Scalar::Null),
        _ => Scalar::Null,
    }
}

fn coerce_bool(value: &Scalar) -> Scalar {
    match value {
        Scalar::Bool(b) => Scalar::Bool(*b),
        Scalar::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            _ => Scalar::Null,
        },
        _ => Scalar::Null,
    }
}

/// Parse a vendor date string, dropping any time-of-day and zone.
///
/// Accepts `YYYY-MM-DDTHH:MM:SSZ`, RFC 3339 timestamps and plain
/// `YYYY-MM-DD` dates.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ") {
        return Some(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Parse a vendor timestamp into a naive datetime.
///
/// A trailing `Z` is dropped, offsets are converted to UTC and plain dates
/// become midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(naive, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
