//! Conversion of intermediate tables and row records into Polars DataFrames.
//!
//! BQL tables carry an explicit schema; row records from the other parsers
//! have their column dtypes inferred, with optional hints for temporal
//! columns that arrive as strings.

use crate::error::Result;
use crate::models::{Row, SITable, Scalar, Temporal};
use crate::schema::{parse_date, parse_datetime};
use polars::prelude::*;
use serde_json::Value;
use tracing::debug;

/// Materialize an intermediate table using its schema
pub fn table_to_frame(table: &SITable) -> Result<DataFrame> {
    let columns = table
        .data()
        .iter()
        .map(|(name, values)| {
            let dtype = table
                .column_type(name)
                .map(|ty| ty.dtype())
                .unwrap_or_else(|| infer_dtype(values));
            scalars_to_series(name, values, &dtype).map(Column::from)
        })
        .collect::<Result<Vec<Column>>>()?;

    Ok(DataFrame::new(columns)?)
}

/// Build a DataFrame from row records.
///
/// Columns are the union of all row keys in first-seen order; rows missing
/// a key get null. Columns named in `temporal` have their string values
/// parsed into dates or timestamps. Other dtypes are inferred: booleans,
/// integers, floats (integers mixed with floats widen), everything else
/// becomes strings and all-null columns stay null-typed.
pub fn rows_to_frame(rows: &[Row], temporal: &[(&str, Temporal)]) -> Result<DataFrame> {
    let mut names: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !names.contains(&key.as_str()) {
                names.push(key.as_str());
            }
        }
    }

    let columns = names
        .iter()
        .map(|name| {
            let hint = temporal
                .iter()
                .find(|(column, _)| column == name)
                .map(|(_, kind)| *kind);
            let values: Vec<Scalar> = rows
                .iter()
                .map(|row| {
                    let value = row.get(*name).unwrap_or(&Value::Null);
                    match hint {
                        Some(kind) => temporal_scalar(value, kind),
                        None => Scalar::from_json(value),
                    }
                })
                .collect();
            let dtype = hint
                .map(|kind| kind.dtype())
                .unwrap_or_else(|| infer_dtype(&values));
            scalars_to_series(name, &values, &dtype).map(Column::from)
        })
        .collect::<Result<Vec<Column>>>()?;

    debug!(
        "Built frame with {} columns from {} rows",
        columns.len(),
        rows.len()
    );
    Ok(DataFrame::new(columns)?)
}

fn temporal_scalar(value: &Value, kind: Temporal) -> Scalar {
    let Some(raw) = value.as_str() else {
        return Scalar::Null;
    };
    match kind {
        Temporal::Date => parse_date(raw).map(Scalar::Date),
        Temporal::Datetime => parse_datetime(raw).map(Scalar::Datetime),
    }
    .unwrap_or(Scalar::Null)
}

/// Narrowest dtype able to hold every non-null value
pub fn infer_dtype(values: &[Scalar]) -> DataType {
    let mut seen_bool = false;
    let mut seen_int = false;
    let mut seen_float = false;
    let mut seen_date = false;
    let mut seen_datetime = false;
    let mut seen_other = false;

    for value in values {
        match value {
            Scalar::Null => {}
            Scalar::Bool(_) => seen_bool = true,
            Scalar::Int(_) => seen_int = true,
            Scalar::Float(_) => seen_float = true,
            Scalar::Date(_) => seen_date = true,
            Scalar::Datetime(_) => seen_datetime = true,
            Scalar::Str(_) => seen_other = true,
        }
    }

    let kinds = [
        seen_bool,
        seen_int || seen_float,
        seen_date,
        seen_datetime,
        seen_other,
    ]
    .iter()
    .filter(|seen| **seen)
    .count();

    match kinds {
        0 => DataType::Null,
        1 if seen_bool => DataType::Boolean,
        1 if seen_float => DataType::Float64,
        1 if seen_int => DataType::Int64,
        1 if seen_date => DataType::Date,
        1 if seen_datetime => Temporal::Datetime.dtype(),
        _ => DataType::String,
    }
}

/// Build a typed series from cells; cells that do not fit become null
pub fn scalars_to_series(name: &str, values: &[Scalar], dtype: &DataType) -> Result<Series> {
    let name = PlSmallStr::from(name);
    let series = match dtype {
        DataType::Null => Series::new_null(name, values.len()),
        DataType::Boolean => {
            Series::new(name, values.iter().map(Scalar::as_bool).collect::<Vec<_>>())
        }
        DataType::Int64 => {
            Series::new(name, values.iter().map(Scalar::as_i64).collect::<Vec<_>>())
        }
        DataType::Float64 => {
            Series::new(name, values.iter().map(Scalar::as_f64).collect::<Vec<_>>())
        }
        DataType::Date => Series::new(
            name,
            values
                .iter()
                .map(Scalar::as_epoch_days)
                .collect::<Vec<_>>(),
        )
        .cast(&DataType::Date)?,
        DataType::Datetime(_, _) => Series::new(
            name,
            values
                .iter()
                .map(Scalar::as_epoch_micros)
                .collect::<Vec<_>>(),
        )
        .cast(&Temporal::Datetime.dtype())?,
        _ => Series::new(
            name,
            values.iter().map(Scalar::to_text).collect::<Vec<_>>(),
        ),
    };
    Ok(series)
}
