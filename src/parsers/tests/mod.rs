//! Tests for the response parsers
//!
//! Fixtures mirror payloads captured from live sessions, reduced to the
//! fields each parser reads.

pub mod reference_tests;

use polars::prelude::*;
use serde_json::{Map, Value, json};

/// Unwrap a `json!` object literal into a map
pub fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("fixture must be an object")
}

/// A BQL field descriptor with the given ID and value columns
pub fn field_descriptor(ids: Value, value_type: &str, values: Value) -> Value {
    json!({
        "idColumn": {"name": "ID", "type": "STRING", "values": ids},
        "valuesColumn": {"name": "VALUE", "type": value_type, "values": values},
    })
}

pub fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

pub fn i64_values(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .collect()
}

/// Column values rendered as strings, which also covers date columns
pub fn text_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}
