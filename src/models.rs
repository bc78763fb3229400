//! Core data structures for response normalization.
//!
//! Defines the canonical column types, the scalar cell representation and the
//! column-major intermediate table ([`SITable`]) that BQL results pass through
//! before they become Polars DataFrames.

use crate::constants::UNIX_EPOCH_DAYS_FROM_CE;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::{DataType, TimeUnit};
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Ordered record produced by the row-oriented parsers (BDP, BDH, BDIB, BSRCH)
pub type Row = Map<String, Value>;

/// Canonical column types a vendor type tag can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Float64,
    Int64,
    Date,
    Boolean,
}

impl ColumnType {
    /// Map a vendor type tag (case-insensitive) to a canonical type.
    ///
    /// Unknown tags such as `ENUM` fall back to [`ColumnType::String`]. The
    /// canonical names themselves are accepted, so mapping is idempotent.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "DOUBLE" | "FLOAT" | "FLOAT64" => ColumnType::Float64,
            "INT" | "INTEGER" | "LONG" | "INT64" => ColumnType::Int64,
            "DATE" => ColumnType::Date,
            "BOOLEAN" | "BOOL" => ColumnType::Boolean,
            _ => ColumnType::String,
        }
    }

    /// Polars dtype used when materializing a column of this type
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnType::String => DataType::String,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Date => DataType::Date,
            ColumnType::Boolean => DataType::Boolean,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "String",
            ColumnType::Float64 => "Float64",
            ColumnType::Int64 => "Int64",
            ColumnType::Date => "Date",
            ColumnType::Boolean => "Boolean",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell value inside an intermediate table
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
}

impl Scalar {
    /// Convert a raw JSON value into a cell.
    ///
    /// Integers representable as `i64` stay integers; nested arrays and
    /// objects are carried as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => n.as_f64().map(Scalar::Float).unwrap_or(Scalar::Null),
            },
            Value::String(s) => Scalar::Str(s.clone()),
            other => Scalar::Str(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            Scalar::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Days since the Unix epoch, the physical representation of a Polars date
    pub fn as_epoch_days(&self) -> Option<i32> {
        match self {
            Scalar::Date(d) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
            Scalar::Datetime(dt) => Some(dt.date().num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
            _ => None,
        }
    }

    /// Microseconds since the Unix epoch, the physical representation of a
    /// microsecond Polars datetime
    pub fn as_epoch_micros(&self) -> Option<i64> {
        match self {
            Scalar::Datetime(dt) => Some(dt.and_utc().timestamp_micros()),
            Scalar::Date(d) => d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_micros()),
            _ => None,
        }
    }

    /// Text rendering used for String columns; `None` for nulls
    pub fn to_text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Int(i) => Some(i.to_string()),
            Scalar::Float(f) => Some(f.to_string()),
            Scalar::Str(s) => Some(s.clone()),
            Scalar::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Scalar::Datetime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_none(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(i) => serializer.serialize_i64(*i),
            Scalar::Float(f) if f.is_nan() => serializer.serialize_str("NaN"),
            Scalar::Float(f) if f.is_infinite() => {
                serializer.serialize_str(if *f > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Scalar::Float(f) => serializer.serialize_f64(*f),
            Scalar::Str(s) => serializer.serialize_str(s),
            Scalar::Date(_) | Scalar::Datetime(_) => {
                serializer.serialize_str(&self.to_text().unwrap_or_default())
            }
        }
    }
}

/// Column-major intermediate table built from one BQL result
///
/// Column order is insertion order. Every column normally has a schema entry;
/// columns without one are carried through coercion untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SITable {
    pub name: String,
    data: Vec<(String, Vec<Scalar>)>,
    schema: Vec<(String, ColumnType)>,
}

impl SITable {
    pub fn new(
        name: impl Into<String>,
        data: Vec<(String, Vec<Scalar>)>,
        schema: Vec<(String, ColumnType)>,
    ) -> Self {
        Self {
            name: name.into(),
            data,
            schema,
        }
    }

    pub fn data(&self) -> &[(String, Vec<Scalar>)] {
        &self.data
    }

    pub fn schema(&self) -> &[(String, ColumnType)] {
        &self.schema
    }

    pub fn column(&self, name: &str) -> Option<&[Scalar]> {
        self.data
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.schema
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, ty)| *ty)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.data.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of rows (length of the first column)
    pub fn height(&self) -> usize {
        self.data.first().map(|(_, values)| values.len()).unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Data as a JSON object keyed by column name, in column order
    pub fn data_json(&self) -> Value {
        let mut object = Map::new();
        for (name, values) in &self.data {
            object.insert(
                name.clone(),
                serde_json::to_value(values).unwrap_or(Value::Null),
            );
        }
        Value::Object(object)
    }

    /// Schema as a JSON object of canonical type names
    pub fn schema_json(&self) -> Value {
        let object: Map<String, Value> = self
            .schema
            .iter()
            .map(|(name, ty)| (name.clone(), Value::String(ty.as_str().to_string())))
            .collect();
        Value::Object(object)
    }
}

/// Frame-level dtype hint for row-oriented parsers whose temporal columns
/// arrive as strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    Date,
    Datetime,
}

impl Temporal {
    pub fn dtype(&self) -> DataType {
        match self {
            Temporal::Date => DataType::Date,
            Temporal::Datetime => DataType::Datetime(TimeUnit::Microseconds, None),
        }
    }
}
