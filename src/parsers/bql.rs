//! BQL table builder.
//!
//! Turns one BQL `results` object (field name → column descriptors) into
//! named intermediate tables. Each field contributes its value column plus
//! any secondary columns, prefixed with the field name, next to the shared
//! `ID` column. A table has exactly one row per ID.

use crate::constants::DEFAULT_ID_COLUMN;
use crate::diagnostics::DiagnosticSink;
use crate::models::{SITable, Scalar};
use crate::parsers::extract::extract_results;
use crate::schema::{apply_schema, map_types};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// How the fields of one `results` object are grouped into tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableGrouping {
    /// One table per field, named after the field
    #[default]
    PerField,
    /// Fields with identical ID sequences share a table named after the
    /// first of them
    SharedId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldDescriptor {
    #[serde(default)]
    id_column: ColumnDescriptor,
    #[serde(default)]
    values_column: ColumnDescriptor,
    #[serde(default)]
    secondary_columns: Option<Vec<ColumnDescriptor>>,
}

#[derive(Debug, Default, Deserialize)]
struct ColumnDescriptor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    type_tag: Option<String>,
    #[serde(default)]
    values: Option<Vec<Value>>,
}

impl ColumnDescriptor {
    fn values(&self) -> &[Value] {
        self.values.as_deref().unwrap_or_default()
    }

    fn type_tag(&self) -> &str {
        self.type_tag.as_deref().unwrap_or("STRING")
    }
}

/// Columns collected for one output table before padding and coercion
struct TableBuilder {
    name: String,
    ids: Vec<Value>,
    columns: Vec<(String, Vec<Scalar>)>,
    tags: Vec<(String, String)>,
}

impl TableBuilder {
    fn new(name: &str, descriptor: &FieldDescriptor) -> Self {
        let ids = descriptor.id_column.values().to_vec();
        Self {
            name: name.to_string(),
            columns: vec![(
                DEFAULT_ID_COLUMN.to_string(),
                ids.iter().map(Scalar::from_json).collect(),
            )],
            tags: vec![(
                DEFAULT_ID_COLUMN.to_string(),
                descriptor.id_column.type_tag().to_string(),
            )],
            ids,
        }
    }

    fn push_column(&mut self, name: &str, tag: &str, values: &[Value], sink: &dyn DiagnosticSink) {
        if self.columns.iter().any(|(existing, _)| existing == name) {
            sink.warn(&format!(
                "Skipping BQL column '{}' in table '{}': name already used",
                name, self.name
            ));
            return;
        }
        self.columns.push((
            name.to_string(),
            values.iter().map(Scalar::from_json).collect(),
        ));
        self.tags.push((name.to_string(), tag.to_string()));
    }

    fn add_field(&mut self, field: &str, descriptor: &FieldDescriptor, sink: &dyn DiagnosticSink) {
        let values = &descriptor.values_column;
        self.push_column(field, values.type_tag(), values.values(), sink);

        for secondary in descriptor.secondary_columns.iter().flatten() {
            let Some(secondary_name) = secondary.name.as_deref() else {
                continue;
            };
            let column = format!("{}.{}", field, secondary_name);
            self.push_column(&column, secondary.type_tag(), secondary.values(), sink);
        }
    }

    /// Fit every column to the number of IDs: shorter columns are padded
    /// with nulls, longer ones truncated with a warning
    fn build(mut self, sink: &dyn DiagnosticSink) -> SITable {
        let height = self.ids.len();
        for (name, values) in &mut self.columns {
            if values.len() > height {
                sink.warn(&format!(
                    "Truncating BQL column '{}' in table '{}' from {} to {} rows",
                    name,
                    self.name,
                    values.len(),
                    height
                ));
            }
            values.resize(height, Scalar::Null);
        }

        let schema = map_types(self.tags);
        apply_schema(&SITable::new(self.name, self.columns, schema))
    }
}

/// Build the intermediate tables for one `results` object.
///
/// Tables come out in field encounter order and are already coerced to
/// their schema. Descriptors that are not objects are skipped with a
/// warning; an empty object yields no tables.
pub fn parse_result(
    results: &Map<String, Value>,
    grouping: TableGrouping,
    sink: &dyn DiagnosticSink,
) -> Vec<SITable> {
    let mut builders: Vec<TableBuilder> = Vec::new();

    for (field, raw) in results {
        if !raw.is_object() {
            sink.warn(&format!("Skipping BQL field '{}': not an object", field));
            continue;
        }
        let descriptor: FieldDescriptor = match serde_json::from_value(raw.clone()) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                sink.warn(&format!("Skipping BQL field '{}': {}", field, e));
                continue;
            }
        };

        let existing = match grouping {
            TableGrouping::PerField => None,
            TableGrouping::SharedId => builders
                .iter_mut()
                .find(|builder| builder.ids.as_slice() == descriptor.id_column.values()),
        };

        match existing {
            Some(builder) => builder.add_field(field, &descriptor, sink),
            None => {
                let mut builder = TableBuilder::new(field, &descriptor);
                builder.add_field(field, &descriptor, sink);
                builders.push(builder);
            }
        }
    }

    let tables: Vec<SITable> = builders
        .into_iter()
        .map(|builder| builder.build(sink))
        .collect();
    debug!(
        "Built {} tables from {} BQL fields",
        tables.len(),
        results.len()
    );
    tables
}

/// Extract every `results` object from a response sequence and build its
/// tables, in response order.
pub fn parse_bql_responses(
    responses: &[Value],
    grouping: TableGrouping,
    sink: &dyn DiagnosticSink,
) -> Vec<SITable> {
    extract_results(responses, sink)
        .iter()
        .flat_map(|results| parse_result(results, grouping, sink))
        .collect()
}
