//! Intraday bar (BDIB) response flattener.

use crate::constants::SECURITY_COLUMN;
use crate::models::Row;
use serde_json::Value;
use tracing::debug;

/// Flatten `IntradayBarResponse` messages into one row per bar.
///
/// Bars are read from `barData.barTickData`; an entry may wrap the bar one
/// level deeper under its own `barTickData` key. Continuation blocks without
/// a `security` use `fallback_security`. Rows keep arrival order with
/// `security` first and the bar fields in the order they arrived.
pub fn parse_bdib_responses(responses: &[Value], fallback_security: &str) -> Vec<Row> {
    let mut rows = Vec::new();

    for response in responses {
        let Some(bar_data) = response.get("barData").filter(|v| v.is_object()) else {
            continue;
        };
        let security = bar_data
            .get("security")
            .and_then(Value::as_str)
            .unwrap_or(fallback_security);
        let Some(entries) = bar_data.get("barTickData").and_then(Value::as_array) else {
            continue;
        };

        for entry in entries {
            let bar = entry
                .get("barTickData")
                .filter(|inner| inner.is_object())
                .unwrap_or(entry);
            let Some(fields) = bar.as_object() else {
                continue;
            };

            let mut row = Row::new();
            row.insert(
                SECURITY_COLUMN.to_string(),
                Value::String(security.to_string()),
            );
            for (name, value) in fields {
                if name != SECURITY_COLUMN {
                    row.insert(name.clone(), value.clone());
                }
            }
            rows.push(row);
        }
    }

    debug!("Parsed {} BDIB bars", rows.len());
    rows
}
