//! Tests for the BDP and BDH flatteners

use super::{column_names, f64_values, text_values};
use crate::diagnostics::{Level, MemorySink};
use crate::parsers::{history_frame, parse_bdh_responses, parse_bdp_responses, reference_frame};
use polars::prelude::*;
use serde_json::json;

fn reference_response() -> serde_json::Value {
    json!({
        "securityData": [
            {"security": "IBM US Equity", "sequenceNumber": 0,
             "fieldData": {"PX_LAST": 125.5, "NAME": "IBM"}},
            {"security": "MSFT US Equity", "sequenceNumber": 1,
             "fieldData": {"NAME": "Microsoft"}}
        ]
    })
}

#[test]
fn test_bdp_rows_follow_request_field_order() {
    let sink = MemorySink::new();
    let rows = parse_bdp_responses(&[reference_response()], &["NAME", "PX_LAST"], &sink);

    assert_eq!(rows.len(), 2);
    let keys: Vec<&String> = rows[0].keys().collect();
    assert_eq!(keys, vec!["security", "NAME", "PX_LAST"]);
    assert_eq!(rows[1]["PX_LAST"], json!(null));
    assert!(sink.is_empty());
}

#[test]
fn test_bdp_security_error_keeps_row_and_warns() {
    let sink = MemorySink::new();
    let response = json!({
        "securityData": [
            {"security": "BAD Equity",
             "securityError": {"category": "BAD_SEC", "message": "Unknown/Invalid security"},
             "fieldData": {}}
        ]
    });

    let rows = parse_bdp_responses(&[response], &["PX_LAST"], &sink);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["security"], json!("BAD Equity"));
    assert_eq!(
        sink.messages(Level::Warn),
        vec!["Security error for BAD Equity: Unknown/Invalid security".to_string()]
    );
}

#[test]
fn test_bdp_ignores_messages_without_security_data() {
    let sink = MemorySink::new();
    let responses = vec![json!({"sessionStatus": "ok"}), reference_response()];
    assert_eq!(parse_bdp_responses(&responses, &["PX_LAST"], &sink).len(), 2);
}

#[test]
fn test_reference_frame_types() {
    let sink = MemorySink::new();
    let df = reference_frame(&[reference_response()], &["PX_LAST", "NAME"], &sink).unwrap();

    assert_eq!(column_names(&df), vec!["security", "PX_LAST", "NAME"]);
    assert_eq!(df.column("PX_LAST").unwrap().dtype(), &DataType::Float64);
    assert_eq!(f64_values(&df, "PX_LAST"), vec![Some(125.5), None]);
}

#[test]
fn test_reference_frame_empty_responses() {
    let sink = MemorySink::new();
    let df = reference_frame(&[], &["PX_LAST"], &sink).unwrap();
    assert_eq!(df.shape(), (0, 0));
}

fn history_response(security: &str, closes: &[(&str, f64)]) -> serde_json::Value {
    let field_data: Vec<serde_json::Value> = closes
        .iter()
        .map(|(date, px)| json!({"date": date, "PX_LAST": px}))
        .collect();
    json!({
        "securityData": {
            "security": security,
            "sequenceNumber": 0,
            "fieldData": field_data
        }
    })
}

#[test]
fn test_bdh_one_row_per_security_and_date() {
    let responses = vec![
        history_response("IBM US Equity", &[("2024-01-02", 160.1), ("2024-01-03", 161.2)]),
        history_response("MSFT US Equity", &[("2024-01-02", 370.9)]),
    ];

    let rows = parse_bdh_responses(&responses, &["PX_LAST", "PX_VOLUME"]);

    assert_eq!(rows.len(), 3);
    let keys: Vec<&String> = rows[0].keys().collect();
    assert_eq!(keys, vec!["security", "date", "PX_LAST", "PX_VOLUME"]);
    assert_eq!(rows[2]["security"], json!("MSFT US Equity"));
    assert_eq!(rows[2]["PX_VOLUME"], json!(null));
}

#[test]
fn test_history_frame_types_date_column() {
    let responses = vec![history_response(
        "IBM US Equity",
        &[("2024-01-02", 160.1), ("2024-01-03", 161.2)],
    )];

    let df = history_frame(&responses, &["PX_LAST"]).unwrap();

    assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    assert_eq!(
        text_values(&df, "date"),
        vec![Some("2024-01-02".to_string()), Some("2024-01-03".to_string())]
    );
    assert_eq!(f64_values(&df, "PX_LAST"), vec![Some(160.1), Some(161.2)]);
}
