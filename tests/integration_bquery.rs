//! Integration tests for the BQuery facade
//!
//! These tests drive every query kind end to end over a replay session fed
//! with realistic response payloads, checking connection handling, the
//! request/response event pump, frame construction and debug snapshots.

use bbg_polars::constants::{BQL_SERVICE, REFDATA_SERVICE, SEARCH_SERVICE};
use bbg_polars::debug::{DebugCase, PARSE_CASE_PREFIX, RESPONSES_PREFIX};
use bbg_polars::diagnostics::Level;
use bbg_polars::session::{Event, EventKind, Message};
use bbg_polars::{
    BQuery, BQueryConfig, BbgError, MemorySink, ReplaySession, RequestOptions, TableGrouping,
};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn connected(session: ReplaySession) -> BQuery<ReplaySession> {
    let mut bq = BQuery::new(session, BQueryConfig::default()).unwrap();
    bq.connect().unwrap();
    bq
}

fn bql_response() -> Value {
    json!({
        "results": {
            "px_last": {
                "idColumn": {"name": "ID", "type": "STRING",
                             "values": ["IBM US Equity", "OMX Index"]},
                "valuesColumn": {"name": "VALUE", "type": "DOUBLE", "values": [230.82, 2668.05]},
                "secondaryColumns": [
                    {"name": "DATE", "type": "DATE",
                     "values": ["2024-12-03T00:00:00Z", "2024-12-03T00:00:00Z"]},
                    {"name": "CURRENCY", "type": "STRING", "values": ["USD", "SEK"]}
                ]
            },
            "name": {
                "idColumn": {"name": "ID", "type": "STRING",
                             "values": ["IBM US Equity", "OMX Index"]},
                "valuesColumn": {"name": "VALUE", "type": "STRING",
                                 "values": ["International Business Machines Corp", "OMX Stockholm 30 Index"]}
            }
        }
    })
}

#[test]
fn test_connect_opens_all_services() {
    let bq = connected(ReplaySession::default());

    assert!(bq.is_connected());
    assert!(bq.session().is_started());
    assert_eq!(
        bq.session().opened_services(),
        &[REFDATA_SERVICE, BQL_SERVICE, SEARCH_SERVICE]
    );
}

#[test]
fn test_connect_fails_when_session_cannot_start() {
    let mut bq = BQuery::new(
        ReplaySession::default().failing_start(),
        BQueryConfig::default(),
    )
    .unwrap();

    let err = bq.connect().unwrap_err();
    assert_eq!(err.to_string(), "Failed to start Bloomberg session.");
    assert!(!bq.is_connected());
}

#[test]
fn test_connect_fails_when_service_cannot_open() {
    let mut bq = BQuery::new(
        ReplaySession::default().without_service(BQL_SERVICE),
        BQueryConfig::default(),
    )
    .unwrap();

    let err = bq.connect().unwrap_err();
    assert_eq!(err.to_string(), "Failed to open service //blp/bqlsvc.");
}

#[test]
fn test_queries_require_connection() {
    let mut bq = BQuery::new(ReplaySession::default(), BQueryConfig::default()).unwrap();
    let err = bq.bql("get(px_last) for('IBM US Equity')").unwrap_err();
    assert!(matches!(err, BbgError::Connection { .. }));
}

#[test]
fn test_invalid_config_rejected() {
    let config = BQueryConfig::default().with_timeout_ms(0);
    assert!(matches!(
        BQuery::new(ReplaySession::default(), config),
        Err(BbgError::Configuration { .. })
    ));
}

#[test]
fn test_bdp_end_to_end() {
    let session = ReplaySession::from_payloads(vec![json!({
        "securityData": [
            {"security": "OMX Index", "fieldData": {"PX_LAST": 2668.05, "CRNCY": "SEK"}},
            {"security": "SPX Index", "fieldData": {"PX_LAST": 6049.88, "CRNCY": "USD"}}
        ]
    })]);
    let mut bq = connected(session);
    let options = RequestOptions::new().with_override("EQY_FUND_CRNCY", "SEK");

    let df = bq
        .bdp(&["OMX Index", "SPX Index"], &["PX_LAST", "CRNCY"], &options)
        .unwrap();

    assert_eq!(df.shape(), (2, 3));
    assert_eq!(df.column("PX_LAST").unwrap().dtype(), &DataType::Float64);

    let sent = &bq.session().sent()[0];
    assert_eq!(sent.request_type(), "ReferenceDataRequest");
    assert_eq!(
        sent.get("overrides"),
        Some(&json!([{"fieldId": "EQY_FUND_CRNCY", "value": "SEK"}]))
    );
}

#[test]
fn test_bdh_collects_partial_responses() {
    let session = ReplaySession::new(vec![
        Event::new(
            EventKind::PartialResponse,
            vec![Message::new(json!({"securityData": {
                "security": "IBM US Equity",
                "fieldData": [{"date": "2024-01-02", "PX_LAST": 161.5}]
            }}))],
        ),
        Event::new(EventKind::Other, vec![Message::new(json!({"sessionStatus": "ok"}))]),
        Event::new(
            EventKind::Response,
            vec![Message::new(json!({"securityData": {
                "security": "SEB SS Equity",
                "fieldData": [{"date": "2024-01-02", "PX_LAST": 152.0}]
            }}))],
        ),
    ]);
    let mut bq = connected(session);
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

    let df = bq
        .bdh(
            &["IBM US Equity", "SEB SS Equity"],
            &["PX_LAST"],
            start,
            end,
            &RequestOptions::new(),
        )
        .unwrap();

    assert_eq!(df.height(), 2);
    assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    assert_eq!(bq.session().polls(), 3);

    let sent = &bq.session().sent()[0];
    assert_eq!(sent.get("startDate"), Some(&json!("20240102")));
    assert_eq!(sent.get("endDate"), Some(&json!("20240105")));
}

#[test]
fn test_bdib_sorted_by_time() {
    let session = ReplaySession::from_payloads(vec![json!({
        "barData": {"barTickData": [
            {"time": "2024-01-02T14:31:00", "close": 371.0},
            {"time": "2024-01-02T14:30:00", "close": 370.0}
        ]}
    })]);
    let mut bq = connected(session);
    let start = NaiveDateTime::parse_from_str("2024-01-02 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap();

    let df = bq
        .bdib("MSFT US Equity", "TRADE", 1, start, "2024-01-02T15:00:00", &RequestOptions::new())
        .unwrap();

    let close: Vec<Option<f64>> = df
        .column("close")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(close, vec![Some(370.0), Some(371.0)]);
    assert_eq!(
        bq.session().sent()[0].get("startDateTime"),
        Some(&json!("2024-01-02T14:30:00"))
    );
}

#[test]
fn test_bql_tables_and_combine() {
    let mut bq = connected(ReplaySession::from_payloads(vec![
        json!({"sessionInfo": "metadata"}),
        bql_response(),
    ]));

    let result = bq.bql("get(px_last, name) for(['IBM US Equity', 'OMX Index'])").unwrap();

    assert_eq!(result.names(), &["px_last".to_string(), "name".to_string()]);
    assert_eq!(result[0].shape(), (2, 4));

    let combined = result
        .combine()
        .unwrap()
        .sort(["ID"], SortMultipleOptions::default())
        .unwrap();
    let names: Vec<String> = combined
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(
        names,
        vec!["ID", "px_last", "px_last.DATE", "px_last.CURRENCY", "name"]
    );
    assert_eq!(combined.height(), 2);
}

#[test]
fn test_bql_exceptions_reported_through_sink() {
    let sink = Arc::new(MemorySink::new());
    let mut bq = BQuery::new(
        ReplaySession::from_payloads(vec![json!({
            "results": null,
            "responseExceptions": [{"message": "Unknown field px_lsat"}]
        })]),
        BQueryConfig::default(),
    )
    .unwrap()
    .with_sink(sink.clone());
    bq.connect().unwrap();

    let result = bq.bql("get(px_lsat) for('IBM US Equity')").unwrap();

    assert!(result.is_empty());
    assert_eq!(
        sink.messages(Level::Error),
        vec!["BQL error: Unknown field px_lsat".to_string()]
    );
    assert!(matches!(result.combine(), Err(BbgError::NothingToCombine)));
}

#[test]
fn test_bql_shared_id_grouping_from_config() {
    let config = BQueryConfig::default().with_grouping(TableGrouping::SharedId);
    let mut bq = BQuery::new(ReplaySession::from_payloads(vec![bql_response()]), config).unwrap();
    bq.connect().unwrap();

    let result = bq.bql("get(px_last, name) for(['IBM US Equity', 'OMX Index'])").unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].width(), 5);
}

#[test]
fn test_bsrch_end_to_end_and_error() {
    let mut bq = connected(ReplaySession::from_payloads(vec![json!({
        "GridResponse": {
            "ColumnTitles": ["Ticker", "Coupon"],
            "DataRecords": [
                {"DataFields": [{"StringData": "XS123 Corp"}, {"DoubleData": 4.5}]},
                {"DataFields": [{"StringData": "XS456 Corp"}, {"StringData": ""}]}
            ],
            "ReachMax": false,
            "Error": ""
        }
    })]));

    let df = bq
        .bsrch("FI:SRCHEX.@CLOSUB", &RequestOptions::new().with_override("LIMIT", 10))
        .unwrap();
    assert_eq!(df.shape(), (2, 2));
    assert_eq!(df.column("Coupon").unwrap().dtype(), &DataType::Float64);
    assert_eq!(
        bq.session().sent()[0].get("Overrides"),
        Some(&json!([{"name": "LIMIT", "value": "10"}]))
    );

    bq.session_mut().push_events([Event::new(
        EventKind::Response,
        vec![Message::new(json!({"GridResponse": {"Error": "Invalid domain"}}))],
    )]);
    let err = bq.bsrch("FI:NOPE", &RequestOptions::new()).unwrap_err();
    assert_eq!(err.to_string(), "BSRCH error: Invalid domain");
}

#[test]
fn test_timeout_and_response_error() {
    let mut bq = connected(ReplaySession::default());
    let err = bq.bql("get(px_last)").unwrap_err();
    assert!(matches!(err, BbgError::Timeout { .. }));

    bq.session_mut().push_events([Event::new(
        EventKind::Response,
        vec![Message::error("Not authorized for //blp/refdata")],
    )]);
    let err = bq
        .bdp(&["IBM US Equity"], &["PX_LAST"], &RequestOptions::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Response error: Not authorized for //blp/refdata"
    );
}

#[test]
fn test_debug_mode_writes_snapshots_and_cases() {
    let dir = TempDir::new().unwrap();
    let config = BQueryConfig::default()
        .with_debug()
        .with_debug_dir(dir.path());
    let mut bq = BQuery::new(ReplaySession::from_payloads(vec![bql_response()]), config).unwrap();
    bq.connect().unwrap();

    bq.bql("get(px_last, name) for(['IBM US Equity', 'OMX Index'])").unwrap();

    let mut files: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    assert_eq!(files.len(), 2);
    assert!(files[0].starts_with(PARSE_CASE_PREFIX));
    assert!(files[1].starts_with(RESPONSES_PREFIX));

    let sink = MemorySink::new();
    let case = DebugCase::load(&dir.path().join(&files[0])).unwrap();
    assert_eq!(case.out_tables.len(), 2);
    assert!(case.verify(TableGrouping::PerField, &sink).passed());
}
