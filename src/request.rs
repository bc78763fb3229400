//! Vendor-neutral request descriptions.
//!
//! A [`Request`] names its service and request type and carries its elements
//! as an ordered JSON object, which a session implementation translates into
//! the wire request.

use crate::constants::{
    BQL_APP_NAME, BQL_REQUEST, BQL_SERVICE, DAILY_PERIODICITY, HISTORICAL_DATA_REQUEST,
    INTRADAY_BAR_REQUEST, REFDATA_SERVICE, REFERENCE_DATA_REQUEST, SEARCH_REQUEST,
    SEARCH_SERVICE,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    ReferenceData,
    HistoricalData,
    IntradayBar,
    Bql,
    Search,
}

impl RequestKind {
    pub fn service(&self) -> &'static str {
        match self {
            RequestKind::ReferenceData | RequestKind::HistoricalData | RequestKind::IntradayBar => {
                REFDATA_SERVICE
            }
            RequestKind::Bql => BQL_SERVICE,
            RequestKind::Search => SEARCH_SERVICE,
        }
    }

    pub fn request_type(&self) -> &'static str {
        match self {
            RequestKind::ReferenceData => REFERENCE_DATA_REQUEST,
            RequestKind::HistoricalData => HISTORICAL_DATA_REQUEST,
            RequestKind::IntradayBar => INTRADAY_BAR_REQUEST,
            RequestKind::Bql => BQL_REQUEST,
            RequestKind::Search => SEARCH_REQUEST,
        }
    }
}

/// Overrides and extra request settings supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Field overrides as (field id, value) pairs, sent in order
    pub overrides: Vec<(String, Value)>,
    /// Additional top-level request elements
    pub settings: Map<String, Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.push((field.into(), value.into()));
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

/// A request ready to be sent through a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub kind: RequestKind,
    pub elements: Map<String, Value>,
}

impl Request {
    pub fn service(&self) -> &'static str {
        self.kind.service()
    }

    pub fn request_type(&self) -> &'static str {
        self.kind.request_type()
    }

    pub fn get(&self, element: &str) -> Option<&Value> {
        self.elements.get(element)
    }

    /// `ReferenceDataRequest` for the given securities and fields
    pub fn reference_data(securities: &[&str], fields: &[&str], options: &RequestOptions) -> Self {
        Self::securities_request(RequestKind::ReferenceData, securities, fields, options)
    }

    /// Daily `HistoricalDataRequest` between two dates (inclusive)
    pub fn historical_data(
        securities: &[&str],
        fields: &[&str],
        start: NaiveDate,
        end: NaiveDate,
        options: &RequestOptions,
    ) -> Self {
        let mut request =
            Self::securities_request(RequestKind::HistoricalData, securities, fields, options);
        request.set("startDate", start.format("%Y%m%d").to_string());
        request.set("endDate", end.format("%Y%m%d").to_string());
        request.set("periodicitySelection", DAILY_PERIODICITY);
        request
    }

    /// `IntradayBarRequest` for one security
    pub fn intraday_bar(
        security: &str,
        event_type: &str,
        interval: u32,
        start: impl RequestTimestamp,
        end: impl RequestTimestamp,
        options: &RequestOptions,
    ) -> Self {
        let mut request = Self::empty(RequestKind::IntradayBar);
        request.set("security", security);
        request.set("eventType", event_type);
        request.set("interval", interval);
        request.set("startDateTime", start.to_request_string());
        request.set("endDateTime", end.to_request_string());
        request.apply_overrides(&options.overrides);
        request.apply_settings(&options.settings);
        request
    }

    /// BQL `sendQuery` request for an expression
    pub fn bql(expression: &str) -> Self {
        let mut request = Self::empty(RequestKind::Bql);
        request.set("expression", expression);
        request.set("clientContext", json!({ "appName": BQL_APP_NAME }));
        request
    }

    /// `ExcelGetGridRequest` for a saved search domain.
    ///
    /// Search overrides are `name`/`value` pairs whose values are always sent
    /// as strings.
    pub fn search(domain: &str, options: &RequestOptions) -> Self {
        let mut request = Self::empty(RequestKind::Search);
        request.set("Domain", domain);
        if !options.overrides.is_empty() {
            let overrides: Vec<Value> = options
                .overrides
                .iter()
                .map(|(name, value)| json!({ "name": name, "value": value_as_string(value) }))
                .collect();
            request.set("Overrides", overrides);
        }
        request.apply_settings(&options.settings);
        request
    }

    fn empty(kind: RequestKind) -> Self {
        Self {
            kind,
            elements: Map::new(),
        }
    }

    fn securities_request(
        kind: RequestKind,
        securities: &[&str],
        fields: &[&str],
        options: &RequestOptions,
    ) -> Self {
        let mut request = Self::empty(kind);
        request.set("securities", securities.to_vec());
        request.set("fields", fields.to_vec());
        request.apply_overrides(&options.overrides);
        request.apply_settings(&options.settings);
        request
    }

    fn set(&mut self, element: &str, value: impl Into<Value>) {
        self.elements.insert(element.to_string(), value.into());
    }

    fn apply_overrides(&mut self, overrides: &[(String, Value)]) {
        if overrides.is_empty() {
            return;
        }
        let entries: Vec<Value> = overrides
            .iter()
            .map(|(field, value)| json!({ "fieldId": field, "value": value }))
            .collect();
        self.set("overrides", entries);
    }

    fn apply_settings(&mut self, settings: &Map<String, Value>) {
        for (key, value) in settings {
            self.set(key, value.clone());
        }
    }
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Timestamps accepted by intraday requests
pub trait RequestTimestamp {
    /// `YYYY-MM-DDTHH:MM:SS`, with a `Z` suffix for zone-aware values
    fn to_request_string(&self) -> String;
}

impl RequestTimestamp for NaiveDateTime {
    fn to_request_string(&self) -> String {
        self.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

impl<Tz: TimeZone> RequestTimestamp for DateTime<Tz> {
    fn to_request_string(&self) -> String {
        format!(
            "{}Z",
            self.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%S")
        )
    }
}

impl RequestTimestamp for &str {
    fn to_request_string(&self) -> String {
        self.to_string()
    }
}
