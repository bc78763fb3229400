//! Query facade: BDP, BDH, BDIB, BQL and BSRCH over a [`Session`].

use crate::config::BQueryConfig;
use crate::constants::SERVICES;
use crate::debug::DebugRecorder;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{BbgError, Result};
use crate::parsers::{self, extract_results, parse_result};
use crate::request::{Request, RequestOptions, RequestTimestamp};
use crate::result::BqlResult;
use crate::session::{Session, collect_responses};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bloomberg query client.
///
/// Call [`BQuery::connect`] before issuing queries; the session is stopped
/// when the client is dropped.
pub struct BQuery<S: Session> {
    session: S,
    config: BQueryConfig,
    sink: Arc<dyn DiagnosticSink>,
    recorder: Option<DebugRecorder>,
    started: bool,
}

impl<S: Session> BQuery<S> {
    pub fn new(session: S, config: BQueryConfig) -> Result<Self> {
        config.validate()?;
        let recorder = config
            .debug
            .then(|| DebugRecorder::new(config.debug_dir.clone()));
        Ok(Self {
            session,
            config,
            sink: Arc::new(TracingSink),
            recorder,
            started: false,
        })
    }

    /// Route parser warnings and BQL errors to a custom sink
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &BQueryConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn is_connected(&self) -> bool {
        self.started
    }

    /// Start the session and open the reference, BQL and search services
    pub fn connect(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        if !self.session.start(&self.config.host, self.config.port) {
            return Err(BbgError::session_start());
        }
        self.started = true;

        for service in SERVICES {
            if !self.session.open_service(service) {
                return Err(BbgError::service_open(service));
            }
        }

        info!(
            "Connected to {}:{} with {} services",
            self.config.host,
            self.config.port,
            SERVICES.len()
        );
        Ok(())
    }

    /// Send a request and return every message payload it produced
    pub fn send_request(&mut self, request: &Request) -> Result<Vec<Value>> {
        if !self.started {
            return Err(BbgError::Connection {
                message: "Session is not started; call connect() first.".to_string(),
            });
        }

        let responses = collect_responses(&mut self.session, request, self.config.timeout_ms)?;
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.save_responses(request, &responses) {
                warn!("Failed to save debug responses: {}", e);
            }
        }
        Ok(responses)
    }

    /// Reference data (BDP): one row per security
    pub fn bdp(
        &mut self,
        securities: &[&str],
        fields: &[&str],
        options: &RequestOptions,
    ) -> Result<DataFrame> {
        let request = Request::reference_data(securities, fields, options);
        let responses = self.send_request(&request)?;
        parsers::reference_frame(&responses, fields, self.sink.as_ref())
    }

    /// Daily history (BDH): one row per security and date
    pub fn bdh(
        &mut self,
        securities: &[&str],
        fields: &[&str],
        start: NaiveDate,
        end: NaiveDate,
        options: &RequestOptions,
    ) -> Result<DataFrame> {
        let request = Request::historical_data(securities, fields, start, end, options);
        let responses = self.send_request(&request)?;
        parsers::history_frame(&responses, fields)
    }

    /// Intraday bars (BDIB) sorted by bar time
    pub fn bdib(
        &mut self,
        security: &str,
        event_type: &str,
        interval: u32,
        start: impl RequestTimestamp,
        end: impl RequestTimestamp,
        options: &RequestOptions,
    ) -> Result<DataFrame> {
        let request = Request::intraday_bar(security, event_type, interval, start, end, options);
        let responses = self.send_request(&request)?;
        parsers::intraday_frame(&responses, security)
    }

    /// Run a BQL expression
    pub fn bql(&mut self, expression: &str) -> Result<BqlResult> {
        let request = Request::bql(expression);
        let responses = self.send_request(&request)?;
        self.parse_bql_responses(&responses)
    }

    /// Run a saved search (BSRCH)
    pub fn bsrch(&mut self, domain: &str, options: &RequestOptions) -> Result<DataFrame> {
        let request = Request::search(domain, options);
        let responses = self.send_request(&request)?;
        parsers::search_frame(&responses, self.sink.as_ref())
    }

    /// Build the BQL result for a response sequence, recording a parse case
    /// when debug mode is on
    pub fn parse_bql_responses(&self, responses: &[Value]) -> Result<BqlResult> {
        let sink = self.sink.as_ref();
        let results = extract_results(responses, sink);
        let tables: Vec<_> = results
            .iter()
            .flat_map(|result| parse_result(result, self.config.grouping, sink))
            .collect();

        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.save_case(&results, &tables) {
                warn!("Failed to save BQL parse case: {}", e);
            }
        }

        debug!("BQL query produced {} tables", tables.len());
        BqlResult::from_tables(&tables)
    }
}

impl<S: Session> Drop for BQuery<S> {
    fn drop(&mut self) {
        if self.started {
            self.session.stop();
        }
    }
}
