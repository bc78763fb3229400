//! Session that replays recorded events instead of talking to a terminal.

use super::{Event, EventKind, Message, Session};
use crate::error::Result;
use crate::request::Request;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// In-memory [`Session`] fed with a fixed queue of events.
///
/// Once the queue is drained every poll yields a timeout event. Sent
/// requests are kept so callers can inspect what would have gone out.
#[derive(Debug, Default)]
pub struct ReplaySession {
    events: VecDeque<Event>,
    sent: Vec<Request>,
    opened: Vec<String>,
    unavailable: HashSet<String>,
    fail_start: bool,
    started: bool,
    stopped: bool,
    polls: usize,
}

impl ReplaySession {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
            ..Self::default()
        }
    }

    /// Replay recorded payloads as a single final `Response` event
    pub fn from_payloads(payloads: Vec<Value>) -> Self {
        let messages = payloads.into_iter().map(Message::new).collect();
        Self::new(vec![Event::new(EventKind::Response, messages)])
    }

    /// Make `start` report failure
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Make `open_service` fail for the given service
    pub fn without_service(mut self, service: impl Into<String>) -> Self {
        self.unavailable.insert(service.into());
        self
    }

    /// Queue more events behind the ones already pending
    pub fn push_events(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn sent(&self) -> &[Request] {
        &self.sent
    }

    pub fn opened_services(&self) -> &[String] {
        &self.opened
    }

    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Session for ReplaySession {
    fn start(&mut self, host: &str, port: u16) -> bool {
        debug!("Replay session start requested for {}:{}", host, port);
        self.started = !self.fail_start;
        self.started
    }

    fn open_service(&mut self, service: &str) -> bool {
        if self.unavailable.contains(service) {
            return false;
        }
        self.opened.push(service.to_string());
        true
    }

    fn send(&mut self, request: &Request) -> Result<()> {
        self.sent.push(request.clone());
        Ok(())
    }

    fn next_event(&mut self, _timeout_ms: u64) -> Result<Event> {
        self.polls += 1;
        Ok(self.events.pop_front().unwrap_or_else(Event::timeout))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
