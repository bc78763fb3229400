//! Session contract and the request/response event pump.
//!
//! The transport is an external collaborator: anything that can start, open
//! services, send a [`Request`] and hand back events implements [`Session`].
//! [`collect_responses`] drives one request to completion on top of it.

mod replay;

pub use replay::ReplaySession;

use crate::error::{BbgError, Result};
use crate::request::Request;
use serde_json::Value;
use tracing::debug;

/// Kind of event delivered by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PartialResponse,
    Response,
    Timeout,
    Other,
}

/// One decoded message of an event
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub payload: Value,
    /// Text of the message's `responseError` element, if it has one
    pub response_error: Option<String>,
}

impl Message {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            response_error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            payload: Value::Null,
            response_error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub messages: Vec<Message>,
}

impl Event {
    pub fn new(kind: EventKind, messages: Vec<Message>) -> Self {
        Self { kind, messages }
    }

    pub fn timeout() -> Self {
        Self::new(EventKind::Timeout, Vec::new())
    }
}

/// A connection to the market-data API
pub trait Session {
    /// Start the session; `false` when the endpoint cannot be reached
    fn start(&mut self, host: &str, port: u16) -> bool;

    /// Open a logical service such as `//blp/refdata`
    fn open_service(&mut self, service: &str) -> bool;

    fn send(&mut self, request: &Request) -> Result<()>;

    /// Block for the next event, up to `timeout_ms`
    fn next_event(&mut self, timeout_ms: u64) -> Result<Event>;

    fn stop(&mut self) {}
}

/// Send a request and gather every message payload until the final
/// `Response` event.
///
/// A `Timeout` event fails with [`BbgError::Timeout`]; a message carrying a
/// response error fails with [`BbgError::Response`].
pub fn collect_responses<S: Session + ?Sized>(
    session: &mut S,
    request: &Request,
    timeout_ms: u64,
) -> Result<Vec<Value>> {
    session.send(request)?;

    let mut responses = Vec::new();
    loop {
        let event = session.next_event(timeout_ms)?;
        if event.kind == EventKind::Timeout {
            return Err(BbgError::Timeout { timeout_ms });
        }

        for message in event.messages {
            if let Some(error) = message.response_error {
                return Err(BbgError::Response { message: error });
            }
            responses.push(message.payload);
        }

        if event.kind == EventKind::Response {
            break;
        }
    }

    debug!(
        "Collected {} messages for {}",
        responses.len(),
        request.request_type()
    );
    Ok(responses)
}
