//! Result extraction from raw BQL response payloads.
//!
//! A BQL response sequence mixes session metadata, JSON documents embedded as
//! strings and the actual `results` objects. This module keeps only the
//! latter and reports query-level exception sets through a diagnostic sink.

use crate::constants::{BQL_ERROR_PREFIX, ERROR_SEPARATOR, UNKNOWN_ERROR};
use crate::diagnostics::DiagnosticSink;
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

static OPENING_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\{\[,:]\s*)'"#).expect("valid opening quote pattern"));

static CLOSING_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'(\s*[\}\],:])"#).expect("valid closing quote pattern"));

static BARE_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\[,:]\s*)(None|True|False)(\s*[,\]\}])"#).expect("valid literal pattern")
});

/// Collect every `results` object from a response sequence.
///
/// Strings are decoded as JSON (see [`decode_payload`]); payloads that fail
/// to decode are reported as warnings and skipped. Mappings without a
/// `results` key are session metadata and are dropped. When `results` is
/// null the `responseExceptions` list is joined into a single error
/// diagnostic. This function never fails.
pub fn extract_results(responses: &[Value], sink: &dyn DiagnosticSink) -> Vec<Map<String, Value>> {
    let mut results = Vec::new();

    for response in responses {
        let decoded: Cow<'_, Value> = match response {
            Value::String(raw) => match decode_payload(raw) {
                Ok(value) => Cow::Owned(value),
                Err(e) => {
                    sink.warn(&format!("Failed to decode JSON response: {}", e));
                    continue;
                }
            },
            other => Cow::Borrowed(other),
        };

        let Some(object) = decoded.as_object() else {
            continue;
        };
        match object.get("results") {
            Some(Value::Object(found)) if !found.is_empty() => results.push(found.clone()),
            Some(Value::Null) => report_exceptions(object, sink),
            // No `results` key: session metadata
            None | Some(_) => {}
        }
    }

    debug!(
        "Extracted {} result objects from {} responses",
        results.len(),
        responses.len()
    );
    results
}

fn report_exceptions(object: &Map<String, Value>, sink: &dyn DiagnosticSink) {
    let Some(Value::Array(exceptions)) = object.get("responseExceptions") else {
        return;
    };

    let messages: Vec<String> = exceptions
        .iter()
        .filter_map(Value::as_object)
        .map(exception_message)
        .collect();

    if !messages.is_empty() {
        sink.error(&format!(
            "{}{}",
            BQL_ERROR_PREFIX,
            messages.join(ERROR_SEPARATOR)
        ));
    }
}

fn exception_message(exception: &Map<String, Value>) -> String {
    ["message", "internalMessage"]
        .iter()
        .filter_map(|key| exception.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .unwrap_or(UNKNOWN_ERROR)
        .to_string()
}

/// Decode a payload delivered as a string.
///
/// Strict JSON is tried first. On failure the text is passed through
/// [`normalize_quotes`] and decoded again.
pub fn decode_payload(raw: &str) -> serde_json::Result<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_str(&normalize_quotes(raw)),
    }
}

/// Rewrite a single-quoted, repr-style payload into JSON.
///
/// Single quotes are replaced only where they sit on a token boundary: after
/// `{`, `[`, `:` or `,` (opening) and before `}`, `]`, `:` or `,` (closing).
/// `None`, `True` and `False` in value position become `null`, `true` and
/// `false`.
///
/// Apostrophes inside string values survive only when they are not next to
/// one of those structural characters: `'O'Neil'` decodes, while a value such
/// as `'cost: 'high''` is rewritten incorrectly and fails to decode.
pub fn normalize_quotes(raw: &str) -> String {
    let text = OPENING_QUOTE.replace_all(raw, "$1\"");
    let text = CLOSING_QUOTE.replace_all(&text, "\"$1");
    // Twice: adjacent literals share the separator consumed by the first match.
    let text = replace_literals(&text);
    replace_literals(&text)
}

fn replace_literals(text: &str) -> String {
    BARE_LITERAL
        .replace_all(text, |caps: &regex::Captures<'_>| {
            format!("{}{}{}", &caps[1], json_literal(&caps[2]), &caps[3])
        })
        .into_owned()
}

fn json_literal(token: &str) -> &'static str {
    match token {
        "True" => "true",
        "False" => "false",
        _ => "null",
    }
}
