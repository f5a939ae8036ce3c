//! Extraction of tool calls from free-form model output.
//!
//! A call is written as `[TOOL_CALL:name({"key":"value"})]` with no
//! whitespace between the marker, the name and the opening parenthesis.
//! The argument payload is read with a streaming JSON parser, so braces or
//! `)]` inside string values are handled correctly.

use crate::types::ToolCallRequest;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

/// Marker token that opens a tool call.
pub const MARKER: &str = "TOOL_CALL";

const CLOSE: &str = ")]";

static CALL_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[TOOL_CALL:([A-Za-z_][A-Za-z0-9_]*)\(").expect("valid tool call pattern")
});

/// Why a detected call occurrence was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("arguments are not valid JSON: {0}")]
    InvalidJson(String),
    #[error("arguments must be a JSON object")]
    NotAnObject,
    #[error("missing closing `)]`")]
    Unterminated,
}

/// A call occurrence that could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCall {
    /// Byte offset of the opening `[` in the scanned text.
    pub offset: usize,
    pub tool_name: String,
    pub reason: MalformedReason,
}

/// Everything found in one piece of model output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    /// Well-formed calls in order of appearance.
    pub calls: Vec<ToolCallRequest>,
    /// Occurrences that were dropped.
    pub malformed: Vec<MalformedCall>,
}

/// Extract every well-formed tool call, in order.
///
/// Malformed occurrences are skipped without affecting their siblings.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCallRequest> {
    scan(text).calls
}

/// Extract tool calls and report the occurrences that were dropped.
pub fn scan(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut pos = 0;

    while let Some(caps) = CALL_START.captures_at(text, pos) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let tool_name = name.as_str();

        match read_arguments(&text[whole.end()..]) {
            Ok((arguments, consumed)) => {
                outcome.calls.push(ToolCallRequest::new(tool_name, arguments));
                pos = whole.end() + consumed;
            }
            Err(reason) => {
                warn!(tool = tool_name, offset = whole.start(), %reason, "dropping malformed tool call");
                outcome.malformed.push(MalformedCall {
                    offset: whole.start(),
                    tool_name: tool_name.to_string(),
                    reason,
                });
                pos = whole.end();
            }
        }
    }

    outcome
}

/// Parse the JSON object and the closing `)]`, returning bytes consumed.
fn read_arguments(rest: &str) -> Result<(Map<String, Value>, usize), MalformedReason> {
    let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    let value = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => return Err(MalformedReason::InvalidJson(e.to_string())),
        None => return Err(MalformedReason::InvalidJson("empty payload".to_string())),
    };
    let end = stream.byte_offset();

    let Value::Object(arguments) = value else {
        return Err(MalformedReason::NotAnObject);
    };
    if !rest[end..].starts_with(CLOSE) {
        return Err(MalformedReason::Unterminated);
    }

    Ok((arguments, end + CLOSE.len()))
}

/// Render a call in the textual grammar.
pub fn format_tool_call(name: &str, arguments: &Value) -> String {
    format!("[{MARKER}:{name}({arguments})]")
}
