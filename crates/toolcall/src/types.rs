//! Request and result envelopes exchanged with the model.

use crate::error::UNKNOWN_ERROR;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool call extracted from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the tool to invoke.
    #[serde(rename = "name")]
    pub tool_name: String,
    /// Arguments as a JSON object.
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Look up a single argument.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }
}

/// Uniform outcome of a tool call: `{"success", "data"?, "error"?}`.
///
/// A successful result never carries an error and a failed result always
/// carries one. Deserialization restores that shape for envelopes coming
/// from elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Envelope")]
pub struct ToolCallResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ToolCallResult {
    /// A successful result carrying `data`.
    pub fn success(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
        }
    }

    /// A successful result with no payload.
    pub fn success_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// A failed result. Blank messages become `"Unknown error occurred"`.
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            error
        };
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl From<Envelope> for ToolCallResult {
    fn from(raw: Envelope) -> Self {
        if raw.success {
            Self {
                success: true,
                data: raw.data,
                error: None,
            }
        } else {
            Self::failure(raw.error.unwrap_or_default())
        }
    }
}
