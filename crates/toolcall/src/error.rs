use std::time::Duration;
use thiserror::Error;

/// Message returned for every call when no host is attached.
pub const HOST_UNAVAILABLE: &str =
    "Electron API not available - tool calls only work in Electron environment";

/// Fallback message for host failures that carry no text.
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Errors raised while turning a request into a host call.
///
/// None of these are fatal: the dispatcher renders each one into a failed
/// [`ToolCallResult`](crate::ToolCallResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(String),

    #[error("Invalid argument {name}: expected {expected}")]
    InvalidArgument { name: String, expected: &'static str },

    #[error("{}", HOST_UNAVAILABLE)]
    HostUnavailable,

    #[error("{0}")]
    HostExecution(String),
}

/// Errors reported by a [`Host`](crate::Host) implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Denied(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Failed(String),
}

/// Errors from provider HTTP calls.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the API call.
    #[error("network: {0}")]
    Network(String),

    /// The provider returned an error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<policy::Error> for HostError {
    fn from(err: policy::Error) -> Self {
        Self::Denied(err.to_string())
    }
}

impl From<HostError> for ToolError {
    fn from(err: HostError) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() {
            Self::HostExecution(UNKNOWN_ERROR.to_string())
        } else {
            Self::HostExecution(message)
        }
    }
}
