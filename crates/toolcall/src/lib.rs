//! Bridget tool calls: parsing, validation and dispatch of model tool calls.
//!
//! A model asks for a privileged operation by writing a marker such as
//! `[TOOL_CALL:readFile({"filePath":"src/main.rs"})]` in its reply. This
//! crate turns those markers into requests, checks them against a fixed
//! catalog of tools and routes them to a [`Host`] that performs the work.
//!
//! # Overview
//!
//! - **Catalog**: the five tools a model may call and their parameters.
//! - **Parser**: extracts calls from free text, in textual order.
//! - **Validator**: checks required arguments and types before dispatch.
//! - **Dispatcher**: routes a validated call to the host and wraps the
//!   outcome in a uniform [`ToolCallResult`] envelope.
//! - **Host**: the capability boundary. [`LocalHost`] serves the local
//!   filesystem and shell under a [`policy::Policy`].
//!
//! # Example
//!
//! ```ignore
//! use toolcall::{Dispatcher, LocalHost};
//!
//! # async fn example() -> Result<(), toolcall::HostError> {
//! let host = LocalHost::builder(".").build()?;
//! let dispatcher = Dispatcher::new(host);
//!
//! let reply = r#"Let me look. [TOOL_CALL:listDirectory({"dirPath":"src"})]"#;
//! for call in dispatcher.execute_all(reply).await {
//!     println!("{} -> {:?}", call.request.tool_name, call.result);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod dispatch;
mod error;
mod host;
pub mod parser;
mod prompt;
pub mod providers;
mod types;
mod validate;

// Core request/response types
pub use types::{ToolCallRequest, ToolCallResult};

// Error types
pub use error::{HOST_UNAVAILABLE, HostError, ModelError, ToolError, UNKNOWN_ERROR};

// Catalog, parsing and validation
pub use catalog::{Parameter, ToolDefinition, ToolKind};
pub use parser::{
    MalformedCall, MalformedReason, ParseOutcome, format_tool_call, parse_tool_calls, scan,
};
pub use validate::{ArgumentMode, ToolInvocation, validate};

// Execution
pub use dispatch::{DispatchedCall, Dispatcher};
pub use host::{Host, LocalHost, LocalHostBuilder};

// Providers and prompts
pub use prompt::{DEFAULT_TEMPLATE, PromptEnvironment, SystemPrompt};
pub use providers::{EnvKeys, KeySource, OllamaClient, Provider, ProviderConfig, Providers};
