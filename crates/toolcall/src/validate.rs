//! Argument validation: from a loosely typed request to a typed invocation.

use crate::catalog::{self, ToolKind};
use crate::error::ToolError;
use crate::types::ToolCallRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How argument values are coerced into their declared string type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentMode {
    /// Strings pass through; numbers and booleans are stringified.
    #[default]
    Lenient,
    /// Only JSON strings are accepted.
    Strict,
}

/// A validated call with typed arguments, one variant per tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    ReadFile {
        file_path: String,
    },
    WriteFile {
        file_path: String,
        content: String,
    },
    ListDirectory {
        dir_path: String,
    },
    ExecuteCommand {
        command: String,
        working_directory: Option<String>,
    },
    SearchFiles {
        query: String,
        directory: Option<String>,
        file_pattern: Option<String>,
    },
}

impl ToolInvocation {
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::ReadFile { .. } => ToolKind::ReadFile,
            Self::WriteFile { .. } => ToolKind::WriteFile,
            Self::ListDirectory { .. } => ToolKind::ListDirectory,
            Self::ExecuteCommand { .. } => ToolKind::ExecuteCommand,
            Self::SearchFiles { .. } => ToolKind::SearchFiles,
        }
    }
}

/// Check a request against the catalog and build its typed invocation.
///
/// Fails with [`ToolError::UnknownTool`] for names outside the catalog and
/// with [`ToolError::MissingRequiredArgument`] for the first absent
/// required key. Extra arguments are ignored.
pub fn validate(
    request: &ToolCallRequest,
    mode: ArgumentMode,
) -> Result<ToolInvocation, ToolError> {
    let definition = catalog::lookup(&request.tool_name)
        .ok_or_else(|| ToolError::UnknownTool(request.tool_name.clone()))?;

    if let Some(missing) = definition
        .required()
        .find(|name| !request.arguments.contains_key(*name))
    {
        return Err(ToolError::MissingRequiredArgument(missing.to_string()));
    }

    let args = Arguments { request, mode };
    let invocation = match definition.kind {
        ToolKind::ReadFile => ToolInvocation::ReadFile {
            file_path: args.required("filePath")?,
        },
        ToolKind::WriteFile => ToolInvocation::WriteFile {
            file_path: args.required("filePath")?,
            content: args.required("content")?,
        },
        ToolKind::ListDirectory => ToolInvocation::ListDirectory {
            dir_path: args.required("dirPath")?,
        },
        ToolKind::ExecuteCommand => ToolInvocation::ExecuteCommand {
            command: args.required("command")?,
            working_directory: args.optional("workingDirectory")?,
        },
        ToolKind::SearchFiles => ToolInvocation::SearchFiles {
            query: args.required("query")?,
            directory: args.optional("directory")?,
            file_pattern: args.optional("filePattern")?,
        },
    };
    Ok(invocation)
}

struct Arguments<'a> {
    request: &'a ToolCallRequest,
    mode: ArgumentMode,
}

impl Arguments<'_> {
    fn required(&self, name: &str) -> Result<String, ToolError> {
        match self.request.argument(name) {
            Some(value) => self.coerce(value).ok_or_else(|| invalid(name)),
            None => Err(ToolError::MissingRequiredArgument(name.to_string())),
        }
    }

    fn optional(&self, name: &str) -> Result<Option<String>, ToolError> {
        match self.request.argument(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.coerce(value).map(Some).ok_or_else(|| invalid(name)),
        }
    }

    fn coerce(&self, value: &Value) -> Option<String> {
        match (value, self.mode) {
            (Value::String(s), _) => Some(s.clone()),
            (Value::Number(n), ArgumentMode::Lenient) => Some(n.to_string()),
            (Value::Bool(b), ArgumentMode::Lenient) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn invalid(name: &str) -> ToolError {
    ToolError::InvalidArgument {
        name: name.to_string(),
        expected: "string",
    }
}
