//! Static registry of the tools a model may call.
//!
//! The same definitions feed the system prompt and argument validation, so
//! the two never drift apart.

use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// The closed set of tools understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ReadFile,
    WriteFile,
    ListDirectory,
    ExecuteCommand,
    SearchFiles,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        Self::ReadFile,
        Self::WriteFile,
        Self::ListDirectory,
        Self::ExecuteCommand,
        Self::SearchFiles,
    ];

    /// Wire name used in the tool-call grammar.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadFile => "readFile",
            Self::WriteFile => "writeFile",
            Self::ListDirectory => "listDirectory",
            Self::ExecuteCommand => "executeCommand",
            Self::SearchFiles => "searchFiles",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    /// JSON schema type name.
    pub type_name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl Parameter {
    const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            type_name: "string",
            description,
            required: true,
        }
    }

    const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            type_name: "string",
            description,
            required: false,
        }
    }
}

/// A tool definition exposed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDefinition {
    pub kind: ToolKind,
    pub description: &'static str,
    pub parameters: &'static [Parameter],
}

impl ToolDefinition {
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Names of the required parameters, in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters.iter().filter(|p| p.required).map(|p| p.name)
    }

    pub fn parameter(&self, name: &str) -> Option<&'static Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON schema for the parameters object.
    pub fn schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": p.type_name, "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self.required().collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

static TOOLS: [ToolDefinition; 5] = [
    ToolDefinition {
        kind: ToolKind::ReadFile,
        description: "Read the contents of a file",
        parameters: &[Parameter::required("filePath", "The path to the file to read")],
    },
    ToolDefinition {
        kind: ToolKind::WriteFile,
        description: "Write content to a file",
        parameters: &[
            Parameter::required("filePath", "The path to the file to write"),
            Parameter::required("content", "The content to write to the file"),
        ],
    },
    ToolDefinition {
        kind: ToolKind::ListDirectory,
        description: "List the contents of a directory",
        parameters: &[Parameter::required("dirPath", "The path to the directory to list")],
    },
    ToolDefinition {
        kind: ToolKind::ExecuteCommand,
        description: "Execute a shell command",
        parameters: &[
            Parameter::required("command", "The command to execute"),
            Parameter::optional(
                "workingDirectory",
                "The working directory to execute the command in",
            ),
        ],
    },
    ToolDefinition {
        kind: ToolKind::SearchFiles,
        description: "Search for files containing specific text",
        parameters: &[
            Parameter::required("query", "The text to search for"),
            Parameter::optional("directory", "The directory to search in"),
            Parameter::optional("filePattern", "File pattern to match (e.g., '*.ts', '*.js')"),
        ],
    },
];

/// All tool definitions, in a fixed order.
pub fn tools() -> &'static [ToolDefinition] {
    &TOOLS
}

/// Find a tool by its wire name.
pub fn lookup(name: &str) -> Option<&'static ToolDefinition> {
    TOOLS.iter().find(|tool| tool.name() == name)
}

/// Definition for a known tool kind.
pub fn definition(kind: ToolKind) -> &'static ToolDefinition {
    match kind {
        ToolKind::ReadFile => &TOOLS[0],
        ToolKind::WriteFile => &TOOLS[1],
        ToolKind::ListDirectory => &TOOLS[2],
        ToolKind::ExecuteCommand => &TOOLS[3],
        ToolKind::SearchFiles => &TOOLS[4],
    }
}
