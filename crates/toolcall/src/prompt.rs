//! System prompt assembly.
//!
//! The tool section is generated from the catalog and the call examples
//! are rendered with the same grammar the parser reads, so instructions and
//! validation cannot disagree.

use crate::catalog::{self, ToolKind};
use crate::parser::format_tool_call;
use regex::{Captures, Regex};
use serde_json::{Value, json};
use std::sync::LazyLock;
use sysinfo::System;

/// Default instructions. Placeholders are written `%name%`.
pub const DEFAULT_TEMPLATE: &str = "\
You are %ai_model%, a coding assistant embedded in a programming environment.
Answer the user's questions accurately and stay on topic.

## Tools

You can work with the user's project through these tools:

%tools%

## Calling a tool

Write each call on its own line using exactly this format, with no spaces
around the colon or the parentheses and a JSON object as the argument:

%tool_examples%

Rules:
1. Arguments must be valid, properly escaped JSON.
2. One call per line, never inside a code block.
3. After calling tools, wait for their results before answering.
4. Make as many calls as you need: list directories, read related files and
   search for patterns before drawing conclusions.

## Environment

Date: %date%
Time: %time%
Operating system: %os_platform% (%os_version%)
Architecture: %os_arch%
User: %username%
Home directory: %home_directory%

## Project

%codebase%
";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "%(ai_model|date|time|os_platform|os_version|os_arch|username|home_directory|codebase|tools|tool_examples)%",
    )
    .expect("valid placeholder pattern")
});

/// Host details substituted into the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEnvironment {
    pub date: String,
    pub time: String,
    pub os_platform: String,
    pub os_version: String,
    pub os_arch: String,
    pub username: String,
    pub home_directory: String,
}

impl PromptEnvironment {
    /// Snapshot of the current machine and clock.
    pub fn detect() -> Self {
        let now = chrono::Local::now();
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            os_platform: std::env::consts::OS.to_string(),
            os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
            os_arch: std::env::consts::ARCH.to_string(),
            username: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
            home_directory: dirs::home_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Builder for the system prompt sent to a model.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    model: String,
    template: String,
    codebase: String,
}

impl SystemPrompt {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            template: DEFAULT_TEMPLATE.to_string(),
            codebase: "No project information available.".to_string(),
        }
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Free-form description of the open project.
    pub fn codebase(mut self, codebase: impl Into<String>) -> Self {
        self.codebase = codebase.into();
        self
    }

    /// Render against the current machine.
    pub fn render(&self) -> String {
        self.render_with(&PromptEnvironment::detect())
    }

    /// Placeholders are filled in a single pass, so values that happen to
    /// contain `%name%` text are inserted as written.
    pub fn render_with(&self, env: &PromptEnvironment) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures<'_>| match &caps[1] {
                "ai_model" => self.model.clone(),
                "date" => env.date.clone(),
                "time" => env.time.clone(),
                "os_platform" => env.os_platform.clone(),
                "os_version" => env.os_version.clone(),
                "os_arch" => env.os_arch.clone(),
                "username" => env.username.clone(),
                "home_directory" => env.home_directory.clone(),
                "codebase" => self.codebase.clone(),
                "tools" => tool_list(),
                "tool_examples" => tool_examples(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// One bullet per catalog entry, optional parameters marked with `?`.
fn tool_list() -> String {
    catalog::tools()
        .iter()
        .map(|tool| {
            let params: Vec<String> = tool
                .parameters
                .iter()
                .map(|p| {
                    if p.required {
                        p.name.to_string()
                    } else {
                        format!("{}?", p.name)
                    }
                })
                .collect();
            format!(
                "- **{}**({}): {}",
                tool.name(),
                params.join(", "),
                tool.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn example_arguments(kind: ToolKind) -> Value {
    match kind {
        ToolKind::ReadFile => json!({"filePath": "src/main.rs"}),
        ToolKind::WriteFile => {
            json!({"filePath": "src/greeting.rs", "content": "pub fn greet() {\n    println!(\"hi\");\n}\n"})
        }
        ToolKind::ListDirectory => json!({"dirPath": "src"}),
        ToolKind::ExecuteCommand => json!({"command": "git status", "workingDirectory": "."}),
        ToolKind::SearchFiles => {
            json!({"query": "TODO", "directory": "src", "filePattern": "*.rs"})
        }
    }
}

fn tool_examples() -> String {
    ToolKind::ALL
        .into_iter()
        .map(|kind| format_tool_call(kind.as_str(), &example_arguments(kind)))
        .collect::<Vec<_>>()
        .join("\n")
}
