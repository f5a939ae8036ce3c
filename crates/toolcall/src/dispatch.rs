//! Routing of validated calls to the host.

use crate::error::ToolError;
use crate::host::Host;
use crate::parser;
use crate::types::{ToolCallRequest, ToolCallResult};
use crate::validate::{ArgumentMode, ToolInvocation, validate};
use tracing::{debug, warn};

/// A request paired with the result it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedCall {
    pub request: ToolCallRequest,
    pub result: ToolCallResult,
}

/// Executes tool calls against an optional host.
///
/// Without a host every call fails with the fixed
/// [`HOST_UNAVAILABLE`](crate::HOST_UNAVAILABLE) message. Calls are
/// stateless: nothing is remembered between them.
#[derive(Debug, Clone)]
pub struct Dispatcher<H> {
    host: Option<H>,
    mode: ArgumentMode,
}

impl<H: Host> Dispatcher<H> {
    pub fn new(host: H) -> Self {
        Self {
            host: Some(host),
            mode: ArgumentMode::default(),
        }
    }

    /// A dispatcher with no host attached.
    pub fn unavailable() -> Self {
        Self {
            host: None,
            mode: ArgumentMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ArgumentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_available(&self) -> bool {
        self.host.is_some()
    }

    /// Execute one call. Never fails; errors become failed results.
    pub async fn execute(&self, request: &ToolCallRequest) -> ToolCallResult {
        match self.try_execute(request).await {
            Ok(result) => result,
            Err(err) => {
                warn!(tool = %request.tool_name, error = %err, "tool call failed");
                ToolCallResult::failure(err.to_string())
            }
        }
    }

    /// Parse `text` and execute each call in order, one at a time.
    pub async fn execute_all(&self, text: &str) -> Vec<DispatchedCall> {
        let mut dispatched = Vec::new();
        for request in parser::parse_tool_calls(text) {
            let result = self.execute(&request).await;
            dispatched.push(DispatchedCall { request, result });
        }
        dispatched
    }

    async fn try_execute(&self, request: &ToolCallRequest) -> Result<ToolCallResult, ToolError> {
        let Some(host) = &self.host else {
            return Err(ToolError::HostUnavailable);
        };
        let invocation = validate(request, self.mode)?;
        debug!(tool = %invocation.kind(), "dispatching tool call");

        let result = match &invocation {
            ToolInvocation::ReadFile { file_path } => host.read_file(file_path).await,
            ToolInvocation::WriteFile { file_path, content } => {
                host.write_file(file_path, content).await
            }
            ToolInvocation::ListDirectory { dir_path } => host.list_directory(dir_path).await,
            ToolInvocation::ExecuteCommand {
                command,
                working_directory,
            } => {
                host.execute_command(command, working_directory.as_deref())
                    .await
            }
            ToolInvocation::SearchFiles {
                query,
                directory,
                file_pattern,
            } => {
                host.search_files(query, directory.as_deref(), file_pattern.as_deref())
                    .await
            }
        };
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HOST_UNAVAILABLE, HostError, UNKNOWN_ERROR};
    use serde_json::{Map, Value, json};
    use std::sync::Mutex;

    /// Records every host call and answers from a fixed script.
    #[derive(Default)]
    struct FakeHost {
        calls: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    impl FakeHost {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Default::default()
            }
        }

        fn record(&self, call: String) -> Result<ToolCallResult, HostError> {
            self.calls.lock().unwrap().push(call.clone());
            match &self.fail_with {
                Some(message) => Err(HostError::Failed(message.clone())),
                None => Ok(ToolCallResult::success(json!({ "echo": call }))),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Host for FakeHost {
        async fn read_file(&self, path: &str) -> Result<ToolCallResult, HostError> {
            self.record(format!("read {path}"))
        }

        async fn write_file(&self, path: &str, content: &str) -> Result<ToolCallResult, HostError> {
            self.record(format!("write {path} {content}"))
        }

        async fn list_directory(&self, path: &str) -> Result<ToolCallResult, HostError> {
            self.record(format!("list {path}"))
        }

        async fn execute_command(
            &self,
            command: &str,
            working_directory: Option<&str>,
        ) -> Result<ToolCallResult, HostError> {
            self.record(format!("exec {command} in {working_directory:?}"))
        }

        async fn search_files(
            &self,
            query: &str,
            directory: Option<&str>,
            file_pattern: Option<&str>,
        ) -> Result<ToolCallResult, HostError> {
            self.record(format!("search {query} {directory:?} {file_pattern:?}"))
        }
    }

    fn request(name: &str, args: Value) -> ToolCallRequest {
        let Value::Object(map) = args else {
            panic!("arguments must be an object");
        };
        ToolCallRequest::new(name, map)
    }

    #[tokio::test]
    async fn missing_host_fails_every_call() {
        let dispatcher = Dispatcher::<FakeHost>::unavailable();
        assert!(!dispatcher.is_available());

        let result = dispatcher
            .execute(&request("readFile", json!({"filePath": "a.txt"})))
            .await;
        assert!(!result.is_success());
        assert_eq!(result.error(), Some(HOST_UNAVAILABLE));

        let bogus = dispatcher.execute(&ToolCallRequest::new("bogus", Map::new())).await;
        assert_eq!(bogus.error(), Some(HOST_UNAVAILABLE));
    }

    #[tokio::test]
    async fn execute_command_passes_host_envelope_through() {
        let dispatcher = Dispatcher::new(FakeHost::default());
        let result = dispatcher
            .execute(&request("executeCommand", json!({"command": "echo hi"})))
            .await;
        assert_eq!(result, ToolCallResult::success(json!({"echo": "exec echo hi in None"})));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failed_result() {
        let dispatcher = Dispatcher::new(FakeHost::default());
        let result = dispatcher.execute(&ToolCallRequest::new("bogus", Map::new())).await;
        assert_eq!(result.error(), Some("Unknown tool: bogus"));
        assert!(dispatcher.host.as_ref().unwrap().calls().is_empty());
    }

    #[tokio::test]
    async fn missing_argument_never_reaches_host() {
        let dispatcher = Dispatcher::new(FakeHost::default());
        let result = dispatcher.execute(&request("writeFile", json!({"filePath": "a"}))).await;
        assert_eq!(result.error(), Some("Missing required argument: content"));
        assert!(dispatcher.host.as_ref().unwrap().calls().is_empty());
    }

    #[tokio::test]
    async fn host_errors_become_failures() {
        let dispatcher = Dispatcher::new(FakeHost::failing("disk on fire"));
        let result = dispatcher.execute(&request("listDirectory", json!({"dirPath": "."}))).await;
        assert_eq!(result, ToolCallResult::failure("disk on fire"));

        let dispatcher = Dispatcher::new(FakeHost::failing(""));
        let result = dispatcher.execute(&request("listDirectory", json!({"dirPath": "."}))).await;
        assert_eq!(result.error(), Some(UNKNOWN_ERROR));
    }

    #[tokio::test]
    async fn repeated_calls_give_identical_results() {
        let dispatcher = Dispatcher::new(FakeHost::default());
        let call = request("listDirectory", json!({"dirPath": "src"}));
        let first = dispatcher.execute(&call).await;
        let second = dispatcher.execute(&call).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn execute_all_runs_in_textual_order() {
        let dispatcher = Dispatcher::new(FakeHost::default());
        let text = r#"First write, then read back.
[TOOL_CALL:writeFile({"filePath":"a.txt","content":"x"})]
[TOOL_CALL:readFile({"filePath":"a.txt"})]
[TOOL_CALL:readFile({broken})]
[TOOL_CALL:searchFiles({"query":"x","filePattern":"*.txt"})]"#;

        let dispatched = dispatcher.execute_all(text).await;
        assert_eq!(dispatched.len(), 3);
        assert!(dispatched.iter().all(|d| d.result.is_success()));
        assert_eq!(
            dispatcher.host.as_ref().unwrap().calls(),
            [
                "write a.txt x",
                "read a.txt",
                "search x None Some(\"*.txt\")",
            ]
        );
    }

    #[tokio::test]
    async fn strict_mode_is_applied() {
        let dispatcher = Dispatcher::new(FakeHost::default()).with_mode(ArgumentMode::Strict);
        let result = dispatcher.execute(&request("readFile", json!({"filePath": 7}))).await;
        assert_eq!(result.error(), Some("Invalid argument filePath: expected string"));
    }
}
