//! Host capability boundary.

mod local;

pub use local::{LocalHost, LocalHostBuilder};

use crate::error::HostError;
use crate::types::ToolCallResult;
use std::future::Future;

/// Privileged operations a model may request.
///
/// This is the boundary between the tool-call loop and side effects.
/// Each operation returns the host's own result envelope; an `Err` means
/// the operation itself could not be carried out.
pub trait Host: Send + Sync {
    fn read_file(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<ToolCallResult, HostError>> + Send;

    fn write_file(
        &self,
        path: &str,
        content: &str,
    ) -> impl Future<Output = Result<ToolCallResult, HostError>> + Send;

    fn list_directory(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<ToolCallResult, HostError>> + Send;

    fn execute_command(
        &self,
        command: &str,
        working_directory: Option<&str>,
    ) -> impl Future<Output = Result<ToolCallResult, HostError>> + Send;

    fn search_files(
        &self,
        query: &str,
        directory: Option<&str>,
        file_pattern: Option<&str>,
    ) -> impl Future<Output = Result<ToolCallResult, HostError>> + Send;
}
