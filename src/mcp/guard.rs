//! Connection guard shared by every tool
//!
//! A tool never raises past this boundary: callers always get a string back,
//! either the tool's payload or a formatted error.

use std::future::Future;

use crate::error::{LabelStudioMcpError, Result};
use crate::label_studio::LabelStudioApi;
use crate::mcp::types::CallToolResult;

/// Returned by every tool when no Label Studio connection was configured
pub const UNAVAILABLE_MESSAGE: &str = "Error: Label Studio client not available. \
Please check server logs for initialization errors \
(e.g., missing 'LABEL_STUDIO_API_KEY', invalid key, or connection issue with 'LABEL_STUDIO_URL').";

/// The string a tool hands back, marked as success or failure
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Success(String),
    Failure(String),
}

impl ToolOutput {
    pub fn text(&self) -> &str {
        match self {
            ToolOutput::Success(text) | ToolOutput::Failure(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutput::Failure(_))
    }

    pub fn into_text(self) -> String {
        match self {
            ToolOutput::Success(text) | ToolOutput::Failure(text) => text,
        }
    }

    /// Wrap as an MCP tool result; the text is passed through unchanged
    pub fn into_call_result(self) -> CallToolResult {
        match self {
            ToolOutput::Success(text) => CallToolResult::text(text),
            ToolOutput::Failure(text) => CallToolResult::error(text),
        }
    }
}

/// `Error in function '<name>': [<kind>] <details>`
pub fn format_tool_error(name: &str, err: &LabelStudioMcpError) -> String {
    format!("Error in function '{}': [{}] {}", name, err.kind(), err)
}

/// Report a failed remote call together with its cause chain
pub fn report_remote_failure(operation: &str, err: LabelStudioMcpError) -> ToolOutput {
    let kind = err.kind();
    let message = err.to_string();
    let trace = format!("{:?}", anyhow::Error::new(err));
    tracing::warn!("Label Studio {} failed: {}", operation, message);
    ToolOutput::Failure(format!(
        "Error during Label Studio {}: {} - {}\n{}",
        operation, kind, message, trace
    ))
}

/// Run a tool body behind the connection check.
///
/// With no connection the body is not invoked and [`UNAVAILABLE_MESSAGE`] is
/// returned. Errors from the body are turned into [`format_tool_error`] text.
pub async fn require_connection<'a, F, Fut>(
    name: &str,
    client: Option<&'a dyn LabelStudioApi>,
    body: F,
) -> ToolOutput
where
    F: FnOnce(&'a dyn LabelStudioApi) -> Fut,
    Fut: Future<Output = Result<ToolOutput>>,
{
    let Some(api) = client else {
        return ToolOutput::Failure(UNAVAILABLE_MESSAGE.to_string());
    };

    match body(api).await {
        Ok(output) => output,
        Err(err) => {
            tracing::warn!("Tool {} failed: {}", name, err);
            ToolOutput::Failure(format_tool_error(name, &err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LabelStudioApiError, McpError};

    #[test]
    fn test_format_tool_error() {
        let err: LabelStudioMcpError = LabelStudioApiError::NotFound {
            entity: "Project",
            id: 9,
        }
        .into();
        assert_eq!(
            format_tool_error("get_project_details", &err),
            "Error in function 'get_project_details': [NotFound] Label Studio API error: Project not found: 9"
        );
    }

    #[test]
    fn test_missing_connection_skips_body() {
        let mut called = false;
        let output = tokio_test::block_on(require_connection("list_projects", None, |_| {
            called = true;
            async { Ok(ToolOutput::Success(String::new())) }
        }));
        assert!(!called);
        assert_eq!(output, ToolOutput::Failure(UNAVAILABLE_MESSAGE.to_string()));
    }

    #[test]
    fn test_remote_failure_includes_cause_chain() {
        let err: LabelStudioMcpError = McpError::InvalidArguments {
            message: "bad".to_string(),
        }
        .into();
        let output = report_remote_failure("task import API call", err);
        assert!(output.is_failure());
        let text = output.text();
        assert!(text.starts_with("Error during Label Studio task import API call: InvalidArguments - "));
        assert!(text.contains("Caused by"));
    }
}
