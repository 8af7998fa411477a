//! Wire records for the remote tool-callback channel
//!
//! When the orchestrator runs on a different host than the process that
//! owns tool execution, these records travel over a per-session
//! bidirectional stream. Correlation is by `request_id`; exactly one
//! response is accepted per outstanding request.

use crate::tool::value_objects::{ToolError, ToolResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Orchestrator → client: execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub request_id: String,
    pub session_id: String,
    pub tool_name: String,
    pub arguments: BTreeMap<String, String>,
    pub timeout_seconds: u64,
}

/// Client → orchestrator: result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub request_id: String,
    pub success: bool,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub error: String,
}

impl ToolResponse {
    pub fn ok(request_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            data: data.into(),
            error: String::new(),
        }
    }

    pub fn err(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            data: String::new(),
            error: error.into(),
        }
    }

    pub fn timed_out(request_id: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::err(
            request_id,
            format!("tool execution timed out after {timeout_seconds}s"),
        )
    }

    /// Convert back into the executor-facing result type.
    pub fn into_tool_result(self, tool_name: &str) -> ToolResult {
        if self.success {
            ToolResult::success(tool_name, self.data)
        } else {
            ToolResult::failure(tool_name, ToolError::execution_failed(self.error))
        }
    }
}

impl From<&ToolResult> for ToolResponse {
    fn from(result: &ToolResult) -> Self {
        // request_id is filled in by the transport layer
        if result.is_success() {
            ToolResponse::ok("", result.output().unwrap_or_default())
        } else {
            ToolResponse::err(
                "",
                result
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )
        }
    }
}
