//! Tool executor port
//!
//! Workers dispatch validated tool calls through this port. The local
//! adapter runs them in-process; the remote adapter forwards them over
//! the tool-callback channel to a trusted client.

use async_trait::async_trait;
use conductor_domain::tool::entities::ToolCall;
use conductor_domain::tool::value_objects::ToolResult;

#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Execute a tool call. Tool failures are data (`ToolResult` with
    /// `success == false`), never `Err`; the worker loop is the
    /// containment boundary for them.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
