//! Tool domain: the typed tool-call model, result value objects, wire
//! records for the remote callback channel, and tool schemas for the LLM.

pub mod entities;
pub mod intent;
pub mod remote;
pub mod schema;
pub mod value_objects;

pub use entities::{RawToolCall, ToolCall};
pub use remote::{ToolRequest, ToolResponse};
pub use value_objects::{ToolError, ToolResult, ToolResultMetadata};
