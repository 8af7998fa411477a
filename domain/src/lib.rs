//! Domain layer for conductor
//!
//! This crate contains the core business logic, entities, and value objects:
//! worker specifications, the typed tool-call model, plan parsing, routing
//! classification, and session/context bookkeeping. It has no dependencies
//! on infrastructure or presentation concerns.

pub mod agent;
pub mod core;
pub mod plan;
pub mod prompt;
pub mod routing;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use agent::{
    capability::Capability,
    entities::{AgentKind, ModelTier, ToolCallLogEntry, WorkerResult, WorkerSpec},
};
pub use crate::core::error::DomainError;
pub use plan::{Complexity, Plan, PlanError, PlanStep};
pub use routing::RoutingDecision;
pub use session::{Message, Role, Session, Turn};
pub use tool::{
    entities::{RawToolCall, ToolCall},
    remote::{ToolRequest, ToolResponse},
    value_objects::{ToolError, ToolResult, ToolResultMetadata},
};
