//! Agent domain: capabilities, worker specifications, and results

pub mod capability;
pub mod entities;

pub use capability::Capability;
pub use entities::{AgentKind, ModelTier, ToolCallLogEntry, WorkerResult, WorkerSpec};
