//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown agent kind: {0}")]
    UnknownAgentKind(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid tool call: {0}")]
    InvalidToolCall(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
