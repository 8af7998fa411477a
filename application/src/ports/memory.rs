//! Long-term memory port
//!
//! Cross-session persistence backed by a vector store. Both operations
//! are best-effort from the orchestrator's point of view: failures are
//! logged, never surfaced to the user.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Memory store unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Store operation failed: {0}")]
    Store(String),
}

#[async_trait]
pub trait MemoryPort: Send + Sync {
    /// Retrieve up to `limit` memory strings relevant to the query.
    async fn search(
        &self,
        query: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, MemoryError>;

    /// Persist a durable fact extracted from an exchange.
    async fn store(&self, content: &str, session_id: &str) -> Result<(), MemoryError>;
}
