//! Infrastructure layer for conductor
//!
//! Adapters implementing the application-layer ports: the Ollama-style
//! streaming LLM gateway, the local tool executor, the remote
//! tool-callback transport, the Qdrant memory store, the configuration
//! loader, and the JSONL conversation logger.

pub mod config;
pub mod logging;
pub mod memory;
pub mod ollama;
pub mod remote;
pub mod tools;

pub use config::{ConfigError, ConfigLoader, FileConfig};
pub use logging::JsonlConversationLogger;
pub use memory::QdrantMemoryStore;
pub use ollama::OllamaGateway;
pub use remote::{CallbackListener, ToolCallbackClient};
pub use tools::LocalToolExecutor;
