//! Ollama-style LLM gateway adapter
//!
//! Talks to a local chat endpoint (`POST /api/chat`, NDJSON streaming).
//! Any backend speaking the same wire shape can be plugged in.

mod gateway;
mod types;

pub use gateway::OllamaGateway;
pub use types::{WireChatRequest, WireChunk, WireMessage, WireToolCall};
