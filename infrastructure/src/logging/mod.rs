//! Conversation logging

mod jsonl;

pub use jsonl::JsonlConversationLogger;
