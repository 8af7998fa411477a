//! Conversation logging port
//!
//! Structured record of completed turns and notable events. Adapters
//! append to durable storage; logging failures never affect a turn.

pub trait ConversationLogger: Send + Sync {
    /// A turn completed: user utterance plus the final assistant reply.
    fn log_turn(&self, session_id: &str, user: &str, assistant: &str);

    /// A notable orchestration event (compaction, escalation, ...).
    fn log_event(&self, event_type: &str, payload: serde_json::Value);
}
