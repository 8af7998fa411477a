//! Conversation sessions: messages, turns, and the compaction model
//!
//! A session is an append-only sequence of turns plus an optional summary
//! of turns that have been compacted away. The pair `(summary, turns)` is
//! the full conversational context.

use crate::core::string::estimate_tokens;
use crate::tool::entities::RawToolCall;
use serde::{Deserialize, Serialize};

/// Message role as consumed by the LLM gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// The unit consumed by the LLM gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Structured tool calls attached to an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<RawToolCall>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A tool-role message carrying an execution result, keyed by the
    /// request id of the originating call.
    pub fn tool(request_id: &str, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: format!("[{}] {}", request_id, content.into()),
            tool_calls: Vec::new(),
        }
    }
}

/// One user utterance plus the assistant's final reply.
/// Immutable once completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

impl Turn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }

    fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.user) + estimate_tokens(&self.assistant)
    }
}

/// Compact when history exceeds this percentage of the context window.
pub const CONTEXT_THRESHOLD_PERCENT: usize = 70;

/// Turns kept intact through a compaction.
pub const KEEP_RECENT_TURNS: usize = 4;

/// An ordered sequence of turns with project context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub project_dir: String,
    pub turns: Vec<Turn>,
    /// Summary of turns dropped by compaction; empty if none.
    pub summary: String,
}

impl Session {
    pub fn new(id: impl Into<String>, project_dir: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_dir: project_dir.into(),
            turns: Vec::new(),
            summary: String::new(),
        }
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.summary.clear();
    }

    /// Estimated token count of summary plus all retained turns.
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.summary)
            + self.turns.iter().map(Turn::estimated_tokens).sum::<usize>()
    }

    /// Whether the history exceeds the compaction threshold for the
    /// given context window.
    pub fn needs_compaction(&self, context_window: usize) -> bool {
        let threshold = context_window * CONTEXT_THRESHOLD_PERCENT / 100;
        self.estimated_tokens() > threshold
    }

    /// Split off the turns to summarize, keeping the most recent ones in
    /// place. Returns `None` when there is nothing worth compacting.
    pub fn split_for_compaction(&mut self) -> Option<Vec<Turn>> {
        if self.turns.len() < 2 {
            return None;
        }
        let keep = KEEP_RECENT_TURNS.min(self.turns.len() / 2).max(1);
        let cut = self.turns.len() - keep;
        if cut == 0 {
            return None;
        }
        let to_summarize: Vec<Turn> = self.turns.drain(..cut).collect();
        Some(to_summarize)
    }

    /// Fold a fresh summary into the stored one.
    pub fn extend_summary(&mut self, new_summary: &str) {
        if self.summary.is_empty() {
            self.summary = new_summary.to_string();
        } else {
            self.summary = format!("{}\n\nMore recently: {}", self.summary, new_summary);
        }
    }

    /// The recent turns rendered as gateway messages, most recent last.
    pub fn recent_messages(&self, max_turns: usize) -> Vec<Message> {
        let start = self.turns.len().saturating_sub(max_turns);
        self.turns[start..]
            .iter()
            .flat_map(|t| {
                [
                    Message::user(t.user.clone()),
                    Message::assistant(t.assistant.clone()),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn_of_size(chars: usize) -> Turn {
        Turn::new("u".repeat(chars / 2), "a".repeat(chars / 2))
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        let tool = Message::tool("req-1", "ok");
        assert_eq!(tool.role, Role::Tool);
        assert!(tool.content.starts_with("[req-1]"));
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn test_needs_compaction_threshold() {
        let mut session = Session::new("s1", "/tmp");
        // 8192-token window, 70% threshold = 5734 tokens = ~22937 chars
        for _ in 0..5 {
            session.push_turn(turn_of_size(4000));
        }
        assert!(!session.needs_compaction(8192));
        for _ in 0..3 {
            session.push_turn(turn_of_size(4000));
        }
        assert!(session.needs_compaction(8192));
    }

    #[test]
    fn test_split_keeps_recent_turns() {
        let mut session = Session::new("s1", "/tmp");
        for i in 0..10 {
            session.push_turn(Turn::new(format!("q{i}"), format!("a{i}")));
        }
        let dropped = session.split_for_compaction().unwrap();
        assert_eq!(dropped.len(), 6);
        assert_eq!(session.turns.len(), KEEP_RECENT_TURNS);
        assert_eq!(session.turns[0].user, "q6");
    }

    #[test]
    fn test_split_too_small_is_none() {
        let mut session = Session::new("s1", "/tmp");
        session.push_turn(Turn::new("q", "a"));
        assert!(session.split_for_compaction().is_none());
    }

    #[test]
    fn test_extend_summary() {
        let mut session = Session::new("s1", "/tmp");
        session.extend_summary("first part");
        assert_eq!(session.summary, "first part");
        session.extend_summary("second part");
        assert!(session.summary.contains("More recently: second part"));
    }

    #[test]
    fn test_recent_messages_order() {
        let mut session = Session::new("s1", "/tmp");
        session.push_turn(Turn::new("q1", "a1"));
        session.push_turn(Turn::new("q2", "a2"));
        let messages = session.recent_messages(1);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "q2");
        assert_eq!(messages[1].role, Role::Assistant);
    }
}
