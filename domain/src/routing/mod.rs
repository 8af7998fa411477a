//! Routing: classifying a user turn into a direct reply or a worker spawn
//!
//! The orchestrator accepts several shapes for routing tool calls:
//! structured calls from the gateway, JSON objects embedded in free text,
//! and keyword intent over the raw message. Each parser returns
//! `Option<RoutingDecision>` and the first hit wins.

pub mod intent;
pub mod json_scan;

pub use intent::{detect_response_intent, detect_user_intent, estimate_complexity};
pub use json_scan::{parse_embedded_tool_calls, scan_json_objects};

use crate::agent::entities::AgentKind;
use crate::tool::entities::RawToolCall;

/// The outcome of routing one user turn.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    /// Answer directly with the gateway's free text (knowledge-base role).
    Direct(String),
    /// Spawn a specialist with a task.
    Spawn { agent: AgentKind, task: String },
}

impl RoutingDecision {
    /// Build a spawn decision from a raw routing tool call, falling back
    /// to the user message when the call carries no task.
    pub fn from_raw_call(call: &RawToolCall, user_message: &str) -> Option<RoutingDecision> {
        let agent = AgentKind::from_spawn_tool(&call.name)?;
        let task = call
            .string_arg("task")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(user_message)
            .to_string();
        Some(RoutingDecision::Spawn { agent, task })
    }
}

/// Extract routing tool calls (`spawn_*`) from response text.
///
/// Only the first call is honored by the orchestrator (single-dispatch
/// contract); all are returned here so tests can assert that.
pub fn parse_routing_calls(text: &str) -> Vec<RawToolCall> {
    parse_embedded_tool_calls(text, &valid_spawn_names())
}

fn valid_spawn_names() -> Vec<String> {
    AgentKind::all()
        .iter()
        .filter(|k| k.is_routable())
        .map(|k| k.spawn_tool_name())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_routing_calls_from_text() {
        let text = r#"Routing this: {"name": "spawn_executor", "arguments": {"task": "write hello.py"}}"#;
        let calls = parse_routing_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "spawn_executor");

        let decision = RoutingDecision::from_raw_call(&calls[0], "original").unwrap();
        assert_eq!(
            decision,
            RoutingDecision::Spawn {
                agent: AgentKind::Executor,
                task: "write hello.py".to_string()
            }
        );
    }

    #[test]
    fn test_empty_task_falls_back_to_user_message() {
        let call = RawToolCall::new("spawn_explorer", json!({"task": ""}));
        let decision = RoutingDecision::from_raw_call(&call, "find the config").unwrap();
        assert_eq!(
            decision,
            RoutingDecision::Spawn {
                agent: AgentKind::Explorer,
                task: "find the config".to_string()
            }
        );
    }

    #[test]
    fn test_non_spawn_calls_are_ignored() {
        let text = r#"{"name": "read", "arguments": {"path": "a.txt"}}"#;
        assert!(parse_routing_calls(text).is_empty());
    }
}
