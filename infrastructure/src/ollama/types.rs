//! Wire types for the streaming chat endpoint
//!
//! Request: `{model, messages[], tools?[], stream, options}`.
//! Response stream: one JSON object per line,
//! `{message: {role, content, tool_calls?}, done, ...usage counters}`.

use conductor_domain::session::{Message, Role};
use conductor_domain::tool::entities::RawToolCall;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct WireChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
    pub stream: bool,
    pub options: WireOptions,
}

#[derive(Debug, Serialize)]
pub struct WireOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
            tool_calls: Vec::new(),
        }
    }
}

/// Structured tool call as emitted by tool-capable models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl WireToolCall {
    pub fn into_raw(self) -> RawToolCall {
        RawToolCall::new(self.function.name, self.function.arguments)
    }
}

/// One NDJSON line of the response stream.
#[derive(Debug, Clone, Deserialize)]
pub struct WireChunk {
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Error payload some backends emit mid-stream
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_shape() {
        let request = WireChatRequest {
            model: "llama3.2:3b".to_string(),
            messages: vec![WireMessage::from(&Message::user("hi"))],
            tools: None,
            stream: true,
            options: WireOptions {
                temperature: 0.7,
                num_predict: 4096,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2:3b");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_chunk_with_tool_calls() {
        let line = r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"read","arguments":{"path":"a.txt"}}}]},"done":false}"#;
        let chunk: WireChunk = serde_json::from_str(line).unwrap();
        let message = chunk.message.unwrap();
        assert_eq!(message.tool_calls.len(), 1);
        let raw = message.tool_calls[0].clone().into_raw();
        assert_eq!(raw.name, "read");
        assert_eq!(raw.string_arg("path"), Some("a.txt"));
    }

    #[test]
    fn test_terminal_chunk_with_usage() {
        let line = r#"{"message":{"role":"assistant","content":"bye"},"done":true,"prompt_eval_count":12,"eval_count":34}"#;
        let chunk: WireChunk = serde_json::from_str(line).unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.prompt_eval_count, Some(12));
        assert_eq!(chunk.eval_count, Some(34));
    }
}
