//! Scripted fakes shared by the application-layer tests
//!
//! The scripted gateway returns queued responses in order (with an
//! optional repeating tail) and records the model and messages of every
//! request so tests can assert on routing and tier selection.

use crate::ports::llm_gateway::{
    ChatChunk, ChatRequest, ChatStream, GatewayError, LlmGateway, Usage,
};
use crate::ports::tool_executor::ToolExecutorPort;
use async_trait::async_trait;
use conductor_domain::session::Message;
use conductor_domain::tool::entities::{RawToolCall, ToolCall};
use conductor_domain::tool::value_objects::{ToolError, ToolResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// One scripted gateway response.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Plain text, streamed as two chunks
    Text(String),
    /// Structured tool calls with no text
    ToolCalls(Vec<RawToolCall>),
    /// Text and structured tool calls together
    TextWithCalls(String, Vec<RawToolCall>),
    /// Fail the stream with this error
    Error(GatewayError),
    /// Never complete (for timeout/cancellation tests)
    Hang,
    /// Delay, then the inner response
    Delayed(Duration, Box<ScriptedResponse>),
}

/// Gateway fake returning scripted responses in order.
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    /// Served when the queue is empty
    fallback: Option<ScriptedResponse>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    pub fn with_responses(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serve the same response for every request.
    pub fn repeating(response: ScriptedResponse) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: ScriptedResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Models of every request, in call order.
    pub fn models_used(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.model.clone())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Messages of the nth request.
    pub fn request_messages(&self, index: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[index].messages.clone()
    }

    fn next_response(&self) -> ScriptedResponse {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or(ScriptedResponse::Text("(no scripted response)".to_string()))
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError> {
        self.requests.lock().unwrap().push(request);
        let response = self.next_response();

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let response = match response {
                ScriptedResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    *inner
                }
                other => other,
            };
            match response {
                ScriptedResponse::Text(text) => {
                    let mid = text.len() / 2;
                    // Split on a char boundary to stream in two fragments
                    let mid = (0..=mid)
                        .rev()
                        .find(|i| text.is_char_boundary(*i))
                        .unwrap_or(0);
                    let (a, b) = text.split_at(mid);
                    let _ = tx
                        .send(Ok(ChatChunk {
                            content: a.to_string(),
                            ..Default::default()
                        }))
                        .await;
                    let _ = tx
                        .send(Ok(ChatChunk {
                            content: b.to_string(),
                            done: true,
                            usage: Some(Usage::default()),
                            ..Default::default()
                        }))
                        .await;
                }
                ScriptedResponse::ToolCalls(calls) => {
                    let _ = tx
                        .send(Ok(ChatChunk {
                            tool_calls: calls,
                            done: true,
                            ..Default::default()
                        }))
                        .await;
                }
                ScriptedResponse::TextWithCalls(text, calls) => {
                    let _ = tx
                        .send(Ok(ChatChunk {
                            content: text,
                            ..Default::default()
                        }))
                        .await;
                    let _ = tx
                        .send(Ok(ChatChunk {
                            tool_calls: calls,
                            done: true,
                            ..Default::default()
                        }))
                        .await;
                }
                ScriptedResponse::Error(e) => {
                    let _ = tx.send(Err(e)).await;
                }
                ScriptedResponse::Hang => {
                    // Keep the sender alive so the stream never ends
                    tx.closed().await;
                }
                // Nested delays are not supported by the scripts
                ScriptedResponse::Delayed(..) => unreachable!("nested Delayed"),
            }
        });

        Ok(rx)
    }
}

/// Tool executor fake: records calls, returns scripted failures or a
/// generic success.
pub struct MockToolExecutor {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, String>>,
    outputs: Mutex<HashMap<String, String>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            outputs: Mutex::new(HashMap::new()),
        }
    }

    /// Make every call to `tool` fail with this message.
    pub fn fail_tool(&self, tool: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(tool.to_string(), message.to_string());
    }

    /// Fix the output of `tool`.
    pub fn set_output(&self, tool: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(tool.to_string(), output.to_string());
    }

    /// Tool names in execution order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutorPort for MockToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let name = call.name().to_string();
        self.calls.lock().unwrap().push(name.clone());

        if let Some(message) = self.failures.lock().unwrap().get(&name) {
            return ToolResult::failure(&name, ToolError::execution_failed(message.clone()));
        }
        let output = self
            .outputs
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_else(|| "ok".to_string());
        ToolResult::success(&name, output)
    }
}
