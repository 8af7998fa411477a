//! LLM Gateway port
//!
//! A streaming chat façade: one call, one stream of incremental chunks.
//! The gateway is stateless and transport-agnostic; the orchestrator
//! consumes chunks incrementally and never requires structured tool
//! calls (free-text JSON is parsed as a fallback).

use async_trait::async_trait;
use conductor_domain::session::Message;
use conductor_domain::tool::entities::RawToolCall;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during gateway operations
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Malformed chunk: {0}")]
    MalformedChunk(String),

    #[error("Gateway timeout")]
    Timeout,

    #[error("Stream closed unexpectedly")]
    StreamClosed,

    #[error("Cancelled")]
    Cancelled,
}

/// Generation parameters forwarded to the model.
#[derive(Debug, Clone)]
pub struct GenOptions {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Token usage counters reported on the terminal chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One streamed chunk: an incremental text fragment, any structured tool
/// calls accumulated so far, and a terminal marker with usage counters.
#[derive(Debug, Clone, Default)]
pub struct ChatChunk {
    pub content: String,
    pub tool_calls: Vec<RawToolCall>,
    pub done: bool,
    pub usage: Option<Usage>,
}

/// A chat request. `tools` may be empty; gateways must degrade
/// gracefully when the selected model does not support structured tool
/// calls.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<serde_json::Value>,
    pub options: GenOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            options: GenOptions::default(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_options(mut self, options: GenOptions) -> Self {
        self.options = options;
        self
    }
}

/// The stream of chunks produced by one chat call.
pub type ChatStream = mpsc::Receiver<Result<ChatChunk, GatewayError>>;

/// Gateway for LLM communication.
///
/// Implementations (adapters) live in the infrastructure layer; tests
/// use a scripted fake.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Start a streaming chat call. Errors that occur before any chunk is
    /// produced surface here; later failures arrive on the stream.
    async fn chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError>;
}

/// A fully accumulated chat response.
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    pub text: String,
    pub tool_calls: Vec<RawToolCall>,
    pub usage: Option<Usage>,
}

/// Drive a chat call to completion, accumulating chunks, with an overall
/// deadline and an optional cancellation signal.
pub async fn collect_chat(
    gateway: &dyn LlmGateway,
    request: ChatRequest,
    timeout: Duration,
    cancellation: Option<&CancellationToken>,
) -> Result<ChatOutcome, GatewayError> {
    let drain = async {
        let mut stream = gateway.chat(request).await?;
        let mut outcome = ChatOutcome::default();

        while let Some(chunk) = stream.recv().await {
            let chunk = chunk?;
            outcome.text.push_str(&chunk.content);
            // Structured calls arrive accumulated; keep the latest set
            if !chunk.tool_calls.is_empty() {
                outcome.tool_calls = chunk.tool_calls;
            }
            if chunk.done {
                outcome.usage = chunk.usage;
                break;
            }
        }
        Ok(outcome)
    };

    let deadline = tokio::time::timeout(timeout, drain);

    match cancellation {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(GatewayError::Cancelled),
                result = deadline => result.map_err(|_| GatewayError::Timeout)?,
            }
        }
        None => deadline.await.map_err(|_| GatewayError::Timeout)?,
    }
}
