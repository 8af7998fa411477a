//! Streaming gateway adapter
//!
//! Implements the `LlmGateway` port over `POST /api/chat` with NDJSON
//! streaming. A spawned task reads the byte stream, reassembles lines,
//! and forwards parsed chunks; malformed lines surface as typed errors
//! rather than silent truncation. When a model rejects the tools field
//! the request is retried once without it; the orchestrator parses
//! free-text tool calls as a fallback anyway.

use super::types::{WireChatRequest, WireChunk, WireMessage, WireOptions};
use async_trait::async_trait;
use conductor_application::ports::llm_gateway::{
    ChatChunk, ChatRequest, ChatStream, GatewayError, LlmGateway, Usage,
};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Gateway over an Ollama-compatible chat endpoint.
pub struct OllamaGateway {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            // Overall deadline is enforced per-call by the consumer;
            // this guards individual socket reads.
            .read_timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn wire_request(&self, request: &ChatRequest, with_tools: bool) -> WireChatRequest {
        WireChatRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: if with_tools && !request.tools.is_empty() {
                Some(request.tools.clone())
            } else {
                None
            },
            stream: true,
            options: WireOptions {
                temperature: request.options.temperature,
                num_predict: request.options.max_tokens,
            },
        }
    }

    async fn send(
        &self,
        request: &ChatRequest,
        with_tools: bool,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.wire_request(request, with_tools);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmGateway for OllamaGateway {
    async fn chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError> {
        debug!(model = %request.model, tools = request.tools.len(), "chat request");

        let response = match self.send(&request, true).await {
            Ok(response) => response,
            // Models without structured tool support reject the tools
            // field with a 400; degrade gracefully by retrying bare.
            Err(GatewayError::Http { status: 400, .. }) if !request.tools.is_empty() => {
                debug!(model = %request.model, "model rejected tools; retrying without them");
                self.send(&request, false).await?
            }
            Err(e) => return Err(e),
        };

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut tool_calls = Vec::new();

            while let Some(piece) = stream.next().await {
                let bytes = match piece {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let error = if e.is_timeout() {
                            GatewayError::Timeout
                        } else {
                            GatewayError::Connection(e.to_string())
                        };
                        let _ = tx.send(Err(error)).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    trace!(line, "gateway chunk");

                    let wire: WireChunk = match serde_json::from_str(line) {
                        Ok(wire) => wire,
                        Err(e) => {
                            warn!("malformed gateway chunk: {line}");
                            let _ = tx
                                .send(Err(GatewayError::MalformedChunk(e.to_string())))
                                .await;
                            return;
                        }
                    };

                    if let Some(error) = wire.error {
                        let _ = tx
                            .send(Err(GatewayError::Http {
                                status: 200,
                                message: error,
                            }))
                            .await;
                        return;
                    }

                    let mut chunk = ChatChunk::default();
                    if let Some(message) = wire.message {
                        chunk.content = message.content;
                        // Tool calls can arrive on any chunk; accumulate
                        for call in message.tool_calls {
                            tool_calls.push(call.into_raw());
                        }
                    }
                    chunk.tool_calls = tool_calls.clone();
                    chunk.done = wire.done;
                    if wire.done {
                        chunk.usage = Some(Usage {
                            prompt_tokens: wire.prompt_eval_count.unwrap_or(0),
                            completion_tokens: wire.eval_count.unwrap_or(0),
                        });
                    }

                    if tx.send(Ok(chunk)).await.is_err() {
                        return; // consumer gone
                    }
                    if wire.done {
                        return;
                    }
                }
            }

            // Stream ended without a done marker
            let _ = tx.send(Err(GatewayError::StreamClosed)).await;
        });

        Ok(rx)
    }
}
