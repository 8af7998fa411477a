//! Trusted-client side of the callback channel
//!
//! Connects to the orchestrator's listener, announces its session, and
//! executes incoming tool requests through the local executor.
//! Requests are served concurrently so a slow command never blocks a
//! fast read; each one is bounded by the timeout the orchestrator
//! attached to it.

use super::transport::{Frame, FramedReader, FramedWriter, TransportError};
use crate::tools::LocalToolExecutor;
use conductor_application::ports::tool_executor::ToolExecutorPort;
use conductor_domain::tool::entities::ToolCall;
use conductor_domain::tool::remote::{ToolRequest, ToolResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ToolCallbackClient {
    executor: Arc<LocalToolExecutor>,
    session_id: String,
    token: String,
}

impl ToolCallbackClient {
    pub fn new(executor: Arc<LocalToolExecutor>, session_id: impl Into<String>) -> Self {
        Self {
            executor,
            session_id: session_id.into(),
            token: String::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Connect and serve tool requests until the stream closes or the
    /// token is cancelled.
    pub async fn run(
        &self,
        addr: &str,
        cancellation: CancellationToken,
    ) -> Result<(), TransportError> {
        let stream = TcpStream::connect(addr).await?;
        info!(addr, session = %self.session_id, "connected to orchestrator");

        let (read_half, write_half) = stream.into_split();
        let mut reader = FramedReader::new(read_half);
        let mut writer = FramedWriter::new(write_half);

        writer
            .write_frame(&Frame::Hello {
                session_id: self.session_id.clone(),
                token: self.token.clone(),
            })
            .await?;

        // Single writer task; executions fan in through a channel
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<ToolResponse>();
        let writer_task = tokio::spawn(async move {
            while let Some(response) = response_rx.recv().await {
                if let Err(e) = writer.write_frame(&Frame::Response { response }).await {
                    warn!("failed to send tool response: {e}");
                    break;
                }
            }
        });

        let result = loop {
            let frame = tokio::select! {
                biased;
                _ = cancellation.cancelled() => break Ok(()),
                frame = reader.read_frame() => frame,
            };
            match frame {
                Ok(Frame::Request { request }) => {
                    let executor = Arc::clone(&self.executor);
                    let response_tx = response_tx.clone();
                    tokio::spawn(async move {
                        let response = serve_request(executor.as_ref(), request).await;
                        let _ = response_tx.send(response);
                    });
                }
                Ok(other) => warn!("ignoring unexpected frame: {other:?}"),
                Err(TransportError::Closed) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        drop(response_tx);
        let _ = writer_task.await;
        info!(session = %self.session_id, "callback client stopped");
        result
    }
}

async fn serve_request(executor: &LocalToolExecutor, request: ToolRequest) -> ToolResponse {
    debug!(tool = %request.tool_name, request = %request.request_id, "serving tool request");

    let call = match ToolCall::from_wire(&request.tool_name, &request.arguments) {
        Ok(call) => call,
        Err(e) => return ToolResponse::err(&request.request_id, e.to_string()),
    };

    let timeout = Duration::from_secs(request.timeout_seconds.max(1));
    match tokio::time::timeout(timeout, executor.execute(&call)).await {
        Ok(result) => {
            let mut response = ToolResponse::from(&result);
            response.request_id = request.request_id;
            response
        }
        Err(_) => ToolResponse::timed_out(&request.request_id, request.timeout_seconds),
    }
}
