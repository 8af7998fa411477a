//! Tool-callback broker
//!
//! Used in remote mode, when tool execution lives in a trusted client
//! process. The orchestrator enqueues [`ToolRequest`]s per session and
//! awaits the matching future; client responses are demultiplexed by
//! request id. One response per request: a timeout resolves the future
//! and any late response for that id is dropped; duplicates are logged
//! and ignored; closing the session cancels everything pending.

use crate::ports::tool_executor::ToolExecutorPort;
use async_trait::async_trait;
use conductor_domain::tool::entities::ToolCall;
use conductor_domain::tool::remote::{ToolRequest, ToolResponse};
use conductor_domain::tool::value_objects::{ToolError, ToolResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("session {0} is not registered for tool callbacks")]
    SessionNotRegistered(String),

    #[error("session {0} closed")]
    SessionClosed(String),
}

struct SessionEntry {
    outbound: mpsc::UnboundedSender<ToolRequest>,
    pending: HashMap<String, oneshot::Sender<ToolResponse>>,
}

/// Per-session correlation registry between outbound tool requests and
/// inbound responses.
#[derive(Default)]
pub struct ToolCallbackBroker {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl ToolCallbackBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, returning the receiver the transport pumps to
    /// the client. Re-registering replaces the previous channel and
    /// cancels its pending requests.
    pub fn register_session(&self, session_id: &str) -> mpsc::UnboundedReceiver<ToolRequest> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sessions = self.sessions.lock().expect("broker lock poisoned");
        if sessions
            .insert(
                session_id.to_string(),
                SessionEntry {
                    outbound: tx,
                    pending: HashMap::new(),
                },
            )
            .is_some()
        {
            warn!(session = session_id, "replacing existing callback registration");
        }
        info!(session = session_id, "tool callback channel registered");
        rx
    }

    /// Tear down a session. Pending futures resolve with a synthetic
    /// failure (their senders are dropped); further enqueues reject.
    pub fn close_session(&self, session_id: &str) {
        let removed = self
            .sessions
            .lock()
            .expect("broker lock poisoned")
            .remove(session_id);
        if let Some(entry) = removed {
            info!(
                session = session_id,
                pending = entry.pending.len(),
                "tool callback channel closed"
            );
        }
    }

    pub fn is_registered(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .expect("broker lock poisoned")
            .contains_key(session_id)
    }

    /// Enqueue a tool request and await its response, subject to the
    /// request's own timeout.
    pub async fn request(
        &self,
        session_id: &str,
        call: &ToolCall,
        timeout: Duration,
    ) -> Result<ToolResponse, ChannelError> {
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();

        {
            let mut sessions = self.sessions.lock().expect("broker lock poisoned");
            let entry = sessions
                .get_mut(session_id)
                .ok_or_else(|| ChannelError::SessionNotRegistered(session_id.to_string()))?;

            let request = ToolRequest {
                request_id: request_id.clone(),
                session_id: session_id.to_string(),
                tool_name: call.name().to_string(),
                arguments: call.wire_arguments(),
                timeout_seconds: timeout.as_secs(),
            };

            entry.pending.insert(request_id.clone(), tx);
            if entry.outbound.send(request).is_err() {
                // Transport receiver is gone: the client disconnected
                entry.pending.remove(&request_id);
                return Err(ChannelError::SessionClosed(session_id.to_string()));
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                // Sender dropped: the session closed while we waited
                Ok(ToolResponse::err(
                    request_id,
                    "session closed while request was pending",
                ))
            }
            Err(_) => {
                // Drop the pending entry so a late response is discarded
                if let Some(entry) = self
                    .sessions
                    .lock()
                    .expect("broker lock poisoned")
                    .get_mut(session_id)
                {
                    entry.pending.remove(&request_id);
                }
                warn!(session = session_id, request = %request_id, "tool request timed out");
                Ok(ToolResponse::timed_out(request_id, timeout.as_secs()))
            }
        }
    }

    /// Deliver a client response to its waiting future. Exactly one
    /// response is accepted per request id; the rest are dropped.
    pub fn complete(&self, session_id: &str, response: ToolResponse) {
        let waiter = self
            .sessions
            .lock()
            .expect("broker lock poisoned")
            .get_mut(session_id)
            .and_then(|entry| entry.pending.remove(&response.request_id));

        match waiter {
            Some(tx) => {
                debug!(request = %response.request_id, "tool response delivered");
                let _ = tx.send(response);
            }
            None => {
                warn!(
                    session = session_id,
                    request = %response.request_id,
                    "dropping duplicate or unmatched tool response"
                );
            }
        }
    }

    /// Pending request count for a session (telemetry).
    pub fn pending_count(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .expect("broker lock poisoned")
            .get(session_id)
            .map(|e| e.pending.len())
            .unwrap_or(0)
    }
}

/// Tool executor that forwards every call over the callback channel.
pub struct RemoteToolExecutor {
    broker: Arc<ToolCallbackBroker>,
    session_id: String,
    timeout: Duration,
}

impl RemoteToolExecutor {
    pub fn new(broker: Arc<ToolCallbackBroker>, session_id: impl Into<String>) -> Self {
        Self {
            broker,
            session_id: session_id.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ToolExecutorPort for RemoteToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self
            .broker
            .request(&self.session_id, call, self.timeout)
            .await
        {
            Ok(response) => response.into_tool_result(call.name()),
            Err(e) => ToolResult::failure(call.name(), ToolError::execution_failed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_call(path: &str) -> ToolCall {
        ToolCall::from_named_json("read", json!({"path": path})).unwrap()
    }

    #[tokio::test]
    async fn test_request_response_round_trip() {
        let broker = Arc::new(ToolCallbackBroker::new());
        let mut outbound = broker.register_session("s1");

        let broker2 = Arc::clone(&broker);
        let client = tokio::spawn(async move {
            let request = outbound.recv().await.unwrap();
            assert_eq!(request.tool_name, "read");
            assert_eq!(
                request.arguments.get("path").map(String::as_str),
                Some("a.txt")
            );
            broker2.complete("s1", ToolResponse::ok(&request.request_id, "contents"));
        });

        let response = broker
            .request("s1", &read_call("a.txt"), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.data, "contents");
        client.await.unwrap();
        assert_eq!(broker.pending_count("s1"), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_correlate_with_shuffled_responses() {
        let broker = Arc::new(ToolCallbackBroker::new());
        let mut outbound = broker.register_session("s1");

        // Fake client: gather all requests, answer them in reverse order,
        // each response carrying its request's path.
        let broker2 = Arc::clone(&broker);
        let client = tokio::spawn(async move {
            let mut requests = Vec::new();
            for _ in 0..8 {
                requests.push(outbound.recv().await.unwrap());
            }
            requests.reverse();
            for request in requests {
                let path = request.arguments.get("path").cloned().unwrap_or_default();
                broker2.complete("s1", ToolResponse::ok(&request.request_id, path));
            }
        });

        let mut futures = Vec::new();
        for i in 0..8 {
            let broker = Arc::clone(&broker);
            futures.push(tokio::spawn(async move {
                let call = read_call(&format!("file-{i}.txt"));
                let response = broker
                    .request("s1", &call, Duration::from_secs(2))
                    .await
                    .unwrap();
                (i, response)
            }));
        }

        for future in futures {
            let (i, response) = future.await.unwrap();
            assert!(response.success);
            assert_eq!(
                response.data,
                format!("file-{i}.txt"),
                "response must reach the originating future"
            );
        }
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_resolves_future_and_drops_late_response() {
        let broker = Arc::new(ToolCallbackBroker::new());
        let mut outbound = broker.register_session("s1");

        let response = broker
            .request("s1", &read_call("slow.txt"), Duration::from_millis(30))
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.error.contains("timed out"));

        // The late response finds no pending entry and is dropped
        let request = outbound.recv().await.unwrap();
        broker.complete("s1", ToolResponse::ok(&request.request_id, "too late"));
        assert_eq!(broker.pending_count("s1"), 0);
    }

    #[tokio::test]
    async fn test_duplicate_response_first_wins() {
        let broker = Arc::new(ToolCallbackBroker::new());
        let mut outbound = broker.register_session("s1");

        let broker2 = Arc::clone(&broker);
        let client = tokio::spawn(async move {
            let request = outbound.recv().await.unwrap();
            broker2.complete("s1", ToolResponse::ok(&request.request_id, "first"));
            broker2.complete("s1", ToolResponse::ok(&request.request_id, "second"));
        });

        let response = broker
            .request("s1", &read_call("f.txt"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.data, "first");
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_session_cancels_pending_and_rejects_enqueue() {
        let broker = Arc::new(ToolCallbackBroker::new());
        let _outbound = broker.register_session("s1");

        let broker2 = Arc::clone(&broker);
        let pending = tokio::spawn(async move {
            broker2
                .request("s1", &read_call("f.txt"), Duration::from_secs(5))
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        broker.close_session("s1");

        let response = pending.await.unwrap().unwrap();
        assert!(!response.success);
        assert!(response.error.contains("session closed"));

        let err = broker
            .request("s1", &read_call("g.txt"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, ChannelError::SessionNotRegistered("s1".to_string()));
    }

    #[tokio::test]
    async fn test_disconnected_client_fails_fast() {
        let broker = Arc::new(ToolCallbackBroker::new());
        let outbound = broker.register_session("s1");
        drop(outbound); // client went away without unregistering

        let err = broker
            .request("s1", &read_call("f.txt"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, ChannelError::SessionClosed("s1".to_string()));
    }

    #[tokio::test]
    async fn test_remote_executor_adapts_responses() {
        let broker = Arc::new(ToolCallbackBroker::new());
        let mut outbound = broker.register_session("s1");
        let executor = RemoteToolExecutor::new(Arc::clone(&broker), "s1");

        let broker2 = Arc::clone(&broker);
        let client = tokio::spawn(async move {
            let request = outbound.recv().await.unwrap();
            broker2.complete("s1", ToolResponse::err(&request.request_id, "no such file"));
        });

        let result = executor.execute(&read_call("ghost.txt")).await;
        assert!(!result.is_success());
        assert!(result.error().unwrap().message.contains("no such file"));
        client.await.unwrap();
    }
}
