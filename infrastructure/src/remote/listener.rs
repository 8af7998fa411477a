//! Orchestrator-side callback listener
//!
//! Accepts one TCP connection per session. After the hello frame is
//! validated, the session is registered with the broker; an outbound
//! pump forwards queued tool requests to the client while the read loop
//! demultiplexes responses back into their waiting futures. A
//! disconnect closes the session, which fails all in-flight futures
//! fast.

use super::transport::{Frame, FramedReader, FramedWriter, TransportError};
use conductor_application::callback::ToolCallbackBroker;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct CallbackListener {
    broker: Arc<ToolCallbackBroker>,
    /// Expected bearer token; `None` disables auth.
    token: Option<String>,
}

impl CallbackListener {
    pub fn new(broker: Arc<ToolCallbackBroker>) -> Self {
        Self {
            broker,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Accept connections until cancelled.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        cancellation: CancellationToken,
    ) -> std::io::Result<()> {
        info!(addr = ?listener.local_addr().ok(), "callback listener started");
        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Ok(()),
                accepted = listener.accept() => accepted,
            };
            let (stream, peer) = accepted?;
            info!(%peer, "callback client connected");

            let this = Arc::clone(&self);
            let cancel = cancellation.clone();
            tokio::spawn(async move {
                if let Err(e) = this.handle_connection(stream, cancel).await {
                    warn!("callback connection ended: {e}");
                }
            });
        }
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        cancellation: CancellationToken,
    ) -> Result<(), TransportError> {
        let (read_half, write_half) = stream.into_split();
        let mut reader = FramedReader::new(read_half);
        let mut writer = FramedWriter::new(write_half);

        // Stream-open metadata: session id plus bearer token
        let session_id = match reader.read_frame().await? {
            Frame::Hello { session_id, token } => {
                if let Some(expected) = &self.token
                    && &token != expected
                {
                    warn!(session = %session_id, "rejecting client with bad token");
                    return Err(TransportError::Unauthorized);
                }
                session_id
            }
            other => {
                return Err(TransportError::Parse {
                    error: "expected hello frame".to_string(),
                    raw: format!("{other:?}"),
                });
            }
        };

        let mut outbound = self.broker.register_session(&session_id);

        // Outbound pump: broker queue → client
        let pump_session = session_id.clone();
        let pump_cancel = cancellation.clone();
        let pump = tokio::spawn(async move {
            loop {
                let request = tokio::select! {
                    biased;
                    _ = pump_cancel.cancelled() => break,
                    request = outbound.recv() => match request {
                        Some(request) => request,
                        None => break, // session closed by the broker
                    },
                };
                if let Err(e) = writer.write_frame(&Frame::Request { request }).await {
                    warn!(session = %pump_session, "failed to send tool request: {e}");
                    break;
                }
            }
        });

        // Inbound loop: client responses → waiting futures
        let result = loop {
            let frame = tokio::select! {
                biased;
                _ = cancellation.cancelled() => break Ok(()),
                frame = reader.read_frame() => frame,
            };
            match frame {
                Ok(Frame::Response { response }) => {
                    self.broker.complete(&session_id, response);
                }
                Ok(other) => {
                    warn!(session = %session_id, "ignoring unexpected frame: {other:?}");
                }
                Err(TransportError::Closed) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        // Fail anything still pending and reject further enqueues
        self.broker.close_session(&session_id);
        pump.abort();
        info!(session = %session_id, "callback client disconnected");
        result
    }
}
