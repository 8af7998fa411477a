//! Framed JSON transport
//!
//! Each frame is a JSON document preceded by a `Content-Length` header
//! and a blank line, LSP-style:
//!
//! ```text
//! Content-Length: 52\r\n
//! \r\n
//! {"type":"response","response":{...}}
//! ```

use conductor_domain::tool::remote::{ToolRequest, ToolResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {error} (raw: {raw})")]
    Parse { error: String, raw: String },

    #[error("transport closed")]
    Closed,

    #[error("authorization rejected")]
    Unauthorized,
}

/// Every message that travels over the callback stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Client → server on stream open: session metadata plus an optional
    /// bearer token when auth is enabled.
    Hello {
        session_id: String,
        #[serde(default)]
        token: String,
    },
    /// Server → client: execute a tool.
    Request { request: ToolRequest },
    /// Client → server: the tool's result.
    Response { response: ToolResponse },
}

pub struct FramedReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Read one frame. `Err(Closed)` on clean EOF between frames.
    pub async fn read_frame(&mut self) -> Result<Frame, TransportError> {
        let mut line = String::new();

        // Content-Length header, skipping stray blank lines
        let content_length: usize = loop {
            line.clear();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(TransportError::Closed);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(length) = trimmed.strip_prefix("Content-Length:")
                && let Ok(length) = length.trim().parse::<usize>()
            {
                break length;
            }
            // Unknown header line; ignore
        };

        // Blank separator line
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(TransportError::Closed);
            }
            if line.trim().is_empty() {
                break;
            }
        }

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await?;

        serde_json::from_slice(&body).map_err(|e| TransportError::Parse {
            error: e.to_string(),
            raw: String::from_utf8_lossy(&body).to_string(),
        })
    }
}

pub struct FramedWriter<W> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let body = serde_json::to_vec(frame).map_err(|e| TransportError::Parse {
            error: e.to_string(),
            raw: String::new(),
        })?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(&body).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
