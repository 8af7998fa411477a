//! JSONL file writer for conversation turns
//!
//! Each completed turn is serialized as a single JSON line with a
//! timestamp, appended via a buffered writer. Thread-safe through a
//! mutex; flushed after every record so a crash loses at most the line
//! in flight.

use conductor_application::ports::conversation_logger::ConversationLogger;
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub struct JsonlConversationLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open (appending) a logger at the given path. Creates parent
    /// directories. Returns `None` when the file cannot be opened;
    /// logging is never a reason to fail startup.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("could not create conversation log directory {}: {e}", parent.display());
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("could not open conversation log {}: {e}", path.display());
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one turn record.
    pub fn log_turn(&self, session_id: &str, user: &str, assistant: &str) {
        let record = json!({
            "type": "turn",
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "session_id": session_id,
            "user": user,
            "assistant": assistant,
        });
        self.append(&record);
    }

    /// Append an arbitrary event record.
    pub fn log_event(&self, event_type: &str, payload: serde_json::Value) {
        let record = json!({
            "type": event_type,
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "payload": payload,
        });
        self.append(&record);
    }

    fn append(&self, record: &serde_json::Value) {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(_) => return,
        };
        if let Err(e) = writeln!(writer, "{record}") {
            warn!("failed to append conversation log: {e}");
            return;
        }
        let _ = writer.flush();
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log_turn(&self, session_id: &str, user: &str, assistant: &str) {
        JsonlConversationLogger::log_turn(self, session_id, user, assistant);
    }

    fn log_event(&self, event_type: &str, payload: serde_json::Value) {
        JsonlConversationLogger::log_event(self, event_type, payload);
    }
}
