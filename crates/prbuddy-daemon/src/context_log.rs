//! Best-effort, append-only log of assembled DCE contexts: one JSON
//! object per line, opened in append mode so a crash mid-write never
//! corrupts earlier entries.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use prbuddy_core::Message;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ContextLogEntry<'a> {
    conversation_id: &'a str,
    at: chrono::DateTime<Utc>,
    messages: &'a [Message],
}

#[derive(Debug, Clone)]
pub struct ContextLog {
    path: PathBuf,
}

impl ContextLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ContextLog { path: path.into() }
    }

    /// Appends one line. Failures are the caller's to log — this
    /// never panics and callers are expected to treat it as
    /// best-effort, matching the Orchestrator's persistence policy.
    pub fn append(&self, conversation_id: &str, messages: &[Message]) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let entry = ContextLogEntry {
            conversation_id,
            at: Utc::now(),
            messages,
        };
        let mut line = serde_json::to_string(&entry)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}
