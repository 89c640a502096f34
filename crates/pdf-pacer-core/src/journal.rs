//! Completed reading sessions, handed off for scoring elsewhere.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::error::{Error, Result};

/// Session type recorded for paced PDF reading
pub const SESSION_KIND: &str = "pdfread";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSession {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub document: String,
    /// Time spent playing, pauses excluded
    pub duration_secs: u64,
    pub word_count: usize,
    pub wpm: u32,
    pub pages: usize,
    /// Seconds since the Unix epoch
    pub finished_at: u64,
}

impl CompletedSession {
    pub fn now_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}

/// Receives completed sessions; callers do not wait on the outcome
pub trait SessionLog: Send + Sync {
    fn record(&self, session: &CompletedSession) -> Result<()>;
}

/// Appends one JSON object per line
pub struct JsonLinesSessionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesSessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every session recorded so far; unreadable lines are skipped
    pub fn read_all(&self) -> Result<Vec<CompletedSession>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

impl SessionLog for JsonLinesSessionLog {
    fn record(&self, session: &CompletedSession) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::SessionLog("journal lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::SessionLog(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let mut line =
            serde_json::to_string(session).map_err(|e| Error::SessionLog(e.to_string()))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::SessionLog(format!("Failed to open {}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes())
            .map_err(|e| Error::SessionLog(e.to_string()))?;

        debug!("Recorded {} session for {}", session.kind, session.document);
        Ok(())
    }
}

/// Keeps sessions in memory
#[derive(Default)]
pub struct MemorySessionLog {
    sessions: Mutex<Vec<CompletedSession>>,
}

impl MemorySessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<CompletedSession> {
        self.sessions
            .lock()
            .map(|sessions| sessions.clone())
            .unwrap_or_default()
    }
}

impl SessionLog for MemorySessionLog {
    fn record(&self, session: &CompletedSession) -> Result<()> {
        self.sessions
            .lock()
            .map_err(|_| Error::SessionLog("session list poisoned".to_string()))?
            .push(session.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(document: &str) -> CompletedSession {
        CompletedSession {
            kind: SESSION_KIND.to_string(),
            user: "olena".to_string(),
            document: document.to_string(),
            duration_secs: 312,
            word_count: 1040,
            wpm: 200,
            pages: 4,
            finished_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_appends_one_line_per_session() {
        let dir = TempDir::new().unwrap();
        let log = JsonLinesSessionLog::new(dir.path().join("nested").join("sessions.jsonl"));

        log.record(&session("a")).unwrap();
        log.record(&session("b")).unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.starts_with(r#"{"type":"pdfread","#));
        assert_eq!(log.read_all().unwrap(), vec![session("a"), session("b")]);
    }

    #[test]
    fn test_missing_journal_reads_empty() {
        let dir = TempDir::new().unwrap();
        let log = JsonLinesSessionLog::new(dir.path().join("none.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }
}
