//! Completed-session history, keyed by user.
//!
//! The JSON store keeps one file per user (`<user>.json`, an array of final
//! summaries in completion order) under the history directory. Files are
//! rewritten atomically so a crash never leaves a truncated array behind.

use crate::config::atomic_write;
use crate::summary::SessionSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt history file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("session for user {0} has not ended")]
    NotFinal(String),
}

/// Aggregate figures over a user's completed sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_sessions: usize,
    pub total_study_secs: i64,
    pub total_break_secs: i64,
    pub average_study_secs: i64,
}

impl UserStats {
    pub fn from_summaries(summaries: &[SessionSummary]) -> Self {
        let total_sessions = summaries.len();
        let total_study_secs: i64 = summaries.iter().map(|s| s.total_study_secs).sum();
        let total_break_secs: i64 = summaries.iter().map(|s| s.total_break_secs).sum();
        let average_study_secs = match i64::try_from(total_sessions) {
            Ok(n) if n > 0 => total_study_secs / n,
            _ => 0,
        };
        Self {
            total_sessions,
            total_study_secs,
            total_break_secs,
            average_study_secs,
        }
    }
}

/// Storage for completed sessions
pub trait HistoryStore: Send + Sync {
    /// Append the final summary of a completed session.
    fn append(&self, summary: &SessionSummary) -> Result<(), HistoryError>;

    /// All completed sessions of a user, oldest first.
    fn list(&self, user_id: &str) -> Result<Vec<SessionSummary>, HistoryError>;

    fn stats(&self, user_id: &str) -> Result<UserStats, HistoryError> {
        Ok(UserStats::from_summaries(&self.list(user_id)?))
    }
}

fn ensure_final(summary: &SessionSummary) -> Result<(), HistoryError> {
    if summary.is_final() {
        Ok(())
    } else {
        Err(HistoryError::NotFinal(summary.user_id.clone()))
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: Mutex<HashMap<String, Vec<SessionSummary>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, summary: &SessionSummary) -> Result<(), HistoryError> {
        ensure_final(summary)?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(summary.user_id.clone())
            .or_default()
            .push(summary.clone());
        Ok(())
    }

    fn list(&self, user_id: &str) -> Result<Vec<SessionSummary>, HistoryError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(user_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct JsonHistoryStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles on history files
    write_lock: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// History file for a user. User ids are opaque, so anything outside
    /// `[A-Za-z0-9_-]` is percent-encoded to keep the name a single path segment.
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        let mut name = String::with_capacity(user_id.len() + 5);
        for byte in user_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }

    fn read(path: &Path) -> Result<Vec<SessionSummary>, HistoryError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| HistoryError::Corrupt {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl HistoryStore for JsonHistoryStore {
    fn append(&self, summary: &SessionSummary) -> Result<(), HistoryError> {
        ensure_final(summary)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = self.path_for(&summary.user_id);
        let mut entries = Self::read(&path)?;
        entries.push(summary.clone());

        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&entries)?;
        atomic_write(&path, json.as_bytes())?;

        info!(user_id = %summary.user_id, sessions = entries.len(), "session recorded");
        debug!("history written to {}", path.display());
        Ok(())
    }

    fn list(&self, user_id: &str) -> Result<Vec<SessionSummary>, HistoryError> {
        Self::read(&self.path_for(user_id))
    }
}
