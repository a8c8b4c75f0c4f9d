//! IPC message protocol between front-ends and the daemon
//!
//! Messages travel over a Unix socket as newline-delimited JSON. Each request
//! line gets exactly one response line.

use crate::event::EventEnvelope;
use crate::history::UserStats;
use crate::registry::Outcome;
use crate::summary::SessionSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Socket name for IPC communication
pub const SOCKET_NAME: &str = "studybot.sock";

/// Get the socket path for IPC communication
///
/// Uses XDG_RUNTIME_DIR if available, falls back to the temp dir
pub fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir());
    runtime_dir.join(SOCKET_NAME)
}

/// Message from a front-end to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum IpcMessage {
    /// User action against their session
    Event(EventEnvelope),
    /// Completed sessions of a user
    History { user_id: String },
    /// Aggregate stats over a user's completed sessions
    Stats { user_id: String },
    /// Ping to check if daemon is alive
    Ping,
}

/// Response from the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Event applied
    Outcome(Outcome),
    History { sessions: Vec<SessionSummary> },
    Stats(UserStats),
    /// Session ended but its final summary could not be stored
    Unrecorded {
        summary: SessionSummary,
        message: String,
    },
    /// Pong response to ping
    Pong,
    /// Request rejected. `kind` is stable, `message` is for humans.
    Error { kind: String, message: String },
}

impl IpcResponse {
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Self::Error {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}
