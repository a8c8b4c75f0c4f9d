//! Unix socket server for receiving study events from front-ends
//!
//! Listens on the configured socket for newline-delimited JSON `IpcMessage`s
//! and answers every line with one `IpcResponse` line.

use crate::history::HistoryStore;
use crate::ipc::{IpcMessage, IpcResponse};
use crate::registry::{Clock, Outcome, SessionRegistry};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, trace, warn};

/// Apply one request to the registry and history.
///
/// Final summaries are appended to history before the response is built. If
/// that append fails the session is gone from the registry anyway, so the
/// response is `Unrecorded` and still carries the final summary.
pub fn handle_message<C: Clock>(
    registry: &SessionRegistry<C>,
    history: &dyn HistoryStore,
    message: IpcMessage,
) -> IpcResponse {
    match message {
        IpcMessage::Event(envelope) => match registry.apply(envelope) {
            Ok(Outcome::Ended(summary)) => match history.append(&summary) {
                Ok(()) => IpcResponse::Outcome(Outcome::Ended(summary)),
                Err(e) => {
                    error!(user_id = %summary.user_id, "failed to record session: {e}");
                    IpcResponse::Unrecorded {
                        summary,
                        message: e.to_string(),
                    }
                }
            },
            Ok(outcome) => IpcResponse::Outcome(outcome),
            Err(e) => IpcResponse::error(e.kind(), e.to_string()),
        },
        IpcMessage::History { user_id } => match history.list(&user_id) {
            Ok(sessions) => IpcResponse::History { sessions },
            Err(e) => {
                warn!(%user_id, "failed to read history: {e}");
                IpcResponse::error("history_unavailable", e.to_string())
            }
        },
        IpcMessage::Stats { user_id } => match history.stats(&user_id) {
            Ok(stats) => IpcResponse::Stats(stats),
            Err(e) => {
                warn!(%user_id, "failed to read history: {e}");
                IpcResponse::error("history_unavailable", e.to_string())
            }
        },
        IpcMessage::Ping => IpcResponse::Pong,
    }
}

/// Bind the socket at `path` and serve until the listener fails.
///
/// Removes any stale socket file first.
pub async fn start<C: Clock + 'static>(
    path: &Path,
    registry: Arc<SessionRegistry<C>>,
    history: Arc<dyn HistoryStore>,
) -> std::io::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(path)?;
    info!("IPC server listening on {}", path.display());
    serve(listener, registry, history).await;
    Ok(())
}

/// Accept connections forever, one task per connection.
pub async fn serve<C: Clock + 'static>(
    listener: UnixListener,
    registry: Arc<SessionRegistry<C>>,
    history: Arc<dyn HistoryStore>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let registry = Arc::clone(&registry);
                let history = Arc::clone(&history);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, registry, history).await {
                        debug!("connection closed: {e}");
                    }
                });
            }
            Err(e) => {
                warn!("Failed to accept socket connection: {}", e);
            }
        }
    }
}

async fn handle_connection<C: Clock + 'static>(
    stream: UnixStream,
    registry: Arc<SessionRegistry<C>>,
    history: Arc<dyn HistoryStore>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let response = match parse_request(&buf) {
            Ok(None) => continue,
            Ok(Some(message)) => {
                debug!(?message, "ipc message");
                let registry = Arc::clone(&registry);
                let history = Arc::clone(&history);
                // History writes block on file IO.
                task::spawn_blocking(move || handle_message(&registry, history.as_ref(), message))
                    .await
                    .map_err(std::io::Error::other)?
            }
            Err(e) => {
                trace!("Failed to parse IPC message: {e}");
                IpcResponse::error("bad_request", e)
            }
        };

        let mut json = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        json.push('\n');
        write.write_all(json.as_bytes()).await?;
    }
}

/// Decode one request line. `Ok(None)` for blank lines.
fn parse_request(line: &[u8]) -> Result<Option<IpcMessage>, String> {
    let line = std::str::from_utf8(line).map_err(|e| format!("request is not UTF-8: {e}"))?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| format!("{e} (line: {line})"))
}
