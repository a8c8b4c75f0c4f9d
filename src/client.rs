//! Blocking client for the daemon socket, used by the CLI subcommands.

use crate::ipc::{IpcMessage, IpcResponse};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running ({}): {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("daemon closed the connection without responding")]
    NoResponse,
}

/// Send one message and wait for its response.
pub fn request(path: &Path, message: &IpcMessage) -> Result<IpcResponse, ClientError> {
    let mut stream = UnixStream::connect(path).map_err(|source| ClientError::Connect {
        path: path.to_path_buf(),
        source,
    })?;

    let json = serde_json::to_string(message)?;
    writeln!(stream, "{json}")?;
    stream.flush()?;

    let mut line = String::new();
    if BufReader::new(&stream).read_line(&mut line)? == 0 {
        return Err(ClientError::NoResponse);
    }
    Ok(serde_json::from_str(&line)?)
}
