//! Sway-specific implementations.
//!
//! This module speaks Sway's binary IPC protocol: message framing lives in
//! [`codec`], message types and JSON payloads in [`message`], and the
//! long-running layout watcher in [`monitor`].
//!
//! Nothing outside this module should reference Sway directly.

pub mod codec;
pub mod message;
pub mod monitor;

use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Environment variable Sway exports with its IPC socket path.
pub const SOCKET_ENV: &str = "SWAYSOCK";

/// Errors that can occur when talking to Sway.
///
/// None of them is retried: the status program exits and the bar restarts
/// it.  The one exception is [`IpcError::NoSocket`], which callers treat
/// as "run without layout reporting".
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Neither an explicit path nor `$SWAYSOCK` names a socket.
    #[error("IPC socket path unknown")]
    NoSocket,

    /// The socket path is known but connecting to it failed.
    #[error("connect to {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A message header did not start with the protocol magic.
    #[error("invalid magic string {0:?}")]
    BadMagic([u8; 6]),

    /// Sway answered the subscribe request with `success: false`.
    #[error("failed to subscribe to Sway events")]
    SubscribeRejected,

    /// An outgoing payload does not fit the 32-bit length field.
    #[error("payload of {0} bytes is too large")]
    PayloadTooLarge(usize),

    /// A payload was not the JSON document we expected.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Short read, short write or closed connection.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IpcError {
    /// Whether this error only means that no IPC socket is configured.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, IpcError::NoSocket)
    }
}

/// Resolve the socket path: `path` if non-empty, `$SWAYSOCK` otherwise.
pub fn socket_path(path: Option<&Path>) -> Result<PathBuf, IpcError> {
    match path {
        Some(p) if !p.as_os_str().is_empty() => Ok(p.to_path_buf()),
        _ => std::env::var_os(SOCKET_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or(IpcError::NoSocket),
    }
}

/// Open a stream connection to the Sway IPC socket.
///
/// One attempt, no retries.
pub fn connect(path: Option<&Path>) -> Result<UnixStream, IpcError> {
    let path = socket_path(path)?;
    UnixStream::connect(&path).map_err(|source| IpcError::Connect { path, source })
}

//  Tests
