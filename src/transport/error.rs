// ABOUTME: Transport-specific error types.
// ABOUTME: Covers connection, authentication, execution, and upload failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: no valid credentials")]
    AuthenticationFailed,

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    /// `detail` carries trimmed stderr, empty when the command was silent.
    #[error("remote command `{command}` exited with status {exit_code}{detail}")]
    ExecFailed {
        command: String,
        exit_code: u32,
        detail: String,
    },

    #[error("command execution failed: {0}")]
    CommandFailed(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(Duration),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("{host} not ready after {waited:?}")]
    NotReady { host: String, waited: Duration },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
