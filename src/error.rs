// ABOUTME: Application-wide error types for dokimi.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::provisioner::ProvisionerError;

#[derive(Debug, Error)]
pub enum Error {
    /// Unified wrapper for transport-layer failures (authentication,
    /// non-zero remote exit, I/O). The original message is preserved.
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// A lifecycle operation was invoked on a driver that does not provide it.
    #[error("`{0}` must be implemented by the driver")]
    NotImplemented(&'static str),

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no instance configured: add an `instance:` section to dokimi.yml")]
    NoInstance,

    #[error(transparent)]
    Provisioner(#[from] ProvisionerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Translate a transport failure into the unified action-failed form.
    pub fn action_failed(err: impl std::fmt::Display) -> Self {
        Error::ActionFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
