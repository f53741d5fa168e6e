// ABOUTME: Remote command execution and path transfer through an open connection.
// ABOUTME: Translates every transport failure into the unified ActionFailed error.

use std::path::Path;

use crate::env::EnvCommand;
use crate::error::{Error, Result};
use crate::transport::Connection;

/// Executes the steps of one phase through one connection.
///
/// Holds the phase's resolved [`EnvCommand`] so every command in the phase
/// gets the same environment prefix. Absent commands and paths are skipped,
/// not failed.
pub struct RemoteExecutor {
    env: EnvCommand,
}

impl RemoteExecutor {
    pub fn new(env: EnvCommand) -> Self {
        Self { env }
    }

    /// Run a command on the instance, or do nothing if there is none.
    pub async fn run_remote(&self, command: Option<&str>, conn: &dyn Connection) -> Result<()> {
        let Some(command) = command else {
            return Ok(());
        };

        conn.execute(&self.env.wrap(command))
            .await
            .map_err(Error::action_failed)
    }

    /// Upload a local path to the instance, or do nothing if there is none.
    pub async fn transfer_path(
        &self,
        local: Option<&Path>,
        remote: &str,
        conn: &dyn Connection,
    ) -> Result<()> {
        let Some(local) = local else {
            return Ok(());
        };

        tracing::info!("Transferring {} to {}", local.display(), remote);
        conn.upload(local, remote).await.map_err(Error::action_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use async_trait::async_trait;

    /// Connection double that fails the test if it is touched at all.
    struct UntouchableConnection;

    #[async_trait]
    impl Connection for UntouchableConnection {
        async fn execute(&self, command: &str) -> std::result::Result<(), TransportError> {
            panic!("unexpected execute: {command}");
        }

        async fn upload(&self, local: &Path, _remote: &str) -> std::result::Result<(), TransportError> {
            panic!("unexpected upload: {}", local.display());
        }

        async fn close(&self) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    /// Connection double that rejects everything with a fixed message.
    struct FailingConnection;

    #[async_trait]
    impl Connection for FailingConnection {
        async fn execute(&self, _command: &str) -> std::result::Result<(), TransportError> {
            Err(TransportError::AuthenticationFailed)
        }

        async fn upload(&self, _local: &Path, _remote: &str) -> std::result::Result<(), TransportError> {
            Err(TransportError::UploadFailed("disk full".to_string()))
        }

        async fn close(&self) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    fn executor() -> RemoteExecutor {
        RemoteExecutor::new(EnvCommand::passthrough())
    }

    #[tokio::test]
    async fn absent_command_is_a_no_op() {
        executor()
            .run_remote(None, &UntouchableConnection)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn absent_path_is_a_no_op() {
        executor()
            .transfer_path(None, "/tmp/dokimi", &UntouchableConnection)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn execute_failure_surfaces_as_action_failed() {
        let err = executor()
            .run_remote(Some("true"), &FailingConnection)
            .await
            .unwrap_err();

        match err {
            Error::ActionFailed(message) => {
                assert!(message.contains("authentication failed"), "{message}");
            }
            other => panic!("expected ActionFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_failure_preserves_original_message() {
        let err = executor()
            .transfer_path(Some(Path::new("/sandbox")), "/tmp/dokimi", &FailingConnection)
            .await
            .unwrap_err();

        match err {
            Error::ActionFailed(message) => assert!(message.contains("disk full"), "{message}"),
            other => panic!("expected ActionFailed, got: {other:?}"),
        }
    }
}
