// ABOUTME: Provisioner collaborator boundary for the converge phase.
// ABOUTME: Defines the Provisioner and ProvisionerFactory traits and their errors.

mod shell;

pub use shell::{ShellProvisioner, ShellProvisionerConfig, ShellProvisionerFactory};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{Config, InstanceState};

/// Supplies the four converge commands and the local sandbox.
///
/// Every command is optional; an absent command is skipped by the driver.
/// `cleanup_sandbox` is invoked exactly once per converge, on every exit
/// path, and must be idempotent.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Install the provisioning engine on the instance.
    fn install_command(&self) -> Option<String> {
        None
    }

    /// Initialize the engine's working area on the instance.
    fn init_command(&self) -> Option<String> {
        None
    }

    /// Prepare the environment after the sandbox was transferred.
    fn prepare_command(&self) -> Option<String> {
        None
    }

    /// Execute the provisioning run.
    fn run_command(&self) -> Option<String> {
        None
    }

    /// Remote directory the sandbox is transferred into.
    fn home_path(&self) -> &str;

    /// Assemble the local sandbox. `None` means nothing to upload.
    async fn create_sandbox(&self) -> Result<Option<PathBuf>, ProvisionerError>;

    async fn cleanup_sandbox(&self);
}

/// Produces a provisioner per converge call from the merged configuration,
/// the instance, and the log level derived from the active subscriber.
pub trait ProvisionerFactory: Send + Sync {
    fn provisioner(
        &self,
        config: &Config,
        instance: &InstanceState,
        level: tracing::Level,
    ) -> Result<Box<dyn Provisioner>, ProvisionerError>;
}

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("no provisioner configured: add a `provisioner:` section to dokimi.yml")]
    NotConfigured,

    #[error("provisioner script not found: {0}")]
    MissingScript(PathBuf),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] std::io::Error),
}
