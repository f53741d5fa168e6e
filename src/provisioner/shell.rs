// ABOUTME: Shell provisioner staging a bootstrap script into a sandbox.
// ABOUTME: The script is uploaded with the sandbox and executed under the sudo policy.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::PathBuf;
use tempfile::TempDir;

use super::{Provisioner, ProvisionerError, ProvisionerFactory};
use crate::config::{Config, InstanceState};

const BOOTSTRAP_NAME: &str = "bootstrap.sh";

/// The `provisioner:` section of dokimi.yml.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellProvisionerConfig {
    /// Local script staged into the sandbox and run on the instance.
    pub script: PathBuf,

    /// Remote directory the sandbox lands in.
    #[serde(default = "default_home")]
    pub home: String,

    /// Override for the engine install step.
    #[serde(default)]
    pub install: Option<String>,

    /// Override for the init step. Defaults to resetting the home directory.
    #[serde(default)]
    pub init: Option<String>,

    #[serde(default)]
    pub prepare: Option<String>,
}

fn default_home() -> String {
    "/tmp/dokimi".to_string()
}

/// Shipped provisioner: one bootstrap script, staged locally, run remotely.
pub struct ShellProvisioner {
    config: ShellProvisionerConfig,
    sudo: bool,
    level: tracing::Level,
    sandbox: Mutex<Option<TempDir>>,
}

impl ShellProvisioner {
    pub fn new(config: ShellProvisionerConfig, driver: &Config, level: tracing::Level) -> Self {
        Self {
            config,
            sudo: driver.sudo,
            level,
            sandbox: Mutex::new(None),
        }
    }

    fn sudo_wrap(&self, command: String) -> String {
        if self.sudo {
            format!("sudo -E {command}")
        } else {
            command
        }
    }
}

#[async_trait]
impl Provisioner for ShellProvisioner {
    fn install_command(&self) -> Option<String> {
        self.config.install.clone()
    }

    fn init_command(&self) -> Option<String> {
        let home = &self.config.home;
        Some(
            self.config
                .init
                .clone()
                .unwrap_or_else(|| self.sudo_wrap(format!("rm -rf {home} && mkdir -p {home}"))),
        )
    }

    fn prepare_command(&self) -> Option<String> {
        self.config.prepare.clone()
    }

    fn run_command(&self) -> Option<String> {
        let level = self.level.to_string().to_lowercase();
        Some(self.sudo_wrap(format!(
            "DOKIMI_LOG_LEVEL={level} sh {}/{BOOTSTRAP_NAME}",
            self.config.home
        )))
    }

    fn home_path(&self) -> &str {
        &self.config.home
    }

    async fn create_sandbox(&self) -> Result<Option<PathBuf>, ProvisionerError> {
        if !self.config.script.is_file() {
            return Err(ProvisionerError::MissingScript(self.config.script.clone()));
        }

        let dir = TempDir::with_prefix("dokimi-sandbox-")?;
        tokio::fs::copy(&self.config.script, dir.path().join(BOOTSTRAP_NAME)).await?;

        let path = dir.path().to_path_buf();
        tracing::debug!("staged sandbox at {}", path.display());
        *self.sandbox.lock() = Some(dir);
        Ok(Some(path))
    }

    async fn cleanup_sandbox(&self) {
        if let Some(dir) = self.sandbox.lock().take() {
            tracing::debug!("cleaning up sandbox at {}", dir.path().display());
            if let Err(e) = dir.close() {
                tracing::warn!("failed to remove sandbox: {}", e);
            }
        }
    }
}

/// Builds a [`ShellProvisioner`] from the `provisioner:` config section.
pub struct ShellProvisionerFactory;

impl ProvisionerFactory for ShellProvisionerFactory {
    fn provisioner(
        &self,
        config: &Config,
        _instance: &InstanceState,
        level: tracing::Level,
    ) -> Result<Box<dyn Provisioner>, ProvisionerError> {
        let section = config
            .provisioner
            .clone()
            .ok_or(ProvisionerError::NotConfigured)?;
        Ok(Box::new(ShellProvisioner::new(section, config, level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisioner_for(script: PathBuf, sudo: bool) -> ShellProvisioner {
        let driver = Config::from_yaml(&format!("sudo: {sudo}")).unwrap();
        let section = ShellProvisionerConfig {
            script,
            home: default_home(),
            install: None,
            init: None,
            prepare: None,
        };
        ShellProvisioner::new(section, &driver, tracing::Level::INFO)
    }

    #[tokio::test]
    async fn sandbox_stages_script_as_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("setup.sh");
        std::fs::write(&script, "#!/bin/sh\necho ok\n").unwrap();

        let provisioner = provisioner_for(script, true);
        let sandbox = provisioner.create_sandbox().await.unwrap().unwrap();

        assert!(sandbox.join(BOOTSTRAP_NAME).is_file());
        provisioner.cleanup_sandbox().await;
        assert!(!sandbox.exists());
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("setup.sh");
        std::fs::write(&script, "true\n").unwrap();

        let provisioner = provisioner_for(script, false);
        provisioner.create_sandbox().await.unwrap();
        provisioner.cleanup_sandbox().await;
        provisioner.cleanup_sandbox().await;
    }

    #[tokio::test]
    async fn missing_script_is_an_error() {
        let provisioner = provisioner_for(PathBuf::from("/nonexistent/setup.sh"), true);
        let err = provisioner.create_sandbox().await.unwrap_err();
        assert!(matches!(err, ProvisionerError::MissingScript(_)));
    }

    #[test]
    fn run_command_honors_sudo_policy() {
        let with_sudo = provisioner_for(PathBuf::from("s.sh"), true);
        let run = with_sudo.run_command().unwrap();
        assert!(run.starts_with("sudo -E "), "{run}");
        assert!(run.ends_with("/tmp/dokimi/bootstrap.sh"), "{run}");

        let without = provisioner_for(PathBuf::from("s.sh"), false);
        assert!(!without.run_command().unwrap().starts_with("sudo"));
    }

    #[test]
    fn init_defaults_to_resetting_home() {
        let provisioner = provisioner_for(PathBuf::from("s.sh"), false);
        assert_eq!(
            provisioner.init_command().unwrap(),
            "rm -rf /tmp/dokimi && mkdir -p /tmp/dokimi"
        );
    }
}
