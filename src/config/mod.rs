// ABOUTME: Configuration types and parsing for dokimi.yml.
// ABOUTME: Handles YAML parsing, defaults, and config file discovery.

mod init;
mod state;

pub use init::init_config;
pub use state::InstanceState;

use crate::error::{Error, Result};
use crate::provisioner::ShellProvisionerConfig;
use crate::runner::RunnerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "dokimi.yml";
pub const CONFIG_FILENAME_ALT: &str = "dokimi.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dokimi/config.yml";

/// Driver configuration, immutable for the duration of a run.
///
/// Phase calls only read it; per-instance dynamic fields live in
/// [`InstanceState`] and take precedence when the two are merged into
/// connection arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Run provisioner and bootstrap commands under sudo.
    #[serde(default = "default_sudo")]
    pub sudo: bool,

    /// SSH port used unless the instance state overrides it.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub ssh_key: Option<PathBuf>,

    #[serde(default)]
    pub forward_agent: Option<bool>,

    /// HTTP proxy exported to remote commands. May contain the
    /// `HOST_MACHINE` placeholder, resolved against the local hostname.
    #[serde(default)]
    pub http_proxy: Option<String>,

    /// HTTPS proxy exported to remote commands, same placeholder rules.
    #[serde(default)]
    pub https_proxy: Option<String>,

    /// Probe configured proxies before exporting them.
    #[serde(default)]
    pub proxy_health_checking: bool,

    /// Remote bin directory of the provisioning engine's ruby, appended to PATH.
    #[serde(default)]
    pub ruby_binpath: Option<String>,

    /// Extra remote bin directory appended to PATH.
    #[serde(default)]
    pub path: Option<String>,

    /// How long `wait_for_sshd` keeps polling before giving up.
    #[serde(default = "default_ready_timeout", with = "humantime_serde")]
    pub ready_timeout: Duration,

    /// Pre-provisioned instance this driver operates on.
    #[serde(default)]
    pub instance: Option<InstanceState>,

    #[serde(default)]
    pub provisioner: Option<ShellProvisionerConfig>,

    #[serde(default)]
    pub runner: Option<RunnerConfig>,
}

fn default_sudo() -> bool {
    true
}

fn default_port() -> u16 {
    22
}

fn default_ready_timeout() -> Duration {
    Duration::from_secs(600)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Wrap a command with sudo when the `sudo` option is on.
    ///
    /// `-E` keeps the exported proxy/PATH environment visible to the command.
    pub fn sudo_wrap(&self, command: &str) -> String {
        if self.sudo {
            format!("sudo -E {command}")
        } else {
            command.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_declared_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.sudo);
        assert_eq!(config.port, 22);
        assert!(!config.proxy_health_checking);
        assert_eq!(config.ready_timeout, Duration::from_secs(600));
        assert!(config.http_proxy.is_none());
        assert!(config.instance.is_none());
    }

    #[test]
    fn parses_instance_section() {
        let yaml = r#"
sudo: false
instance:
  hostname: box-1.test
  username: kitchen
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(!config.sudo);
        let instance = config.instance.unwrap();
        assert_eq!(instance.hostname, "box-1.test");
        assert_eq!(instance.username.as_deref(), Some("kitchen"));
        assert!(instance.password.is_none());
    }

    #[test]
    fn ready_timeout_accepts_humantime() {
        let config = Config::from_yaml("ready_timeout: 2m").unwrap();
        assert_eq!(config.ready_timeout, Duration::from_secs(120));
    }

    #[test]
    fn sudo_wrap_honors_option() {
        let with_sudo = Config::from_yaml("{}").unwrap();
        assert_eq!(with_sudo.sudo_wrap("whoami"), "sudo -E whoami");

        let without = Config::from_yaml("sudo: false").unwrap();
        assert_eq!(without.sudo_wrap("whoami"), "whoami");
    }

    #[test]
    fn discover_fails_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}
