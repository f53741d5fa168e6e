// ABOUTME: Connection argument assembly from config and instance state.
// ABOUTME: Pure merge with instance state winning on conflicting keys.

use nonempty::NonEmpty;
use std::path::PathBuf;

use crate::config::{Config, InstanceState};

/// Arguments required to open one connection to an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionArgs {
    pub host: String,
    pub user: String,
    pub options: ConnectionOptions,
}

/// Connection options derived from the merged config/state view.
///
/// Host-key verification is always off: targets are ephemeral test
/// instances whose keys change on every create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub user_known_hosts_file: PathBuf,
    pub verify_host_key: bool,
    pub port: u16,
    pub password: Option<String>,
    pub forward_agent: Option<bool>,
    pub keys: Option<NonEmpty<PathBuf>>,
}

impl ConnectionArgs {
    /// Merge instance state over the config snapshot.
    ///
    /// No I/O and no failure modes: absent optional fields are omitted.
    /// The username falls back state, config, `$USER`, then `root`.
    pub fn from_config(config: &Config, state: &InstanceState) -> Self {
        let user = state
            .username
            .clone()
            .or_else(|| config.username.clone())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "root".to_string());

        // A single configured key path normalizes to a one-element list.
        let keys = state
            .ssh_key
            .clone()
            .or_else(|| config.ssh_key.clone())
            .map(NonEmpty::new);

        Self {
            host: state.hostname.clone(),
            user,
            options: ConnectionOptions {
                user_known_hosts_file: PathBuf::from("/dev/null"),
                verify_host_key: false,
                port: state.port.unwrap_or(config.port),
                password: state.password.clone().or_else(|| config.password.clone()),
                forward_agent: state.forward_agent.or(config.forward_agent),
                keys,
            },
        }
    }
}
