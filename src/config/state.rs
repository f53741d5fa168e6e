// ABOUTME: Per-instance dynamic state discovered at creation time.
// ABOUTME: Merged over the static Config, with state winning on collision.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dynamic fields describing one remote instance.
///
/// Supplied fresh to every phase call. Any field set here overrides the
/// matching [`Config`](crate::config::Config) option when connection
/// arguments are built.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceState {
    pub hostname: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub forward_agent: Option<bool>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub ssh_key: Option<PathBuf>,
}

impl InstanceState {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            username: None,
            password: None,
            forward_agent: None,
            port: None,
            ssh_key: None,
        }
    }
}
