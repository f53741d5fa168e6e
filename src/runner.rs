// ABOUTME: Test-runner collaborator boundary for the setup and verify phases.
// ABOUTME: Defines the TestRunner trait and the config-backed implementation.

use serde::Deserialize;

use crate::config::Config;

/// Supplies the test-runner agent's command strings.
///
/// Every command is optional; absent commands are skipped by the driver.
pub trait TestRunner: Send + Sync {
    fn setup_command(&self) -> Option<String> {
        None
    }

    fn sync_command(&self) -> Option<String> {
        None
    }

    fn run_command(&self) -> Option<String> {
        None
    }
}

/// The `runner:` section of dokimi.yml.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub setup: Option<String>,

    #[serde(default)]
    pub sync: Option<String>,

    #[serde(default)]
    pub run: Option<String>,
}

/// Shipped runner: command strings come straight from configuration.
///
/// A missing `runner:` section yields a runner whose phases are all no-ops.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredRunner {
    config: RunnerConfig,
}

impl ConfiguredRunner {
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: config.runner.clone().unwrap_or_default(),
        }
    }
}

impl TestRunner for ConfiguredRunner {
    fn setup_command(&self) -> Option<String> {
        self.config.setup.clone()
    }

    fn sync_command(&self) -> Option<String> {
        self.config.sync.clone()
    }

    fn run_command(&self) -> Option<String> {
        self.config.run.clone()
    }
}
