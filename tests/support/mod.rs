// ABOUTME: Test support utilities.
// ABOUTME: Provides scripted transport and provisioner doubles for driver tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dokimi::config::{Config, InstanceState};
use dokimi::provisioner::{Provisioner, ProvisionerError, ProvisionerFactory};
use dokimi::transport::{Connection, ConnectionArgs, LoginCommand, Transport, TransportError};

/// Everything the mock transport observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect { host: String, user: String },
    Execute(String),
    Upload { local: PathBuf, remote: String },
    Close,
    WaitUntilReady(String),
}

/// Transport double recording every interaction.
///
/// `fail_on` injects a failure into the first executed command containing
/// the given substring; `fail_wait` makes readiness polling give up.
#[derive(Default)]
pub struct MockTransport {
    log: Arc<Mutex<Vec<Event>>>,
    fail_on: Option<String>,
    fail_connect: bool,
    fail_wait: bool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(substring: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(substring.to_string()),
            ..Self::default()
        })
    }

    pub fn refusing_connections() -> Arc<Self> {
        Arc::new(Self {
            fail_connect: true,
            ..Self::default()
        })
    }

    pub fn never_ready() -> Arc<Self> {
        Arc::new(Self {
            fail_wait: true,
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Execute(command) => Some(command),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, args: &ConnectionArgs) -> Result<Box<dyn Connection>, TransportError> {
        if self.fail_connect {
            return Err(TransportError::Connection(format!(
                "connection refused to {}:{}",
                args.host, args.options.port
            )));
        }
        self.log.lock().push(Event::Connect {
            host: args.host.clone(),
            user: args.user.clone(),
        });
        Ok(Box::new(MockConnection {
            log: Arc::clone(&self.log),
            fail_on: self.fail_on.clone(),
        }))
    }

    async fn wait_until_ready(&self, args: &ConnectionArgs) -> Result<(), TransportError> {
        if self.fail_wait {
            return Err(TransportError::NotReady {
                host: args.host.clone(),
                waited: Duration::from_secs(1),
            });
        }
        self.log.lock().push(Event::WaitUntilReady(args.host.clone()));
        Ok(())
    }

    fn login_command(&self, args: &ConnectionArgs) -> LoginCommand {
        LoginCommand {
            program: "ssh".to_string(),
            args: vec![format!("{}@{}", args.user, args.host)],
        }
    }
}

struct MockConnection {
    log: Arc<Mutex<Vec<Event>>>,
    fail_on: Option<String>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&self, command: &str) -> Result<(), TransportError> {
        if let Some(marker) = &self.fail_on
            && command.contains(marker.as_str())
        {
            return Err(TransportError::CommandFailed(format!(
                "injected failure for `{command}`"
            )));
        }
        self.log.lock().push(Event::Execute(command.to_string()));
        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        self.log.lock().push(Event::Upload {
            local: local.to_path_buf(),
            remote: remote.to_string(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.log.lock().push(Event::Close);
        Ok(())
    }
}

/// Provisioner double with scripted commands and a shared cleanup counter.
pub struct ScriptedProvisioner {
    pub install: Option<String>,
    pub init: Option<String>,
    pub prepare: Option<String>,
    pub run: Option<String>,
    pub home: String,
    pub sandbox: Option<PathBuf>,
    pub sandbox_fails: bool,
    pub cleanups: Arc<Mutex<u32>>,
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    fn install_command(&self) -> Option<String> {
        self.install.clone()
    }

    fn init_command(&self) -> Option<String> {
        self.init.clone()
    }

    fn prepare_command(&self) -> Option<String> {
        self.prepare.clone()
    }

    fn run_command(&self) -> Option<String> {
        self.run.clone()
    }

    fn home_path(&self) -> &str {
        &self.home
    }

    async fn create_sandbox(&self) -> Result<Option<PathBuf>, ProvisionerError> {
        if self.sandbox_fails {
            return Err(ProvisionerError::Sandbox(std::io::Error::other(
                "sandbox staging failed",
            )));
        }
        Ok(self.sandbox.clone())
    }

    async fn cleanup_sandbox(&self) {
        *self.cleanups.lock() += 1;
    }
}

/// Factory producing [`ScriptedProvisioner`]s that share one cleanup counter.
pub struct ScriptedFactory {
    pub install: Option<String>,
    pub init: Option<String>,
    pub prepare: Option<String>,
    pub run: Option<String>,
    pub home: String,
    pub sandbox: Option<PathBuf>,
    pub sandbox_fails: bool,
    pub construction_fails: bool,
    pub cleanups: Arc<Mutex<u32>>,
}

impl Default for ScriptedFactory {
    fn default() -> Self {
        Self {
            install: None,
            init: None,
            prepare: None,
            run: None,
            home: "/tmp/dokimi".to_string(),
            sandbox: None,
            sandbox_fails: false,
            construction_fails: false,
            cleanups: Arc::new(Mutex::new(0)),
        }
    }
}

impl ScriptedFactory {
    pub fn cleanup_count(&self) -> u32 {
        *self.cleanups.lock()
    }
}

impl ProvisionerFactory for ScriptedFactory {
    fn provisioner(
        &self,
        _config: &Config,
        _instance: &InstanceState,
        _level: tracing::Level,
    ) -> Result<Box<dyn Provisioner>, ProvisionerError> {
        if self.construction_fails {
            return Err(ProvisionerError::NotConfigured);
        }
        Ok(Box::new(ScriptedProvisioner {
            install: self.install.clone(),
            init: self.init.clone(),
            prepare: self.prepare.clone(),
            run: self.run.clone(),
            home: self.home.clone(),
            sandbox: self.sandbox.clone(),
            sandbox_fails: self.sandbox_fails,
            cleanups: Arc::clone(&self.cleanups),
        }))
    }
}
