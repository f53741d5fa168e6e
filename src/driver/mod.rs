// ABOUTME: The provisioning lifecycle driver.
// ABOUTME: Runs converge/setup/verify phases, one scoped connection per phase.

mod lifecycle;

pub use lifecycle::{Lifecycle, StaticInstance, Unimplemented};

use std::sync::Arc;

use crate::config::{Config, InstanceState};
use crate::env::EnvCommand;
use crate::error::{Error, Result};
use crate::executor::RemoteExecutor;
use crate::probe::{HttpProbe, Probe};
use crate::provisioner::{Provisioner, ProvisionerFactory, ShellProvisionerFactory};
use crate::runner::{ConfiguredRunner, TestRunner};
use crate::transport::{Connection, ConnectionArgs, LoginCommand, Transport};

/// Drives one remote instance through the provisioning lifecycle.
///
/// Each phase call opens exactly one connection, runs its ordered steps, and
/// closes the connection on every exit path. Phases on the same driver are
/// not safe to run concurrently; callers serialize them per instance.
pub struct Driver<L = Unimplemented> {
    config: Config,
    transport: Arc<dyn Transport>,
    provisioners: Arc<dyn ProvisionerFactory>,
    runner: Arc<dyn TestRunner>,
    probe: Arc<dyn Probe>,
    lifecycle: L,
}

impl<L: Lifecycle> Driver<L> {
    /// Build a driver with the shipped collaborators: shell provisioner
    /// factory, config-backed runner, HTTP reachability probe.
    pub fn new(config: Config, transport: Arc<dyn Transport>, lifecycle: L) -> Self {
        let runner = Arc::new(ConfiguredRunner::from_config(&config));
        Self {
            config,
            transport,
            provisioners: Arc::new(ShellProvisionerFactory),
            runner,
            probe: Arc::new(HttpProbe::new()),
            lifecycle,
        }
    }

    pub fn with_provisioners(mut self, provisioners: Arc<dyn ProvisionerFactory>) -> Self {
        self.provisioners = provisioners;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn TestRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the instance. Left to the lifecycle implementation.
    pub async fn create(&self, state: &mut InstanceState) -> Result<()> {
        self.lifecycle
            .create(&self.config, self.transport.as_ref(), state)
            .await
    }

    /// Destroy the instance. Left to the lifecycle implementation.
    pub async fn destroy(&self, state: &mut InstanceState) -> Result<()> {
        self.lifecycle
            .destroy(&self.config, self.transport.as_ref(), state)
            .await
    }

    /// Install and initialize the provisioning engine, transfer the sandbox,
    /// prepare, and run, in that order. Absent steps are skipped.
    ///
    /// The provisioner's sandbox is cleaned up exactly once after the
    /// connection scope exits, whether the steps succeeded or not.
    pub async fn converge(&self, state: &InstanceState) -> Result<()> {
        let provisioner =
            self.provisioners
                .provisioner(&self.config, state, subscriber_level())?;

        let result = self.converge_inner(state, provisioner.as_ref()).await;
        provisioner.cleanup_sandbox().await;
        result
    }

    async fn converge_inner(
        &self,
        state: &InstanceState,
        provisioner: &dyn Provisioner,
    ) -> Result<()> {
        let executor = self.executor().await;
        let conn = self.connect(state).await?;
        let result = self
            .converge_steps(&executor, provisioner, conn.as_ref())
            .await;
        close_connection(conn.as_ref()).await;
        result
    }

    async fn converge_steps(
        &self,
        executor: &RemoteExecutor,
        provisioner: &dyn Provisioner,
        conn: &dyn Connection,
    ) -> Result<()> {
        executor
            .run_remote(provisioner.install_command().as_deref(), conn)
            .await?;
        executor
            .run_remote(provisioner.init_command().as_deref(), conn)
            .await?;

        let sandbox = provisioner.create_sandbox().await?;
        executor
            .transfer_path(sandbox.as_deref(), provisioner.home_path(), conn)
            .await?;

        executor
            .run_remote(provisioner.prepare_command().as_deref(), conn)
            .await?;
        executor
            .run_remote(provisioner.run_command().as_deref(), conn)
            .await
    }

    /// Run the test-runner setup command on the instance.
    pub async fn setup(&self, state: &InstanceState) -> Result<()> {
        let executor = self.executor().await;
        let conn = self.connect(state).await?;
        let result = executor
            .run_remote(self.runner.setup_command().as_deref(), conn.as_ref())
            .await;
        close_connection(conn.as_ref()).await;
        result
    }

    /// Sync test content to the instance, then run the tests.
    ///
    /// Sync is always attempted before run, even when it resolves to a
    /// no-op.
    pub async fn verify(&self, state: &InstanceState) -> Result<()> {
        let executor = self.executor().await;
        let conn = self.connect(state).await?;
        let result = self.verify_steps(&executor, conn.as_ref()).await;
        close_connection(conn.as_ref()).await;
        result
    }

    async fn verify_steps(&self, executor: &RemoteExecutor, conn: &dyn Connection) -> Result<()> {
        executor
            .run_remote(self.runner.sync_command().as_deref(), conn)
            .await?;
        executor
            .run_remote(self.runner.run_command().as_deref(), conn)
            .await
    }

    /// Derive the interactive login invocation for the instance. No
    /// persistent connection is opened.
    pub fn login_command(&self, state: &InstanceState) -> LoginCommand {
        let args = ConnectionArgs::from_config(&self.config, state);
        self.transport.login_command(&args)
    }

    /// Ad-hoc escape hatch: run one command using caller-supplied connection
    /// arguments, bypassing the config/state merge.
    pub async fn ssh(&self, args: &ConnectionArgs, command: &str) -> Result<()> {
        let executor = self.executor().await;
        let conn = self
            .transport
            .connect(args)
            .await
            .map_err(Error::action_failed)?;
        let result = executor.run_remote(Some(command), conn.as_ref()).await;
        close_connection(conn.as_ref()).await;
        result
    }

    /// Poll the instance until sshd accepts connections or the transport's
    /// retry policy gives up.
    pub async fn wait_for_sshd(&self, state: &InstanceState) -> Result<()> {
        let args = ConnectionArgs::from_config(&self.config, state);
        self.transport
            .wait_until_ready(&args)
            .await
            .map_err(Error::action_failed)
    }

    async fn connect(&self, state: &InstanceState) -> Result<Box<dyn Connection>> {
        let args = ConnectionArgs::from_config(&self.config, state);
        self.transport
            .connect(&args)
            .await
            .map_err(Error::action_failed)
    }

    async fn executor(&self) -> RemoteExecutor {
        RemoteExecutor::new(EnvCommand::resolve(&self.config, self.probe.as_ref()).await)
    }
}

/// Close failures after a completed phase body must not override the phase
/// result; they are demoted to warnings.
async fn close_connection(conn: &dyn Connection) {
    if let Err(e) = conn.close().await {
        tracing::warn!("failed to close connection: {}", e);
    }
}

/// Log level handed to provisioner construction, derived from the active
/// subscriber.
fn subscriber_level() -> tracing::Level {
    tracing::level_filters::LevelFilter::current()
        .into_level()
        .unwrap_or(tracing::Level::INFO)
}
