// ABOUTME: Instance lifecycle interface for concrete drivers.
// ABOUTME: Provides the Unimplemented placeholder and the StaticInstance variant.

use async_trait::async_trait;

use crate::config::{Config, InstanceState};
use crate::error::{Error, Result};
use crate::transport::{ConnectionArgs, Transport};

/// Required-method interface concrete drivers implement for instance
/// creation and destruction. The driver core is generic over this; it never
/// creates or destroys instances itself.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Bring the instance into existence and record its coordinates in
    /// `state`.
    async fn create(
        &self,
        config: &Config,
        transport: &dyn Transport,
        state: &mut InstanceState,
    ) -> Result<()>;

    async fn destroy(
        &self,
        config: &Config,
        transport: &dyn Transport,
        state: &mut InstanceState,
    ) -> Result<()>;
}

/// Default lifecycle: both operations are left to a concrete driver.
pub struct Unimplemented;

#[async_trait]
impl Lifecycle for Unimplemented {
    async fn create(
        &self,
        _config: &Config,
        _transport: &dyn Transport,
        _state: &mut InstanceState,
    ) -> Result<()> {
        Err(Error::NotImplemented("create"))
    }

    async fn destroy(
        &self,
        _config: &Config,
        _transport: &dyn Transport,
        _state: &mut InstanceState,
    ) -> Result<()> {
        Err(Error::NotImplemented("destroy"))
    }
}

/// Lifecycle for instances managed outside this tool: `create` only waits
/// for sshd to accept connections, `destroy` leaves the instance alone.
pub struct StaticInstance;

#[async_trait]
impl Lifecycle for StaticInstance {
    async fn create(
        &self,
        config: &Config,
        transport: &dyn Transport,
        state: &mut InstanceState,
    ) -> Result<()> {
        let args = ConnectionArgs::from_config(config, state);
        transport
            .wait_until_ready(&args)
            .await
            .map_err(Error::action_failed)
    }

    async fn destroy(
        &self,
        _config: &Config,
        _transport: &dyn Transport,
        state: &mut InstanceState,
    ) -> Result<()> {
        tracing::debug!("leaving pre-provisioned instance {} alone", state.hostname);
        Ok(())
    }
}
