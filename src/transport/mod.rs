// ABOUTME: Transport boundary for remote instances.
// ABOUTME: Defines Transport/Connection traits, connection args, and the login descriptor.

mod args;
mod error;
mod ssh;

pub use args::{ConnectionArgs, ConnectionOptions};
pub use error::TransportError;
pub use ssh::SshTransport;

use async_trait::async_trait;
use std::borrow::Cow;
use std::path::Path;

/// An open, authenticated session scoped to the body of one phase call.
///
/// The driver guarantees `close` runs on every exit path of that scope.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a command on the instance. Non-zero exit is an error.
    async fn execute(&self, command: &str) -> Result<(), TransportError>;

    /// Upload a local file or directory tree into `remote`.
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Opens connections and owns readiness-poll policy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, args: &ConnectionArgs) -> Result<Box<dyn Connection>, TransportError>;

    /// Poll the endpoint until it accepts connections or the transport's
    /// timeout policy gives up.
    async fn wait_until_ready(&self, args: &ConnectionArgs) -> Result<(), TransportError>;

    /// Derive an interactive login invocation without opening a connection.
    fn login_command(&self, args: &ConnectionArgs) -> LoginCommand;
}

/// Descriptor for an interactive login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LoginCommand {
    /// Shell-escaped rendering, suitable for display or copy-paste.
    pub fn rendered(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(
            self.args
                .iter()
                .map(|a| shell_escape::unix::escape(Cow::from(a.as_str())).into_owned()),
        );
        parts.join(" ")
    }
}

impl std::fmt::Display for LoginCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rendered())
    }
}
