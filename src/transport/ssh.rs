// ABOUTME: SSH transport implementation using russh.
// ABOUTME: Handles connection, authentication, command execution, and tar-stream uploads.

use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::TransportError;
use super::{Connection, ConnectionArgs, LoginCommand, Transport};

/// SSH transport with readiness-poll and command-timeout policy.
///
/// Policy knobs live here, not in the driver core: the driver asks for
/// readiness, the transport decides how long and how often to poll.
#[derive(Debug, Clone)]
pub struct SshTransport {
    ready_timeout: Duration,
    ready_poll_interval: Duration,
    command_timeout: Duration,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SshTransport {
    pub fn new() -> Self {
        Self {
            ready_timeout: Duration::from_secs(600),
            ready_poll_interval: Duration::from_secs(3),
            command_timeout: Duration::from_secs(300),
        }
    }

    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn ready_poll_interval(mut self, interval: Duration) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    async fn open_session(&self, args: &ConnectionArgs) -> Result<SshConnection, TransportError> {
        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let mut session = client::connect(
            Arc::new(russh_config),
            (args.host.as_str(), args.options.port),
            AcceptAllKeys,
        )
        .await
        .map_err(|e| {
            if e.to_string().contains("Connection refused") {
                TransportError::Connection(format!(
                    "connection refused to {}:{}",
                    args.host, args.options.port
                ))
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        if !authenticate(&mut session, args).await? {
            return Err(TransportError::AuthenticationFailed);
        }

        Ok(SshConnection {
            handle: Arc::new(session),
            command_timeout: self.command_timeout,
        })
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn connect(&self, args: &ConnectionArgs) -> Result<Box<dyn Connection>, TransportError> {
        let session = self.open_session(args).await?;
        Ok(Box::new(session))
    }

    async fn wait_until_ready(&self, args: &ConnectionArgs) -> Result<(), TransportError> {
        tracing::info!(
            "Waiting for sshd on {}:{}",
            args.host,
            args.options.port
        );
        let started = Instant::now();

        loop {
            match self.open_session(args).await {
                Ok(session) => {
                    let probe = session.execute("true").await;
                    let _ = session.close().await;
                    if probe.is_ok() {
                        return Ok(());
                    }
                    tracing::debug!("sshd on {} answered but is not usable yet", args.host);
                }
                Err(e) => {
                    tracing::debug!("sshd not ready on {}: {}", args.host, e);
                }
            }

            if started.elapsed() >= self.ready_timeout {
                return Err(TransportError::NotReady {
                    host: args.host.clone(),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.ready_poll_interval).await;
        }
    }

    fn login_command(&self, args: &ConnectionArgs) -> LoginCommand {
        let mut argv = vec![
            "-o".to_string(),
            format!(
                "UserKnownHostsFile={}",
                args.options.user_known_hosts_file.display()
            ),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
        ];

        if args.options.forward_agent == Some(true) {
            argv.push("-A".to_string());
        }
        if let Some(keys) = &args.options.keys {
            for key in keys.iter() {
                argv.push("-i".to_string());
                argv.push(key.display().to_string());
            }
        }
        if args.options.port != 22 {
            argv.push("-p".to_string());
            argv.push(args.options.port.to_string());
        }
        argv.push(format!("{}@{}", args.user, args.host));

        LoginCommand {
            program: "ssh".to_string(),
            args: argv,
        }
    }
}

/// Host keys are accepted unconditionally; ConnectionArgs pins verification
/// off because target instances are ephemeral.
struct AcceptAllKeys;

impl client::Handler for AcceptAllKeys {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Try configured keys first, then the password.
async fn authenticate(
    session: &mut Handle<AcceptAllKeys>,
    args: &ConnectionArgs,
) -> Result<bool, TransportError> {
    if let Some(keys) = &args.options.keys {
        for key_path in keys.iter() {
            let key = load_secret_key(key_path, None).map_err(|e| TransportError::KeyLoadFailed {
                path: key_path.clone(),
                reason: e.to_string(),
            })?;

            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .map_err(TransportError::Protocol)?
                .flatten();

            let result = session
                .authenticate_publickey(
                    &args.user,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await
                .map_err(TransportError::Protocol)?;

            if result.success() {
                return Ok(true);
            }
        }
    }

    if let Some(password) = &args.options.password {
        let result = session
            .authenticate_password(&args.user, password)
            .await
            .map_err(TransportError::Protocol)?;
        return Ok(result.success());
    }

    Ok(false)
}

/// An established SSH connection.
struct SshConnection {
    handle: Arc<Handle<AcceptAllKeys>>,
    command_timeout: Duration,
}

/// Raw output of one exec channel.
struct ExecOutput {
    exit_code: u32,
    stderr: String,
}

impl SshConnection {
    async fn exec_raw(&self, command: &str) -> Result<ExecOutput, TransportError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::CommandFailed(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| TransportError::CommandFailed(format!("failed to exec command: {}", e)))?;

        self.drain_channel(&mut channel).await
    }

    /// Pump channel messages until both EOF and exit status arrive.
    async fn drain_channel(
        &self,
        channel: &mut russh::Channel<client::Msg>,
    ) -> Result<ExecOutput, TransportError> {
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;
        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    tracing::trace!("{}", String::from_utf8_lossy(&data));
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => {
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }

        // A channel that closes without an exit status indicates abnormal
        // termination (connection timeout, network issue).
        if !got_exit_status {
            return Err(TransportError::ChannelClosed);
        }

        Ok(ExecOutput {
            exit_code,
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }
}

#[async_trait]
impl Connection for SshConnection {
    async fn execute(&self, command: &str) -> Result<(), TransportError> {
        tracing::debug!("executing: {}", command);
        let output = match tokio::time::timeout(self.command_timeout, self.exec_raw(command)).await
        {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::CommandTimeout(self.command_timeout)),
        };

        if output.exit_code != 0 {
            let stderr = output.stderr.trim();
            let detail = if stderr.is_empty() {
                String::new()
            } else {
                format!(": {}", stderr)
            };
            return Err(TransportError::ExecFailed {
                command: command.to_string(),
                exit_code: output.exit_code,
                detail,
            });
        }
        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        tracing::debug!("uploading {} to {}", local.display(), remote);
        let archive = build_archive(local.to_path_buf()).await?;

        let quoted = shell_escape::unix::escape(Cow::from(remote)).into_owned();
        let command = format!("mkdir -p {quoted} && tar -xf - -C {quoted}");

        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::UploadFailed(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command.as_str())
            .await
            .map_err(|e| TransportError::UploadFailed(format!("failed to start unpack: {}", e)))?;

        channel
            .data(&archive[..])
            .await
            .map_err(|e| TransportError::UploadFailed(format!("failed to stream archive: {}", e)))?;
        channel
            .eof()
            .await
            .map_err(|e| TransportError::UploadFailed(format!("failed to finish stream: {}", e)))?;

        let output = self.drain_channel(&mut channel).await?;
        if output.exit_code != 0 {
            return Err(TransportError::UploadFailed(format!(
                "remote unpack exited with status {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Protocol)?;
        Ok(())
    }
}

/// Build a tar archive of a file or directory tree in a blocking task.
async fn build_archive(local: std::path::PathBuf) -> Result<Vec<u8>, TransportError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>, TransportError> {
        let mut builder = tar::Builder::new(Vec::new());
        let metadata = std::fs::metadata(&local)?;
        if metadata.is_dir() {
            builder.append_dir_all(".", &local)?;
        } else {
            let name = local
                .file_name()
                .ok_or_else(|| TransportError::UploadFailed("path has no file name".to_string()))?;
            builder.append_path_with_name(&local, name)?;
        }
        Ok(builder.into_inner()?)
    })
    .await
    .map_err(|e| TransportError::UploadFailed(format!("archive task failed: {}", e)))?
}
