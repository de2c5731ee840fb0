//! SSH remote shell
//!
//! Opens one authenticated SSH connection per node operation and runs each
//! command on its own `exec` channel, collecting stdout, stderr and the exit
//! status until the channel closes.

use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::{KeyPair, PublicKey};

use aam_core::config::SshConfig;
use aam_core::{CommandOutput, ConnectionError, ExecutionError, RemoteSession, RemoteShell};
use aam_protocol::elevate;

/// Extended data type carrying stderr (RFC 4254 section 5.2)
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Opens SSH sessions to worker nodes with a preloaded key
pub struct SshShell {
    /// Identity configuration
    config: SshConfig,
    /// Private key for authentication
    key: Arc<KeyPair>,
}

impl SshShell {
    /// Load the private key and build a shell ready to connect
    pub fn new(config: SshConfig) -> Result<Self, ConnectionError> {
        let key_path = config.resolved_key_path();

        if !key_path.exists() {
            return Err(ConnectionError::KeyLoad {
                path: key_path.display().to_string(),
                reason: "File does not exist".to_string(),
            });
        }

        let key = russh_keys::load_secret_key(&key_path, config.passphrase.as_deref()).map_err(
            |e| ConnectionError::KeyLoad {
                path: key_path.display().to_string(),
                reason: e.to_string(),
            },
        )?;

        tracing::debug!("Loaded SSH key from {}", key_path.display());

        Ok(Self {
            config,
            key: Arc::new(key),
        })
    }

    /// Get the identity configuration
    pub fn config(&self) -> &SshConfig {
        &self.config
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    type Session = SshSession;

    async fn connect(&self, host: &str, port: u16) -> Result<SshSession, ConnectionError> {
        let ssh_config = Arc::new(Config::default());
        let handler = ClientHandler {
            host: host.to_string(),
        };

        tracing::debug!("Connecting to {}:{}", host, port);
        let mut handle = tokio::time::timeout(
            self.config.connect_timeout,
            client::connect(ssh_config, (host, port), handler),
        )
        .await
        .map_err(|_| ConnectionError::Timeout {
            host: host.to_string(),
        })?
        .map_err(|e| ConnectionError::Refused {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Authenticating as user '{}'", self.config.username);
        let authenticated = handle
            .authenticate_publickey(&self.config.username, Arc::clone(&self.key))
            .await
            .map_err(|e| ConnectionError::Refused {
                host: host.to_string(),
                reason: format!("Authentication error: {}", e),
            })?;

        if !authenticated {
            return Err(ConnectionError::AuthenticationFailed {
                user: self.config.username.clone(),
                host: host.to_string(),
            });
        }

        Ok(SshSession {
            host: host.to_string(),
            handle: Some(handle),
        })
    }
}

/// An open SSH connection to one node.
///
/// Dropping it without calling `close` still tears the connection down,
/// because the russh session task ends with its last handle.
pub struct SshSession {
    host: String,
    handle: Option<Handle<ClientHandler>>,
}

#[async_trait]
impl RemoteSession for SshSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn execute_one(
        &mut self,
        command: &str,
        elevated: bool,
    ) -> Result<CommandOutput, ExecutionError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| ExecutionError::NotConnected {
                host: self.host.clone(),
            })?;

        let mut channel =
            handle
                .channel_open_session()
                .await
                .map_err(|e| ExecutionError::ChannelOpen {
                    host: self.host.clone(),
                    reason: e.to_string(),
                })?;

        let command = if elevated {
            elevate(command)
        } else {
            command.to_string()
        };

        channel
            .exec(true, command.as_str())
            .await
            .map_err(|e| ExecutionError::Exec {
                host: self.host.clone(),
                command: command.clone(),
                reason: e.to_string(),
            })?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        tracing::trace!(host = %self.host, ?exit_status, "Command finished: {}", command);

        Ok(CommandOutput::new(
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
            exit_status,
        ))
    }

    async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
            {
                tracing::debug!(host = %self.host, "Disconnect failed: {}", e);
            }
        }
    }
}

/// SSH client handler for node sessions
struct ClientHandler {
    host: String,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    /// Accept any host key.
    ///
    /// Worker nodes come and go with the cluster and there is no known_hosts
    /// source for them, so the key is only logged.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!(host = %self.host, "Server host key: {}", server_public_key.fingerprint());
        Ok(true)
    }
}
