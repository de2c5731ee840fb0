//! Remote shell traits

use async_trait::async_trait;

use crate::error::{ConnectionError, ExecutionError};

/// Captured result of one remote command.
///
/// Stderr is payload, not a verdict. Callers decide whether it matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, one trailing newline removed
    pub stdout: String,
    /// Standard error, one trailing newline removed
    pub stderr: String,
    /// Exit status if the remote side reported one
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    /// Build an output, stripping one trailing newline from each stream
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_status: Option<u32>) -> Self {
        Self {
            stdout: strip_trailing_newline(stdout.into()),
            stderr: strip_trailing_newline(stderr.into()),
            exit_status,
        }
    }

    /// The command reported exit status zero
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    /// Something was written to stderr
    pub fn has_stderr(&self) -> bool {
        !self.stderr.is_empty()
    }
}

fn strip_trailing_newline(mut s: String) -> String {
    if s.ends_with('\n') {
        s.pop();
    }
    s
}

/// Opens sessions to remote hosts
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// The session type produced by this shell
    type Session: RemoteSession;

    /// Open an authenticated session to `host:port`
    async fn connect(&self, host: &str, port: u16) -> Result<Self::Session, ConnectionError>;
}

/// One authenticated connection to one host.
///
/// Whoever obtains a session from [`RemoteShell::connect`] must call
/// [`RemoteSession::close`] on every exit path.
#[async_trait]
pub trait RemoteSession: Send {
    /// Host this session is connected to
    fn host(&self) -> &str;

    /// Run one command in a fresh execution context.
    ///
    /// With `elevate` set the command runs under `sudo`. Only transport
    /// failures are errors.
    async fn execute_one(
        &mut self,
        command: &str,
        elevate: bool,
    ) -> Result<CommandOutput, ExecutionError>;

    /// Run commands in order, stopping at the first transport failure.
    ///
    /// Output on stderr is logged and does not stop the batch.
    async fn execute_batch(
        &mut self,
        commands: &[String],
        elevate: bool,
    ) -> Result<(), ExecutionError> {
        let host = self.host().to_string();

        for command in commands {
            tracing::info!(host = %host, "Execute command: {}", command);
            let output = self.execute_one(command, elevate).await?;

            if !output.stdout.is_empty() {
                tracing::info!(host = %host, "{}", output.stdout);
            }

            if output.has_stderr() {
                tracing::warn!(host = %host, exit_status = ?output.exit_status, "{}", output.stderr);
            }
        }

        Ok(())
    }

    /// Release the connection. Calling it again is a no-op.
    async fn close(&mut self);
}
