//! Core error types for kube-apparmor-manager

use std::path::PathBuf;
use thiserror::Error;

/// Errors opening a remote shell session to a node
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// TCP connect or SSH handshake did not finish in time
    #[error("Connection to {host} timed out")]
    Timeout { host: String },

    /// Network or handshake failure
    #[error("Connection to {host} failed: {reason}")]
    Refused { host: String, reason: String },

    /// The node rejected our key
    #[error("Authentication failed for user '{user}' on {host}")]
    AuthenticationFailed { user: String, host: String },

    /// Private key could not be read or decrypted
    #[error("Failed to load private key {path}: {reason}")]
    KeyLoad { path: String, reason: String },
}

/// Transport failures while running a command on an open session
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Session was already closed
    #[error("Session to {host} is closed")]
    NotConnected { host: String },

    /// Could not open a channel for the command
    #[error("Failed to open channel on {host}: {reason}")]
    ChannelOpen { host: String, reason: String },

    /// Channel opened but the command could not be started
    #[error("Failed to run '{command}' on {host}: {reason}")]
    Exec {
        host: String,
        command: String,
        reason: String,
    },
}

/// Errors reading inventory or profiles from the cluster
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The kubectl binary could not be started
    #[error("Failed to run {binary}: {source}")]
    KubectlUnavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// kubectl ran but exited unsuccessfully
    #[error("kubectl {args} failed: {stderr}")]
    CommandFailed { args: String, stderr: String },

    /// kubectl output was not the expected JSON
    #[error("Failed to decode kubectl output: {0}")]
    Decode(#[from] serde_json::Error),

    /// I/O error talking to the kubectl process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
