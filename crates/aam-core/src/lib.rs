//! aam-core: Core abstractions and configuration for kube-apparmor-manager
//!
//! This crate provides the domain types, error taxonomy, configuration
//! structures and the trait seams (remote shell, cluster directory) used by
//! the reconciliation engine and the CLI.

pub mod config;
pub mod error;
pub mod kubectl;
pub mod traits;
pub mod types;

pub use aam_protocol::{Profile, ProfileMode, ProfileStatus};
pub use error::{ConfigError, ConnectionError, DirectoryError, ExecutionError};
pub use kubectl::KubectlDirectory;
pub use traits::{CommandOutput, Directory, RemoteSession, RemoteShell};
pub use types::{Node, NodeRole};
