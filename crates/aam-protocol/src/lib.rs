//! aam-protocol: Wire contract between kube-apparmor-manager and worker nodes
//!
//! This crate defines the shell commands sent to worker nodes over SSH and
//! the JSON status payload that comes back from `apparmor_status --json`.
//! Nothing here executes anything; every function is pure string
//! construction or decoding.

pub mod commands;
pub mod error;
pub mod profile;
pub mod status;

pub use commands::{
    complain_sequence, create_sequence, disable_sequence, elevate, enforce_sequence,
    install_sequence, set_mode_sequence, shell_quote, ENABLED_CHECK_COMMAND,
    STATUS_QUERY_COMMAND,
};
pub use error::ParseError;
pub use profile::{Profile, ProfileMode};
pub use status::{ProfileStatus, ENFORCE_MODE};
