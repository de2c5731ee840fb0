//! Remote shell client over SSH

mod ssh;

pub use ssh::{SshSession, SshShell};
