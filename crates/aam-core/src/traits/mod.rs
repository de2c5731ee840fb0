//! Core trait definitions

mod directory;
mod remote;

pub use directory::Directory;
pub use remote::{CommandOutput, RemoteSession, RemoteShell};
