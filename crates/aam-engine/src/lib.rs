//! aam-engine: Fleet reconciliation engine for kube-apparmor-manager
//!
//! The engine lists ready nodes and declared profiles from the cluster,
//! connects to each worker node over SSH in turn, and turns the declared
//! state into AppArmor commands. Nodes are handled strictly one at a time
//! and the first hard failure stops the whole fleet operation.

pub mod error;
pub mod reconciler;
pub mod remote;

pub use error::{EngineError, FleetError};
pub use reconciler::{EngineOptions, Reconciler};
pub use remote::{SshSession, SshShell};
