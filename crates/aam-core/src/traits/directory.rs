//! Cluster directory trait

use async_trait::async_trait;

use aam_protocol::Profile;

use crate::error::DirectoryError;
use crate::types::Node;

/// Read-only view of cluster inventory and declared profiles
#[async_trait]
pub trait Directory: Send + Sync {
    /// Nodes whose `Ready` condition is true, with a fresh empty status
    async fn list_eligible_nodes(&self) -> Result<Vec<Node>, DirectoryError>;

    /// Profiles declared as `AppArmorProfile` custom resources
    async fn list_declared_profiles(&self) -> Result<Vec<Profile>, DirectoryError>;

    /// Register the `AppArmorProfile` custom resource definition
    async fn install_profile_crd(&self) -> Result<(), DirectoryError>;
}
