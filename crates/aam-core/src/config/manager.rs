//! Top-level manager configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::SshConfig;

/// Configuration for one manager invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Connect to nodes on their internal address instead of the external one
    pub use_internal_ip: bool,

    /// How to reach worker nodes
    pub ssh: SshConfig,

    /// How to reach the cluster API
    pub kube: KubeConfig,
}

/// Settings passed to `kubectl`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeConfig {
    /// kubectl binary name or path
    pub kubectl: String,

    /// Path to a kubeconfig file (kubectl's own default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// kubeconfig context to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            kubeconfig: None,
            context: None,
        }
    }
}
