//! Core domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use aam_protocol::ProfileStatus;

/// Legacy role label set by kubeadm-era clusters (`node` or `master`)
pub const ROLE_LABEL: &str = "kubernetes.io/role";

/// Presence labels marking control-plane nodes
const CONTROL_PLANE_LABELS: [&str; 2] = [
    "node-role.kubernetes.io/control-plane",
    "node-role.kubernetes.io/master",
];

/// Role of a node in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// Runs workloads, target of reconciliation
    Worker,
    /// Runs the cluster control plane, never touched
    ControlPlane,
}

impl NodeRole {
    /// Derive the role from node labels
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        let legacy = labels.get(ROLE_LABEL).map(String::as_str);
        if matches!(legacy, Some("master") | Some("control-plane")) {
            return NodeRole::ControlPlane;
        }

        if CONTROL_PLANE_LABELS.iter().any(|l| labels.contains_key(*l)) {
            return NodeRole::ControlPlane;
        }

        NodeRole::Worker
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Worker => write!(f, "worker"),
            NodeRole::ControlPlane => write!(f, "control-plane"),
        }
    }
}

/// A cluster node and what was observed on it during this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Kubernetes node name
    pub name: String,
    /// External IP address (may be empty)
    pub external_ip: String,
    /// Internal IP address (may be empty)
    pub internal_ip: String,
    /// Role derived from labels
    pub role: NodeRole,
    /// Raw value of the `kubernetes.io/role` label, for display
    pub role_label: Option<String>,
    /// Whether AppArmor was found active on the node
    pub apparmor_enabled: bool,
    /// Last observed profile modes
    pub status: ProfileStatus,
}

impl Node {
    /// Create a node with no addresses and an empty status snapshot
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            external_ip: String::new(),
            internal_ip: String::new(),
            role,
            role_label: None,
            apparmor_enabled: false,
            status: ProfileStatus::new(),
        }
    }

    /// Set both addresses
    pub fn with_addresses(
        mut self,
        external_ip: impl Into<String>,
        internal_ip: impl Into<String>,
    ) -> Self {
        self.external_ip = external_ip.into();
        self.internal_ip = internal_ip.into();
        self
    }

    /// Check if this node is part of the control plane
    pub fn is_control_plane(&self) -> bool {
        self.role == NodeRole::ControlPlane
    }

    /// Address used to reach the node over SSH.
    ///
    /// Falls back to the other address when the preferred one is missing,
    /// which is common for clusters without external IPs.
    pub fn ssh_address(&self, use_internal_ip: bool) -> &str {
        let (preferred, fallback) = if use_internal_ip {
            (&self.internal_ip, &self.external_ip)
        } else {
            (&self.external_ip, &self.internal_ip)
        };

        if preferred.is_empty() {
            fallback
        } else {
            preferred
        }
    }

    /// Role as shown to the operator: the label value when present
    pub fn role_name(&self) -> String {
        match &self.role_label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => self.role.to_string(),
        }
    }
}
