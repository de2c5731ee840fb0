//! Cluster directory backed by `kubectl`
//!
//! Reads nodes and `AppArmorProfile` custom resources through
//! `kubectl get ... -o json`, so whatever authentication the operator's
//! kubeconfig uses (exec plugins, OIDC, cloud auth) works unchanged.

use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use aam_protocol::Profile;

use crate::config::KubeConfig;
use crate::error::DirectoryError;
use crate::traits::Directory;
use crate::types::{Node, NodeRole, ROLE_LABEL};

/// API group of the profile custom resource
pub const CRD_GROUP: &str = "crd.security.sysdig.com";

/// Served version of the profile custom resource
pub const CRD_VERSION: &str = "v1alpha1";

/// Fully qualified CRD name
pub const CRD_NAME: &str = "apparmorprofiles.crd.security.sysdig.com";

/// Seconds to wait for the CRD to become established
const CRD_ESTABLISH_TIMEOUT_SECS: u64 = 30;

/// Response from `kubectl get <kind> -o json`
#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    // A plain `default` would require `T: Default`
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct NodeObject {
    metadata: ObjectMeta,
    #[serde(default)]
    status: NodeStatus,
}

#[derive(Debug, Default, Deserialize)]
struct NodeStatus {
    #[serde(default)]
    conditions: Vec<NodeCondition>,
    #[serde(default)]
    addresses: Vec<NodeAddress>,
}

#[derive(Debug, Deserialize)]
struct NodeCondition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct NodeAddress {
    #[serde(rename = "type")]
    kind: String,
    address: String,
}

#[derive(Debug, Deserialize)]
struct ProfileObject {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: ProfileSpec,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileSpec {
    #[serde(default)]
    rules: String,
    #[serde(default)]
    enforced: bool,
}

/// Directory that shells out to `kubectl`
#[derive(Debug, Clone)]
pub struct KubectlDirectory {
    config: KubeConfig,
}

impl KubectlDirectory {
    /// Create a directory using the given kubectl settings
    pub fn new(config: KubeConfig) -> Self {
        Self { config }
    }

    /// Arguments selecting kubeconfig and context, placed before the verb
    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.config.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.display().to_string());
        }
        if let Some(context) = &self.config.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args
    }

    /// Run kubectl and return its stdout, failing on a non-zero exit
    async fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>, DirectoryError> {
        let mut command = Command::new(&self.config.kubectl);
        command
            .args(self.global_args())
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        tracing::debug!("Running {} {}", self.config.kubectl, args.join(" "));

        let mut child = command
            .spawn()
            .map_err(|source| DirectoryError::KubectlUnavailable {
                binary: self.config.kubectl.clone(),
                source,
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await?;
            // Dropping the pipe sends EOF
            drop(pipe);
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(DirectoryError::CommandFailed {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl Directory for KubectlDirectory {
    async fn list_eligible_nodes(&self) -> Result<Vec<Node>, DirectoryError> {
        let stdout = self.run(&["get", "nodes", "-o", "json"], None).await?;
        let nodes = parse_node_list(&stdout)?;
        tracing::debug!("Found {} ready nodes", nodes.len());
        Ok(nodes)
    }

    async fn list_declared_profiles(&self) -> Result<Vec<Profile>, DirectoryError> {
        let stdout = self.run(&["get", CRD_NAME, "-o", "json"], None).await?;
        let profiles = parse_profile_list(&stdout)?;
        tracing::debug!("Found {} declared profiles", profiles.len());
        Ok(profiles)
    }

    async fn install_profile_crd(&self) -> Result<(), DirectoryError> {
        tracing::info!("Creating a CRD: {}", CRD_NAME);

        let manifest = serde_json::to_vec(&crd_manifest())?;
        self.run(&["apply", "-f", "-"], Some(manifest.as_slice())).await?;

        tracing::info!("Waiting for the CRD to be established: {}", CRD_NAME);
        let timeout = format!("--timeout={}s", CRD_ESTABLISH_TIMEOUT_SECS);
        let crd = format!("crd/{}", CRD_NAME);
        self.run(
            &[
                "wait",
                "--for",
                "condition=established",
                timeout.as_str(),
                crd.as_str(),
            ],
            None,
        )
        .await?;

        tracing::info!("Confirmed that the CRD was created");
        Ok(())
    }
}

/// Decode `kubectl get nodes -o json`, keeping only nodes that are ready
pub fn parse_node_list(json: &[u8]) -> Result<Vec<Node>, DirectoryError> {
    let list: ObjectList<NodeObject> = serde_json::from_slice(json)?;

    let nodes = list
        .items
        .into_iter()
        .filter(|n| {
            n.status
                .conditions
                .iter()
                .any(|c| c.kind == "Ready" && c.status == "True")
        })
        .map(|n| {
            let mut node = Node::new(n.metadata.name, NodeRole::from_labels(&n.metadata.labels));
            node.role_label = n.metadata.labels.get(ROLE_LABEL).cloned();

            for addr in n.status.addresses {
                match addr.kind.as_str() {
                    "ExternalIP" => node.external_ip = addr.address,
                    "InternalIP" => node.internal_ip = addr.address,
                    _ => {}
                }
            }
            node
        })
        .collect();

    Ok(nodes)
}

/// Decode `kubectl get apparmorprofiles... -o json`
pub fn parse_profile_list(json: &[u8]) -> Result<Vec<Profile>, DirectoryError> {
    let list: ObjectList<ProfileObject> = serde_json::from_slice(json)?;

    Ok(list
        .items
        .into_iter()
        .map(|p| Profile::new(p.metadata.name, p.spec.rules, p.spec.enforced))
        .collect())
}

/// CustomResourceDefinition for `AppArmorProfile`
pub fn crd_manifest() -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "CustomResourceDefinition",
        "metadata": { "name": CRD_NAME },
        "spec": {
            "group": CRD_GROUP,
            "scope": "Cluster",
            "names": {
                "plural": "apparmorprofiles",
                "singular": "apparmorprofile",
                "kind": "AppArmorProfile",
                "listKind": "AppArmorProfileList",
                "shortNames": ["aap"]
            },
            "versions": [{
                "name": CRD_VERSION,
                "served": true,
                "storage": true,
                "schema": {
                    "openAPIV3Schema": {
                        "type": "object",
                        "properties": {
                            "spec": {
                                "type": "object",
                                "properties": {
                                    "rules": { "type": "string" },
                                    "enforced": { "type": "boolean" }
                                }
                            }
                        }
                    }
                }
            }]
        }
    })
}
