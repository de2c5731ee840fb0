//! Fleet reconciliation
//!
//! The `Reconciler` owns the cluster directory and the remote shell and
//! exposes the four fleet operations the CLI needs: install AppArmor, sync
//! profiles, report whether AppArmor is enabled, and report which profiles
//! are enforced. A profile-disable operation is provided as well.
//!
//! # Execution model
//!
//! Nodes are processed in directory order, one SSH session at a time. Every
//! per-node operation opens its own session and closes it before returning,
//! whether the body succeeded or not. The first fatal error ends the fleet
//! operation; rerunning is safe because every step is idempotent.
//!
//! # Stderr handling
//!
//! Batches log stderr and carry on. The enabled probe treats any stderr as
//! "disabled" and the status query treats any stderr as a hard failure.

use aam_core::config::ManagerConfig;
use aam_core::{Directory, ExecutionError, Node, Profile, RemoteSession, RemoteShell};
use aam_protocol::{
    create_sequence, disable_sequence, install_sequence, set_mode_sequence, ProfileStatus,
    ENABLED_CHECK_COMMAND, STATUS_QUERY_COMMAND,
};

use crate::error::{EngineError, FleetError};

/// Expected `aa-enabled` answer when the module is active
const ENABLED_ANSWER: &str = "yes";

/// How the engine reaches nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// SSH port on every node
    pub ssh_port: u16,
    /// Use the node's internal address
    pub use_internal_ip: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ssh_port: aam_core::config::SshConfig::default().port,
            use_internal_ip: false,
        }
    }
}

impl From<&ManagerConfig> for EngineOptions {
    fn from(config: &ManagerConfig) -> Self {
        Self {
            ssh_port: config.ssh.port,
            use_internal_ip: config.use_internal_ip,
        }
    }
}

/// Drives AppArmor state on worker nodes from the declared profiles
pub struct Reconciler<D, S> {
    directory: D,
    shell: S,
    options: EngineOptions,
}

impl<D, S> Reconciler<D, S>
where
    D: Directory,
    S: RemoteShell,
{
    /// Create an engine over a directory and a remote shell
    pub fn new(directory: D, shell: S, options: EngineOptions) -> Self {
        Self {
            directory,
            shell,
            options,
        }
    }

    /// Get the cluster directory
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Get the remote shell
    pub fn shell(&self) -> &S {
        &self.shell
    }

    /// Install and enable AppArmor on every worker node
    pub async fn install_apparmor(&self) -> Result<(), EngineError> {
        let mut nodes = self.directory.list_eligible_nodes().await?;

        for node in nodes.iter_mut() {
            self.install(node).await?;
        }

        Ok(())
    }

    /// Push every declared profile to every worker node
    pub async fn sync(&self) -> Result<(), EngineError> {
        let mut nodes = self.directory.list_eligible_nodes().await?;
        let profiles = self.directory.list_declared_profiles().await?;

        tracing::info!(
            "Syncing {} profiles to {} nodes",
            profiles.len(),
            nodes.len()
        );

        for node in nodes.iter_mut() {
            for profile in &profiles {
                self.sync_profile(node, profile).await?;
            }
        }

        Ok(())
    }

    /// Disable the named profiles on every worker node
    pub async fn disable(&self, profile_names: &[String]) -> Result<(), EngineError> {
        let mut nodes = self.directory.list_eligible_nodes().await?;

        for node in nodes.iter_mut() {
            for name in profile_names {
                self.disable_profile(node, name).await?;
            }
        }

        Ok(())
    }

    /// Check AppArmor on every node
    pub async fn apparmor_enabled(&self) -> Result<Vec<Node>, FleetError> {
        let mut nodes = self.directory.list_eligible_nodes().await.map_err(EngineError::from)?;

        let mut failure = None;
        for node in nodes.iter_mut() {
            if let Err(e) = self.enabled_check(node).await {
                failure = Some(e);
                break;
            }
        }

        match failure {
            Some(source) => Err(FleetError::new(nodes, source)),
            None => Ok(nodes),
        }
    }

    /// Collect profile modes from every node
    pub async fn apparmor_status(&self) -> Result<Vec<Node>, FleetError> {
        let mut nodes = self.directory.list_eligible_nodes().await.map_err(EngineError::from)?;

        let mut failure = None;
        for node in nodes.iter_mut() {
            if let Err(e) = self.status_query(node).await {
                failure = Some(e);
                break;
            }
        }

        match failure {
            Some(source) => Err(FleetError::new(nodes, source)),
            None => Ok(nodes),
        }
    }

    /// Probe whether AppArmor is active on one node.
    ///
    /// Control-plane nodes report `false` without being contacted.
    pub async fn enabled_check(&self, node: &mut Node) -> Result<bool, EngineError> {
        if node.is_control_plane() {
            return Ok(false);
        }

        let mut session = self.connect(node).await?;
        let enabled = probe_enabled(node, &mut session).await;
        session.close().await;

        Ok(enabled)
    }

    /// Install AppArmor on one node unless it is already enabled
    pub async fn install(&self, node: &mut Node) -> Result<(), EngineError> {
        if node.is_control_plane() || node.apparmor_enabled {
            return Ok(());
        }

        let mut session = self.connect(node).await?;
        let result = self.install_in_session(node, &mut session).await;
        session.close().await;

        result
    }

    async fn install_in_session(
        &self,
        node: &mut Node,
        session: &mut S::Session,
    ) -> Result<(), EngineError> {
        if probe_enabled(node, session).await {
            tracing::info!(
                "AppArmor was enabled on node: {} (address: {})",
                node.name,
                session.host()
            );
            return Ok(());
        }

        tracing::info!("Installing AppArmor on node: {}", node.name);
        session
            .execute_batch(&install_sequence(), true)
            .await
            .map_err(|source| EngineError::Execution {
                node: node.name.clone(),
                source,
            })
    }

    /// Write one profile to one node and set its mode.
    ///
    /// Nodes without AppArmor are left alone; sync never installs it.
    pub async fn sync_profile(&self, node: &mut Node, profile: &Profile) -> Result<(), EngineError> {
        if node.is_control_plane() {
            return Ok(());
        }

        let mut session = self.connect(node).await?;
        let result = self.sync_in_session(node, profile, &mut session).await;
        session.close().await;

        result
    }

    async fn sync_in_session(
        &self,
        node: &mut Node,
        profile: &Profile,
        session: &mut S::Session,
    ) -> Result<(), EngineError> {
        if !probe_enabled(node, session).await {
            tracing::info!(
                "AppArmor was not enabled on node: {} (address: {}), no sync happen.",
                node.name,
                session.host()
            );
            return Ok(());
        }

        tracing::info!(
            "Syncing profile {} ({}) to node {}",
            profile.name,
            profile.mode(),
            node.name
        );

        let execution = |source: ExecutionError| EngineError::Execution {
            node: node.name.clone(),
            source,
        };

        session
            .execute_batch(&create_sequence(profile), true)
            .await
            .map_err(execution)?;

        session
            .execute_batch(&set_mode_sequence(profile), true)
            .await
            .map_err(execution)
    }

    /// Refresh the profile status of one node
    pub async fn status_query(&self, node: &mut Node) -> Result<(), EngineError> {
        if node.is_control_plane() {
            return Ok(());
        }

        let mut session = self.connect(node).await?;
        let result = self.status_in_session(node, &mut session).await;
        session.close().await;

        result
    }

    async fn status_in_session(
        &self,
        node: &mut Node,
        session: &mut S::Session,
    ) -> Result<(), EngineError> {
        if !probe_enabled(node, session).await {
            return Ok(());
        }

        let output = session
            .execute_one(STATUS_QUERY_COMMAND, true)
            .await
            .map_err(|source| EngineError::Execution {
                node: node.name.clone(),
                source,
            })?;

        if output.has_stderr() {
            return Err(EngineError::StatusProbe {
                node: node.name.clone(),
                stderr: output.stderr,
            });
        }

        let status = ProfileStatus::parse(&output.stdout).map_err(|source| EngineError::Parse {
            node: node.name.clone(),
            source,
        })?;

        tracing::debug!("Node {} reports {} profiles", node.name, status.len());
        node.status = status;

        Ok(())
    }

    /// Unload one profile from one node
    pub async fn disable_profile(&self, node: &mut Node, name: &str) -> Result<(), EngineError> {
        if node.is_control_plane() {
            return Ok(());
        }

        let mut session = self.connect(node).await?;
        let result = self.disable_in_session(node, name, &mut session).await;
        session.close().await;

        result
    }

    async fn disable_in_session(
        &self,
        node: &mut Node,
        name: &str,
        session: &mut S::Session,
    ) -> Result<(), EngineError> {
        if !probe_enabled(node, session).await {
            tracing::info!(
                "AppArmor was not enabled on node: {}, nothing to disable",
                node.name
            );
            return Ok(());
        }

        tracing::info!("Disabling profile {} on node {}", name, node.name);
        session
            .execute_batch(&disable_sequence(name), true)
            .await
            .map_err(|source| EngineError::Execution {
                node: node.name.clone(),
                source,
            })
    }

    /// Open a session to the node's configured address
    async fn connect(&self, node: &Node) -> Result<S::Session, EngineError> {
        let host = node.ssh_address(self.options.use_internal_ip);

        self.shell
            .connect(host, self.options.ssh_port)
            .await
            .map_err(|source| EngineError::Connection {
                node: node.name.clone(),
                source,
            })
    }
}

/// Ask the node whether AppArmor is active and record the answer.
///
/// A transport failure, any stderr output, or an answer other than `yes`
/// (any case) counts as disabled.
async fn probe_enabled<R: RemoteSession>(node: &mut Node, session: &mut R) -> bool {
    let enabled = match session.execute_one(ENABLED_CHECK_COMMAND, true).await {
        Ok(output) if output.has_stderr() => {
            tracing::debug!(node = %node.name, "AppArmor probe wrote to stderr: {}", output.stderr);
            false
        }
        Ok(output) => output.stdout.eq_ignore_ascii_case(ENABLED_ANSWER),
        Err(e) => {
            tracing::debug!(node = %node.name, "AppArmor probe failed: {}", e);
            false
        }
    };

    node.apparmor_enabled = enabled;
    enabled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let mut config = ManagerConfig::default();
        config.ssh.port = 2222;
        config.use_internal_ip = true;

        assert_eq!(
            EngineOptions::from(&config),
            EngineOptions {
                ssh_port: 2222,
                use_internal_ip: true,
            }
        );
    }

    #[test]
    fn test_default_options() {
        let options = EngineOptions::default();
        assert_eq!(options.ssh_port, 22);
        assert!(!options.use_internal_ip);
    }
}
