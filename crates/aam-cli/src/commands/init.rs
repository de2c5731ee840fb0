//! Init command implementation

use anyhow::{Context, Result};

use aam_core::{Directory, RemoteShell};
use aam_engine::Reconciler;

use crate::output::{print_info, print_success, print_warning};

/// Register the profile resource type, then install AppArmor on every worker
pub async fn init_command<D, S>(engine: &Reconciler<D, S>) -> Result<()>
where
    D: Directory,
    S: RemoteShell,
{
    print_info("Installing the AppArmorProfile resource definition...");
    engine
        .directory()
        .install_profile_crd()
        .await
        .context("Failed to install the AppArmorProfile CRD")?;
    print_success("AppArmorProfile CRD is established");

    print_info("Installing AppArmor on worker nodes...");
    engine.install_apparmor().await?;

    print_success("AppArmor is installed on all worker nodes");
    print_warning("Nodes where AppArmor was just installed are rebooting");
    Ok(())
}
