//! Disable command implementation

use anyhow::Result;

use aam_core::{Directory, RemoteShell};
use aam_engine::Reconciler;

use crate::output::print_success;

/// Unload the named profiles from every worker node
pub async fn disable_command<D, S>(engine: &Reconciler<D, S>, profiles: &[String]) -> Result<()>
where
    D: Directory,
    S: RemoteShell,
{
    engine.disable(profiles).await?;

    print_success(&format!("Disabled {}", profiles.join(", ")));
    Ok(())
}
