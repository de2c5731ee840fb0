//! Sync command implementation

use anyhow::Result;

use aam_core::{Directory, RemoteShell};
use aam_engine::Reconciler;

use crate::output::print_success;

/// Push every declared profile to every worker node
pub async fn sync_command<D, S>(engine: &Reconciler<D, S>) -> Result<()>
where
    D: Directory,
    S: RemoteShell,
{
    engine.sync().await?;

    print_success("Profiles are in sync");
    Ok(())
}
