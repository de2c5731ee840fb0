//! Fleet report commands

use anyhow::Result;

use aam_core::{Directory, Node, RemoteShell};
use aam_engine::{FleetError, Reconciler};

use crate::output::{format_enabled_nodes, format_enforcement, print_warning};

/// Show whether AppArmor is enabled on each node
pub async fn enabled_command<D, S>(engine: &Reconciler<D, S>) -> Result<()>
where
    D: Directory,
    S: RemoteShell,
{
    let nodes = engine
        .apparmor_enabled()
        .await
        .map_err(|e| report_partial(e, format_enabled_nodes))?;

    println!("{}", format_enabled_nodes(&nodes));
    Ok(())
}

/// Show the enforced profiles on each node
pub async fn enforced_command<D, S>(engine: &Reconciler<D, S>) -> Result<()>
where
    D: Directory,
    S: RemoteShell,
{
    let nodes = engine
        .apparmor_status()
        .await
        .map_err(|e| report_partial(e, format_enforcement))?;

    println!("{}", format_enforcement(&nodes));
    Ok(())
}

/// Print what was gathered before a fleet query failed
fn report_partial(err: FleetError, format: fn(&[Node]) -> String) -> anyhow::Error {
    if !err.nodes.is_empty() {
        print_warning("Results are incomplete, the run stopped early:");
        println!("{}", format(&err.nodes));
    }

    err.into()
}
