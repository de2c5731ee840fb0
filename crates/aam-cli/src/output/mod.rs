//! Output formatting utilities for the CLI
//!
//! Renders fleet reports as tables and prints colored status lines.

use tabled::{settings::Style, Table, Tabled};

use aam_core::Node;

/// Shown instead of an empty table
const NO_NODES: &str = "No ready nodes found";

/// Format the AppArmor-enabled report.
///
/// One row per node in directory order. Control-plane nodes are listed with
/// `false` since they are never probed.
pub fn format_enabled_nodes(nodes: &[Node]) -> String {
    if nodes.is_empty() {
        return NO_NODES.to_string();
    }

    #[derive(Tabled)]
    struct EnabledRow {
        #[tabled(rename = "NODE NAME")]
        name: String,
        #[tabled(rename = "INTERNAL IP")]
        internal_ip: String,
        #[tabled(rename = "EXTERNAL IP")]
        external_ip: String,
        #[tabled(rename = "ROLE")]
        role: String,
        #[tabled(rename = "APPARMOR ENABLED")]
        enabled: bool,
    }

    let rows: Vec<EnabledRow> = nodes
        .iter()
        .map(|n| EnabledRow {
            name: n.name.clone(),
            internal_ip: or_dash(&n.internal_ip),
            external_ip: or_dash(&n.external_ip),
            role: n.role_name(),
            enabled: n.apparmor_enabled,
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the enforced-profiles report
pub fn format_enforcement(nodes: &[Node]) -> String {
    if nodes.is_empty() {
        return NO_NODES.to_string();
    }

    #[derive(Tabled)]
    struct EnforcementRow {
        #[tabled(rename = "NODE NAME")]
        name: String,
        #[tabled(rename = "ROLE")]
        role: String,
        #[tabled(rename = "ENFORCED PROFILES")]
        profiles: String,
    }

    let rows: Vec<EnforcementRow> = nodes
        .iter()
        .map(|n| EnforcementRow {
            name: n.name.clone(),
            role: n.role_name(),
            profiles: enforced_list(n),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Enforced profile names of a node, comma joined in name order
pub fn enforced_list(node: &Node) -> String {
    node.status.enforced_names().join(",")
}

fn or_dash(s: &str) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message to stderr in red
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message to stderr in yellow
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
