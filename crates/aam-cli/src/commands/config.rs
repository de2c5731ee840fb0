//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success};
use aam_core::config::{self, ManagerConfig};

/// Printed in place of the key passphrase
const MASKED: &str = "********";

/// The file to read settings from: the `--config` flag or the default path
pub fn resolve_config_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Print the configuration file path
pub fn config_path(config_path: Option<&PathBuf>) -> Result<()> {
    println!("{}", resolve_config_path(config_path).display());
    Ok(())
}

/// Show the effective configuration, after environment and flag overrides
pub fn config_show(config_path: Option<&PathBuf>, effective: &ManagerConfig) -> Result<()> {
    let path = resolve_config_path(config_path);

    if path.exists() {
        print_info(&format!("Configuration file: {}", path.display()));
    } else {
        print_info(&format!(
            "No configuration file at {}, using defaults",
            path.display()
        ));
    }
    println!();

    let mut shown = effective.clone();
    if shown.ssh.passphrase.is_some() {
        shown.ssh.passphrase = Some(MASKED.to_string());
    }

    let content = toml::to_string_pretty(&shown).context("Failed to render configuration")?;
    println!("{}", content);

    Ok(())
}

/// Write a default configuration file
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve_config_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {}", path.display()));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    write_default_config(&path)?;
    print_success(&format!("Created configuration file: {}", path.display()));

    Ok(())
}

fn write_default_config(path: &Path) -> Result<()> {
    config::save_config(path, &ManagerConfig::default())
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
