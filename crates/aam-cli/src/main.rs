//! kube-apparmor-manager CLI
//!
//! Keeps AppArmor profiles declared as cluster resources in sync with the
//! worker nodes of a Kubernetes cluster:
//! - Install AppArmor on worker nodes
//! - Push declared profiles to every worker
//! - Report AppArmor state and enforced profiles per node

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aam_core::config::{self, ManagerConfig};
use aam_core::{ConfigError, KubectlDirectory};
use aam_engine::{EngineError, EngineOptions, FleetError, Reconciler, SshShell};
use kube_apparmor_manager::commands;
use kube_apparmor_manager::output::print_error;

#[derive(Parser)]
#[command(name = "kube-apparmor-manager")]
#[command(author, version, about = "Manage AppArmor profiles across Kubernetes worker nodes")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Connect to nodes on their internal IP address
    #[arg(short, long, global = true)]
    internal_ip: bool,

    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// SSH user on the worker nodes
    #[arg(long, global = true, env = "SSH_USERNAME")]
    user: Option<String>,

    /// SSH private key file
    #[arg(long, global = true, env = "SSH_PERM_FILE")]
    key: Option<PathBuf>,

    /// Passphrase for the SSH private key
    #[arg(long, global = true, env = "SSH_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// SSH port on the worker nodes
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the AppArmorProfile CRD and AppArmor on every worker node
    Init,

    /// Sync declared AppArmor profiles to every worker node
    Sync,

    /// Show whether AppArmor is enabled on each node
    Enabled,

    /// Show the profiles in enforce mode on each node
    Enforced,

    /// Unload profiles from every worker node
    Disable {
        /// Profile names
        #[arg(required = true)]
        profiles: Vec<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(e) = run(cli).await {
        match error_kind(&e) {
            Some(kind) => print_error(&format!("{}: {:#}", kind, e)),
            None => print_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_effective_config(&cli)?;

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(cli.config.as_ref(), &config),
            ConfigAction::Path => commands::config_path(cli.config.as_ref()),
            ConfigAction::Init { force } => commands::config_init(cli.config.as_ref(), force),
        },

        Commands::Init => commands::init_command(&build_engine(&config)?).await,
        Commands::Sync => commands::sync_command(&build_engine(&config)?).await,
        Commands::Enabled => commands::enabled_command(&build_engine(&config)?).await,
        Commands::Enforced => commands::enforced_command(&build_engine(&config)?).await,
        Commands::Disable { profiles } => {
            commands::disable_command(&build_engine(&config)?, &profiles).await
        }
    }
}

/// Config file (or defaults), then environment and flags on top
fn load_effective_config(cli: &Cli) -> Result<ManagerConfig> {
    let path = commands::resolve_config_path(cli.config.as_ref());

    // Only an explicitly requested file has to exist, and not for `config`
    let file_optional = cli.config.is_none() || matches!(cli.command, Commands::Config { .. });

    let mut config = match config::load_config::<ManagerConfig>(&path) {
        Ok(config) => config,
        Err(ConfigError::NotFound(_)) if file_optional => ManagerConfig::default(),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to load config from {}", path.display())))
        }
    };

    if cli.internal_ip {
        config.use_internal_ip = true;
    }
    if let Some(kubeconfig) = &cli.kubeconfig {
        config.kube.kubeconfig = Some(kubeconfig.clone());
    }
    if let Some(context) = &cli.context {
        config.kube.context = Some(context.clone());
    }
    if let Some(user) = &cli.user {
        config.ssh.username = user.clone();
    }
    if let Some(key) = &cli.key {
        config.ssh.private_key_path = key.clone();
    }
    if let Some(passphrase) = &cli.passphrase {
        config.ssh.passphrase = Some(passphrase.clone());
    }
    if let Some(port) = cli.port {
        config.ssh.port = port;
    }

    Ok(config)
}

fn build_engine(config: &ManagerConfig) -> Result<Reconciler<KubectlDirectory, SshShell>> {
    let shell = SshShell::new(config.ssh.clone()).context("Failed to prepare SSH identity")?;
    let directory = KubectlDirectory::new(config.kube.clone());

    tracing::debug!(
        "Using SSH user '{}' on port {}",
        config.ssh.username,
        config.ssh.port
    );

    Ok(Reconciler::new(
        directory,
        shell,
        EngineOptions::from(config),
    ))
}

/// Error class of a failed node operation.
///
/// `FleetError` already names its class in its message.
fn error_kind(err: &anyhow::Error) -> Option<&'static str> {
    if err.chain().any(|cause| cause.is::<FleetError>()) {
        return None;
    }

    err.chain()
        .find_map(|cause| cause.downcast_ref::<EngineError>().map(EngineError::kind))
}
