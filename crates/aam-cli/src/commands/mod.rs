//! CLI command implementations

mod config;
mod disable;
mod init;
mod report;
mod sync;

pub use config::{config_init, config_path, config_show, resolve_config_path};
pub use disable::disable_command;
pub use init::init_command;
pub use report::{enabled_command, enforced_command};
pub use sync::sync_command;
