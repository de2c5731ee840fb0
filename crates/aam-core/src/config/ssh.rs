//! SSH identity configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Default SSH user on worker nodes
pub const DEFAULT_USERNAME: &str = "admin";

/// Default SSH port on worker nodes
pub const DEFAULT_PORT: u16 = 22;

/// Identity used to log into worker nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Username for SSH authentication
    pub username: String,

    /// Path to the private key for authentication
    pub private_key_path: PathBuf,

    /// Passphrase protecting the private key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,

    /// SSH port on the worker nodes
    pub port: u16,

    /// Time allowed for TCP connect plus handshake
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            private_key_path: dirs::home_dir()
                .unwrap_or_default()
                .join(".ssh")
                .join("id_rsa"),
            passphrase: None,
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl SshConfig {
    /// Key path with `~` expanded
    pub fn resolved_key_path(&self) -> PathBuf {
        super::expand_tilde(&self.private_key_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SshConfig::default();
        assert_eq!(config.username, "admin");
        assert_eq!(config.port, 22);
        assert!(config.passphrase.is_none());
        assert!(config.private_key_path.ends_with(".ssh/id_rsa"));
    }

    #[test]
    fn test_passphrase_not_written_when_absent() {
        let rendered = toml::to_string(&SshConfig::default()).unwrap();
        assert!(!rendered.contains("passphrase"));
        assert!(rendered.contains("connect_timeout = 30"));
    }
}
