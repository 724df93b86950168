//! Relay configuration.
//!
//! Layered lowest to highest: built-in defaults, TOML file, environment,
//! command-line flags (applied by the binary).

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_CONFIG_PATH: &str = "HUSHWIRE_CONFIG";
pub const ENV_LISTEN_ADDR: &str = "HUSHWIRE_LISTEN_ADDR";
pub const ENV_TOKEN_SECRET: &str = "HUSHWIRE_TOKEN_SECRET";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// HMAC secret for bearer tokens. Generated per process when unset.
    pub token_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            token_secret: None,
        }
    }
}

impl ServerConfig {
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(addr) = var(ENV_LISTEN_ADDR) {
            self.listen_addr = addr
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("Invalid listen_addr: {}", e)))?;
        }
        if let Some(secret) = var(ENV_TOKEN_SECRET) {
            self.token_secret = Some(secret);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.token_secret {
            if secret.is_empty() {
                return Err(ConfigError::Invalid(
                    "token_secret must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field(
                "token_secret",
                &self.token_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR.parse().unwrap());
        assert!(config.token_secret.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml_str("token_secret = \"s3cret\"\n").unwrap();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR.parse().unwrap());
        assert_eq!(config.token_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_addr = \"127.0.0.1:4000\"").unwrap();

        let config = ServerConfig::from_toml(file.path()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:4000".parse().unwrap());
    }

    #[test]
    fn test_bad_toml_rejected() {
        assert!(matches!(
            ServerConfig::from_toml_str("listen_addr = 5"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ServerConfig::from_toml_str("listen_addr = \"127.0.0.1:4000\"").unwrap();
        let vars = HashMap::from([
            (ENV_LISTEN_ADDR, "127.0.0.1:5000"),
            (ENV_TOKEN_SECRET, "from-env"),
        ]);
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.token_secret.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_bad_env_addr_rejected() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_vars(|key| (key == ENV_LISTEN_ADDR).then(|| "not-an-addr".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_secret_invalid() {
        let config = ServerConfig {
            token_secret: Some(String::new()),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ServerConfig {
            token_secret: Some("hunter2".into()),
            ..ServerConfig::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
