//! Client configuration.
//!
//! Values come from an optional TOML file; command-line flags win.
//!
//! ```toml
//! addr = "localhost:3000"
//! from = "alice"
//! to = "bob"
//! body = "hello"
//! interval_secs = 3
//! listen_only = false
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hushwire_proto::constants::WEBSOCKETS_PATH;

use crate::cli::Cli;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub addr: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub interval_secs: u64,
    pub listen_only: bool,
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:3000".to_string(),
            from: "foo".to_string(),
            to: "bar".to_string(),
            body: "test data".to_string(),
            interval_secs: 3,
            listen_only: false,
            verbose: false,
        }
    }
}

impl ClientConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Self::from_toml_str(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(addr) = &cli.addr {
            self.addr = addr.clone();
        }
        if let Some(from) = &cli.from {
            self.from = from.clone();
        }
        if let Some(to) = &cli.to {
            self.to = to.clone();
        }
        if let Some(body) = &cli.body {
            self.body = body.clone();
        }
        if let Some(interval) = cli.interval {
            self.interval_secs = interval;
        }
        self.listen_only |= cli.listen_only;
        self.verbose |= cli.verbose;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.is_empty() {
            return Err(ConfigError::ValidationError("addr must not be empty".into()));
        }
        if self.from.is_empty() {
            return Err(ConfigError::ValidationError("from must not be empty".into()));
        }
        if self.to.is_empty() {
            return Err(ConfigError::ValidationError("to must not be empty".into()));
        }
        if !self.listen_only && self.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "interval must be at least one second".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stream_url(&self) -> String {
        format!("ws://{}{}", self.addr, WEBSOCKETS_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.addr, "localhost:3000");
        assert_eq!(config.from, "foo");
        assert_eq!(config.to, "bar");
        assert_eq!(config.body, "test data");
        assert_eq!(config.interval(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_urls() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), "http://localhost:3000");
        assert_eq!(config.stream_url(), "ws://localhost:3000/websockets");
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from = \"alice\"\nto = \"bob\"\ninterval_secs = 10").unwrap();

        let cli = Cli::try_parse_from(["hushwire-client", "--to", "carol", "--listen-only"]).unwrap();
        let config = ClientConfig::load_from(Some(file.path()))
            .unwrap()
            .with_overrides(&cli);

        assert_eq!(config.from, "alice");
        assert_eq!(config.to, "carol");
        assert_eq!(config.interval_secs, 10);
        assert!(config.listen_only);
        assert_eq!(config.addr, "localhost:3000");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            ClientConfig::load_from(Some(&missing)),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = ClientConfig {
            interval_secs: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        config.listen_only = true;
        assert!(config.validate().is_ok());

        config.to.clear();
        assert!(config.validate().is_err());
    }
}
