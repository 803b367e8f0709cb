//! ContactLink configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main ContactLink configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactLinkConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Contact storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Identity resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl ContactLinkConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render configuration as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::Config("server.host must not be empty".to_string()));
        }
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

/// Contact storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Keep contacts in memory only
    pub ephemeral: bool,

    /// Directory holding the contact snapshot (None = ~/.contactlink)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ephemeral: false,
            data_dir: None,
        }
    }
}

impl StorageConfig {
    /// Effective data directory
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// Default data directory (~/.contactlink/)
pub fn default_data_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".contactlink")
}

/// Identity resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How many times a resolution is re-run after losing an insert race
    pub conflict_retries: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            conflict_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ContactLinkConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(!config.storage.ephemeral);
        assert_eq!(config.resolver.conflict_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ContactLinkConfig::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[server]"));
        assert!(rendered.contains("conflict_retries = 3"));

        let parsed: ContactLinkConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nhost = \"0.0.0.0\"\nport = 8080\n\n[storage]\nephemeral = true\n",
        )
        .unwrap();

        let config = ContactLinkConfig::load(&path).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.storage.ephemeral);
        // Missing section falls back to defaults
        assert_eq!(config.resolver.conflict_retries, 3);
    }

    #[test]
    fn test_load_rejects_zero_port() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nhost = \"127.0.0.1\"\nport = 0\n").unwrap();

        let err = ContactLinkConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml [").unwrap();

        assert!(matches!(
            ContactLinkConfig::load(&path),
            Err(Error::TomlDe(_))
        ));
    }

    #[test]
    fn test_resolved_data_dir_override() {
        let storage = StorageConfig {
            ephemeral: false,
            data_dir: Some(PathBuf::from("/tmp/contacts")),
        };
        assert_eq!(storage.resolved_data_dir(), PathBuf::from("/tmp/contacts"));
    }
}
