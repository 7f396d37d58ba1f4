//! Configuration module for the YAML settings file.
//!
//! The file lives at a fixed location and carries exactly three keys:
//!
//! ```yaml
//! destination: /var/www/html
//! source: /srv/site
//! secret: change-me
//! ```

use std::path::{Path, PathBuf};

use ::config::{File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

/// Location of the configuration file read at startup.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/webhooker/config.yaml";

/// Port the web server listens on.
pub const LISTEN_PORT: u16 = 23454;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config file {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ::config::ConfigError,
    },

    #[error("invalid config file {}: {field} must not be empty", .path.display())]
    Invalid { path: PathBuf, field: &'static str },
}

/// Application configuration, immutable once loaded.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory the web server serves
    pub destination: PathBuf,

    /// Git working copy kept in sync with its upstream
    pub source: PathBuf,

    /// Shared secret used to sign webhook deliveries
    pub secret: String,
}

impl Config {
    /// Load the configuration from the fixed default location.
    pub fn from_default_path() -> Result<Self, ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    /// Load and validate the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_err = |source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        };

        let config: Config = ::config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(true))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(load_err)?;

        config.validate(path)?;
        Ok(config)
    }

    /// The secret as raw key bytes for HMAC computation.
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |field| ConfigError::Invalid {
            path: path.to_path_buf(),
            field,
        };

        if self.source.as_os_str().is_empty() {
            return Err(invalid("source"));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(invalid("destination"));
        }
        if self.secret.trim().is_empty() {
            return Err(invalid("secret"));
        }
        Ok(())
    }
}

// Keeps the secret out of log output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("destination", &self.destination)
            .field("source", &self.source)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid() {
        let file = write_config(
            "destination: /var/www/html\nsource: /srv/site\nsecret: hunter2\n",
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.destination, PathBuf::from("/var/www/html"));
        assert_eq!(config.source, PathBuf::from("/srv/site"));
        assert_eq!(config.secret, "hunter2");
        assert_eq!(config.secret_bytes(), b"hunter2");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_load_missing_field() {
        let file = write_config("destination: /var/www/html\nsource: /srv/site\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_load_unknown_field() {
        let file = write_config(
            "destination: /a\nsource: /b\nsecret: s\nport: 8080\n",
        );
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_malformed_yaml() {
        let file = write_config("destination: [unterminated\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_load_empty_secret() {
        let file = write_config("destination: /a\nsource: /b\nsecret: \"  \"\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "secret", .. }));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config {
            destination: "/a".into(),
            source: "/b".into(),
            secret: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
