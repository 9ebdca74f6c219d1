use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MapEnv;

/// Why `config.toml` could not be turned into a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed TOML in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: Defaults,
    /// Fallback values for option environment variables, consulted after
    /// the process environment.
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Treat failed exit callbacks as a failed run.
    pub strict_shutdown: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            strict_shutdown: false,
        }
    }
}

impl Config {
    /// `<platform config dir>/cliframe/config.toml`, or `./cliframe/config.toml`
    /// when the platform has no config dir.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("cliframe")
            .join("config.toml")
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// A missing file is not an error: it yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks:
    /// - Environment names are non-empty and contain no `=` or NUL
    /// - The log filter is non-empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = self
            .env
            .keys()
            .find(|name| name.is_empty() || name.contains('=') || name.contains('\0'))
        {
            return Err(ConfigError::Invalid {
                key: format!("env.{}", name),
                reason: "not a usable environment variable name".to_string(),
            });
        }

        if self.defaults.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "defaults.log_filter".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// The `[env]` table as an environment source.
    pub fn env_source(&self) -> MapEnv {
        MapEnv::from_pairs(self.env.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSource;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.defaults.log_filter, "warn");
    }

    #[test]
    fn parses_env_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[defaults]\nlog_filter = \"debug\"\n\n[env]\nGREET_NAME = \"svc\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.defaults.log_filter, "debug");
        assert!(!config.defaults.strict_shutdown);
        assert_eq!(config.env_source().var("GREET_NAME").as_deref(), Some("svc"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn empty_env_name_fails_validation() {
        let mut config = Config::default();
        config.env.insert(String::new(), "x".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn empty_log_filter_names_the_key() {
        let mut config = Config::default();
        config.defaults.log_filter = "  ".into();
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid config value for defaults.log_filter: must not be empty"
        );
    }

    #[test]
    fn config_path_ends_with_expected() {
        assert!(Config::config_path().ends_with("cliframe/config.toml"));
    }
}
