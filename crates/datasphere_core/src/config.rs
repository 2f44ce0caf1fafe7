//! Process configuration loaded from TOML.
//!
//! # Invariants
//! - `database.storage_path` is non-empty.
//! - File-writing log modes come with `logging.dir`.

use crate::logging::LogMode;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no config path is passed explicitly.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Deployment environment; selects log destination and verbosity.
    pub env: LogMode,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub storage_path: PathBuf,
    /// Directory of `NNNN_name.up.sql` / `.down.sql` pairs. Embedded
    /// migrations are used when unset.
    #[serde(default)]
    pub migrations_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Absolute directory for rotating log files (`dev`/`prod`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    NotFound(PathBuf),
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "config file not found: {}", path.display()),
            Self::Io { path, source } => {
                write!(f, "failed to read config file {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config file {}: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::NotFound(_) | Self::Invalid(_) => None,
        }
    }
}

impl Config {
    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database.storage_path cannot be empty".to_string(),
            ));
        }
        if self.env.writes_files() && self.logging.dir.is_none() {
            return Err(ConfigError::Invalid(format!(
                "env `{}` writes log files and requires logging.dir",
                self.env
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};
    use crate::logging::LogMode;
    use std::path::PathBuf;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_minimal_config() {
        let (_dir, path) = write_config(
            r#"
env = "local"

[database]
storage_path = "storage/datasphere.db"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.env, LogMode::Local);
        assert_eq!(
            config.database.storage_path,
            PathBuf::from("storage/datasphere.db")
        );
        assert!(config.database.migrations_path.is_none());
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn unknown_env_is_parse_error() {
        let (_dir, path) = write_config(
            r#"
env = "staging"

[database]
storage_path = "a.db"
"#,
        );
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn prod_without_log_dir_is_invalid() {
        let (_dir, path) = write_config(
            r#"
env = "prod"

[database]
storage_path = "a.db"
migrations_path = "./migrations"
"#,
        );
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn empty_storage_path_is_invalid() {
        let (_dir, path) = write_config(
            r#"
env = "disable"

[database]
storage_path = ""
"#,
        );
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }
}
