//! uusql configuration
//!
//! Read from TOML:
//!
//! ```toml
//! database_url = "sqlite://league.db"
//! schema_path = "league.uusql"
//! max_connections = 4
//! log_level = "debug"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{UuSqlError, UuSqlResult};

/// File looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "uusql.toml";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite connection URL, e.g. `sqlite://app.db` or `sqlite::memory:`
    pub database_url: Option<String>,

    /// Path to the `.uusql` schema file
    pub schema_path: Option<PathBuf>,

    /// Pool size for file databases. In-memory databases always use one
    /// connection.
    pub max_connections: u32,

    /// Create the database file when it does not exist
    pub create_if_missing: bool,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            schema_path: None,
            max_connections: 5,
            create_if_missing: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn from_toml(content: &str) -> UuSqlResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| UuSqlError::Config(e.to_string()))?;
        if config.max_connections == 0 {
            return Err(UuSqlError::Config("max_connections must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> UuSqlResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            UuSqlError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// `./uusql.toml`, else `<config dir>/uusql/config.toml`, if either exists.
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("uusql").join("config.toml"))
            .filter(|path| path.is_file())
    }

    /// Load `path` when given, else the discovered file, else defaults.
    pub fn load(path: Option<&Path>) -> UuSqlResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::discover() {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn is_memory(&self) -> bool {
        self.database_url
            .as_deref()
            .is_some_and(|url| url.contains(":memory:") || url.contains("mode=memory"))
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the database URL
    pub fn database(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    /// Set the schema path
    pub fn schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_path = Some(path.into());
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.config.max_connections = n.max(1);
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }
}
