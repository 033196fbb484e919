//! Configuration types and loading
//!
//! Values come from, lowest precedence first: built-in defaults, environment
//! variables (optionally seeded from a `.env` file by the binary), and explicit
//! overrides such as command-line flags. Host, port and the cache directory
//! have no defaults and must be supplied by one of the sources.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const ENV_HOST: &str = "INVENTORY_HOST";
pub const ENV_PORT: &str = "INVENTORY_PORT";
pub const ENV_CACHE_DIR: &str = "INVENTORY_CACHE_DIR";
pub const ENV_MAX_BODY_SIZE: &str = "INVENTORY_MAX_BODY_SIZE";
pub const ENV_RECLAIM_ORPHANS: &str = "INVENTORY_RECLAIM_ORPHANS";
pub const ENV_LOG_JSON: &str = "INVENTORY_LOG_JSON";

const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface to bind; also used when building absolute photo URLs
    pub host: String,
    pub port: u16,
    /// Upper bound for request bodies, uploads included
    pub max_body_size_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding uploaded photos
    pub cache_dir: PathBuf,
    /// Delete a photo file once no item points at it any more
    pub reclaim_orphaned_photos: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    pub json: bool,
}

/// Explicit values that take precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cache_dir: Option<PathBuf>,
    pub max_body_size_bytes: Option<usize>,
    pub reclaim_orphaned_photos: Option<bool>,
    pub log_json: Option<bool>,
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Cannot prepare cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppConfig {
    /// Build a configuration from explicit overrides, falling back to the
    /// process environment
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Build a configuration from explicit overrides and a variable lookup
    pub fn resolve<F>(overrides: ConfigOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match overrides.host {
            Some(host) => host,
            None => lookup(ENV_HOST).ok_or(ConfigError::Missing("host"))?,
        };

        let port = match overrides.port {
            Some(port) => port,
            None => {
                let raw = lookup(ENV_PORT).ok_or(ConfigError::Missing("port"))?;
                parse_value(ENV_PORT, &raw)?
            }
        };

        let cache_dir = match overrides.cache_dir {
            Some(dir) => dir,
            None => lookup(ENV_CACHE_DIR)
                .map(PathBuf::from)
                .ok_or(ConfigError::Missing("cache"))?,
        };

        let max_body_size_bytes = match overrides.max_body_size_bytes {
            Some(size) => size,
            None => match lookup(ENV_MAX_BODY_SIZE) {
                Some(raw) => parse_value(ENV_MAX_BODY_SIZE, &raw)?,
                None => DEFAULT_MAX_BODY_SIZE,
            },
        };

        let reclaim_orphaned_photos = overrides
            .reclaim_orphaned_photos
            .or_else(|| lookup(ENV_RECLAIM_ORPHANS).map(|v| parse_bool(&v)))
            .unwrap_or(true);

        let json = overrides
            .log_json
            .or_else(|| lookup(ENV_LOG_JSON).map(|v| parse_bool(&v)))
            .unwrap_or(false);

        let config = Self {
            server: ServerConfig {
                host,
                port,
                max_body_size_bytes,
            },
            storage: StorageConfig {
                cache_dir,
                reclaim_orphaned_photos,
            },
            logging: LoggingConfig { json },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "host".into(),
                message: "must not be empty".into(),
            });
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "port".into(),
                message: "must be between 1 and 65535".into(),
            });
        }
        if self.storage.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "cache".into(),
                message: "must not be empty".into(),
            });
        }
        if self.server.max_body_size_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_body_size".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Create the cache directory if it does not exist yet
    pub fn ensure_cache_dir(&self) -> Result<&Path, ConfigError> {
        let path = self.storage.cache_dir.as_path();
        std::fs::create_dir_all(path).map_err(|source| ConfigError::CacheDir {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(path)
    }

    /// Public origin used when a response needs an absolute URL
    pub fn public_origin(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_resolve_from_env() {
        let config = AppConfig::resolve(
            ConfigOverrides::default(),
            env(&[
                (ENV_HOST, "127.0.0.1"),
                (ENV_PORT, "3000"),
                (ENV_CACHE_DIR, "/tmp/inventory-cache"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.cache_dir, PathBuf::from("/tmp/inventory-cache"));
        assert_eq!(config.server.max_body_size_bytes, DEFAULT_MAX_BODY_SIZE);
        assert!(config.storage.reclaim_orphaned_photos);
        assert!(!config.logging.json);
        assert_eq!(config.public_origin(), "http://127.0.0.1:3000");
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigOverrides {
            host: Some("localhost".into()),
            port: Some(8081),
            reclaim_orphaned_photos: Some(false),
            ..Default::default()
        };
        let config = AppConfig::resolve(
            overrides,
            env(&[
                (ENV_HOST, "0.0.0.0"),
                (ENV_PORT, "80"),
                (ENV_CACHE_DIR, "cache"),
                (ENV_RECLAIM_ORPHANS, "true"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8081);
        assert!(!config.storage.reclaim_orphaned_photos);
    }

    #[test]
    fn test_missing_required() {
        let err = AppConfig::resolve(
            ConfigOverrides::default(),
            env(&[(ENV_HOST, "localhost"), (ENV_PORT, "3000")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("cache")));

        let err = AppConfig::resolve(ConfigOverrides::default(), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("host")));
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::resolve(
            ConfigOverrides::default(),
            env(&[(ENV_HOST, "localhost"), (ENV_PORT, "http"), (ENV_CACHE_DIR, "c")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = AppConfig::resolve(
            ConfigOverrides {
                port: Some(0),
                ..Default::default()
            },
            env(&[(ENV_HOST, "localhost"), (ENV_CACHE_DIR, "c")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool(""));
    }
}
