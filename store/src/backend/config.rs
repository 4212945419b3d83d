//! Runtime configuration read from the environment.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DATABASE_URL_VAR: &str = "CLUB_DIRECTORY_DATABASE_URL";
const MAX_CONNECTIONS_VAR: &str = "CLUB_DIRECTORY_MAX_CONNECTIONS";
const BIND_ADDR_VAR: &str = "CLUB_DIRECTORY_BIND_ADDR";
const ALLOWED_ORIGIN_VAR: &str = "CLUB_DIRECTORY_ALLOWED_ORIGIN";
const SEED_VAR: &str = "CLUB_DIRECTORY_SEED";

const DATABASE_FILE_NAME: &str = "club_directory.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the store keeps its data and how the pool is sized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl StoreConfig {
    /// Config for a database file at `path` with default pool settings
    pub fn for_path(path: &Path) -> Self {
        Self {
            database_url: format!("sqlite://{}", path.display()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(DATABASE_URL_VAR) {
            Ok(url) => Self {
                database_url: url,
                ..Self::for_path(&default_database_path())
            },
            Err(_) => Self::for_path(&default_database_path()),
        };

        if let Ok(raw) = std::env::var(MAX_CONNECTIONS_VAR) {
            config.max_connections = raw
                .parse::<u32>()
                .with_context(|| format!("{MAX_CONNECTIONS_VAR} must be a positive integer, got {raw:?}"))?
                .max(1);
        }

        Ok(config)
    }

    /// Whether `database_url` names a private in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Local file backing `database_url`, if it names one
    pub fn database_file(&self) -> Option<PathBuf> {
        let path = self.database_url.strip_prefix("sqlite://")?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

/// `<data dir>/club-directory/club_directory.db`, or the working directory when
/// the platform has no data dir.
pub fn default_database_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("club-directory").join(DATABASE_FILE_NAME),
        None => PathBuf::from(DATABASE_FILE_NAME),
    }
}

/// HTTP server settings for the binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub allowed_origin: String,
    pub seed_on_startup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            allowed_origin: "http://localhost:8080".to_string(),
            seed_on_startup: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(BIND_ADDR_VAR) {
            config.bind_addr = raw
                .parse()
                .with_context(|| format!("{BIND_ADDR_VAR} is not a socket address: {raw:?}"))?;
        }
        if let Ok(origin) = std::env::var(ALLOWED_ORIGIN_VAR) {
            config.allowed_origin = origin;
        }
        if let Ok(raw) = std::env::var(SEED_VAR) {
            config.seed_on_startup = parse_flag(&raw)
                .with_context(|| format!("{SEED_VAR} must be true or false, got {raw:?}"))?;
        }

        Ok(config)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_path_builds_sqlite_url() {
        let config = StoreConfig::for_path(Path::new("/tmp/clubs/test.db"));
        assert_eq!(config.database_url, "sqlite:///tmp/clubs/test.db");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.database_file(), Some(PathBuf::from("/tmp/clubs/test.db")));
    }

    #[test]
    fn test_database_file_ignores_memory_urls() {
        let config = StoreConfig {
            database_url: "sqlite://:memory:".to_string(),
            ..StoreConfig::for_path(Path::new("x.db"))
        };
        assert_eq!(config.database_file(), None);
    }

    #[test]
    fn test_detects_memory_urls() {
        let base = StoreConfig::for_path(Path::new("x.db"));
        assert!(!base.is_in_memory());

        for url in ["sqlite::memory:", "sqlite://:memory:", "sqlite://shared?mode=memory&cache=shared"] {
            let config = StoreConfig {
                database_url: url.to_string(),
                ..base.clone()
            };
            assert!(config.is_in_memory(), "{url}");
        }
    }

    #[test]
    fn test_default_path_ends_with_file_name() {
        let path = default_database_path();
        assert!(path.ends_with(DATABASE_FILE_NAME));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
