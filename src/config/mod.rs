//! Configuration management for geodist
//!
//! This module handles loading and validating configuration from environment variables,
//! TOML files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::server::ServerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: HttpConfig,

    /// Catalog generation configuration
    pub catalog: CatalogConfig,

    /// Mirror configuration
    pub mirrors: MirrorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address, `host:port`
    pub bind_address: String,

    /// Enable permissive CORS
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Root of the downloadable files tree
    pub files_root: PathBuf,

    /// Where descriptor files are written (optional)
    pub gen_dir: Option<PathBuf>,

    /// Regeneration interval in seconds
    pub refresh_interval_secs: u64,

    /// Remote listing timeout in seconds
    pub listing_timeout_secs: u64,

    /// Remote listing scheme (http, https)
    pub listing_scheme: String,
}

/// Mirror configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Download settings JSON (optional)
    pub settings_path: Option<PathBuf>,

    /// HEAD check timeout in seconds
    pub check_timeout_secs: u64,

    /// Scheme used for located mirror URLs (http, https)
    pub scheme: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_address =
            std::env::var("GEODIST_BIND").unwrap_or(defaults.server.bind_address);

        let files_root = std::env::var("GEODIST_FILES_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog.files_root);

        let gen_dir = std::env::var("GEODIST_GEN_DIR").ok().map(PathBuf::from);
        let settings_path = std::env::var("GEODIST_SETTINGS").ok().map(PathBuf::from);

        let log_level =
            std::env::var("GEODIST_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let log_format =
            std::env::var("GEODIST_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            server: HttpConfig {
                bind_address,
                enable_cors: env_or("GEODIST_ENABLE_CORS", true),
                enable_request_logging: env_or("GEODIST_REQUEST_LOGGING", true),
            },
            catalog: CatalogConfig {
                files_root,
                gen_dir,
                refresh_interval_secs: env_or(
                    "GEODIST_REFRESH_INTERVAL",
                    defaults.catalog.refresh_interval_secs,
                ),
                listing_timeout_secs: env_or(
                    "GEODIST_LISTING_TIMEOUT",
                    defaults.catalog.listing_timeout_secs,
                ),
                listing_scheme: std::env::var("GEODIST_LISTING_SCHEME")
                    .unwrap_or(defaults.catalog.listing_scheme),
            },
            mirrors: MirrorConfig {
                settings_path,
                check_timeout_secs: env_or(
                    "GEODIST_MIRROR_CHECK_TIMEOUT",
                    defaults.mirrors.check_timeout_secs,
                ),
                scheme: std::env::var("GEODIST_MIRROR_SCHEME").unwrap_or(defaults.mirrors.scheme),
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;

        if self.catalog.files_root.as_os_str().is_empty() {
            anyhow::bail!("files_root must not be empty");
        }

        if self.catalog.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be greater than 0");
        }

        if self.mirrors.check_timeout_secs == 0 {
            anyhow::bail!("check_timeout_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Parsed bind address
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))
    }

    /// Catalog regeneration interval
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.catalog.refresh_interval_secs)
    }

    /// Build the server configuration
    pub fn server_config(&self) -> Result<ServerConfig> {
        let mut builder = ServerConfig::builder()
            .bind_address(self.bind_address()?)
            .files_root(&self.catalog.files_root)
            .refresh_interval_secs(self.catalog.refresh_interval_secs)
            .listing_timeout_secs(self.catalog.listing_timeout_secs)
            .listing_scheme(&self.catalog.listing_scheme)
            .check_timeout_secs(self.mirrors.check_timeout_secs)
            .mirror_scheme(&self.mirrors.scheme)
            .enable_cors(self.server.enable_cors)
            .enable_request_logging(self.server.enable_request_logging);

        if let Some(dir) = &self.catalog.gen_dir {
            builder = builder.gen_dir(dir);
        }
        if let Some(path) = &self.mirrors.settings_path {
            builder = builder.settings_path(path);
        }

        builder
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid server configuration: {e}"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: HttpConfig {
                bind_address: String::from("0.0.0.0:8080"),
                enable_cors: true,
                enable_request_logging: true,
            },
            catalog: CatalogConfig {
                files_root: PathBuf::from("/var/www/files"),
                gen_dir: None,
                refresh_interval_secs: 15 * 60,
                listing_timeout_secs: 30,
                listing_scheme: String::from("https"),
            },
            mirrors: MirrorConfig {
                settings_path: None,
                check_timeout_secs: 10,
                scheme: String::from("https"),
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
