//! Distribution server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);

/// Configuration for the distribution server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Root of the downloadable files tree
    pub files_root: PathBuf,

    /// Directory receiving `indexes.json` and `indexes.json.gz` (optional)
    pub gen_dir: Option<PathBuf>,

    /// Download settings JSON file (optional; absent means serve everything locally)
    pub settings_path: Option<PathBuf>,

    /// Catalog regeneration interval in seconds
    pub refresh_interval_secs: u64,

    /// Timeout for remote listing requests in seconds
    pub listing_timeout_secs: u64,

    /// URL scheme for remote listing hosts
    pub listing_scheme: String,

    /// Timeout for mirror HEAD checks in seconds
    pub check_timeout_secs: u64,

    /// URL scheme for mirror URLs returned by locate
    pub mirror_scheme: String,

    /// Enable CORS for API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(DEFAULT_BIND),
            files_root: PathBuf::from("/var/www/files"),
            gen_dir: None,
            settings_path: None,
            refresh_interval_secs: 15 * 60,
            listing_timeout_secs: 30,
            listing_scheme: "https".to_string(),
            check_timeout_secs: 10,
            mirror_scheme: "https".to_string(),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.files_root.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "files_root".to_string(),
            });
        }

        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh_interval_secs".to_string(),
                reason: "Must be at least 1 second".to_string(),
            });
        }

        for (field, scheme) in [
            ("listing_scheme", &self.listing_scheme),
            ("mirror_scheme", &self.mirror_scheme),
        ] {
            if scheme != "http" && scheme != "https" {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("Unsupported scheme: {}", scheme),
                });
            }
        }

        Ok(())
    }

    /// Catalog regeneration interval
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Remote listing timeout
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    /// Mirror check timeout
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set bind address from string
    pub fn bind_address_str(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.config.bind_address = addr.parse().map_err(|_| ConfigError::InvalidValue {
            field: "bind_address".to_string(),
            reason: format!("Invalid address: {}", addr),
        })?;
        Ok(self)
    }

    /// Set files root
    pub fn files_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.files_root = path.into();
        self
    }

    /// Set descriptor output directory
    pub fn gen_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.gen_dir = Some(path.into());
        self
    }

    /// Set settings file path
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.settings_path = Some(path.into());
        self
    }

    /// Set catalog regeneration interval
    pub fn refresh_interval_secs(mut self, secs: u64) -> Self {
        self.config.refresh_interval_secs = secs;
        self
    }

    /// Set remote listing timeout
    pub fn listing_timeout_secs(mut self, secs: u64) -> Self {
        self.config.listing_timeout_secs = secs;
        self
    }

    /// Set remote listing scheme
    pub fn listing_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.listing_scheme = scheme.into();
        self
    }

    /// Set mirror check timeout
    pub fn check_timeout_secs(mut self, secs: u64) -> Self {
        self.config.check_timeout_secs = secs;
        self
    }

    /// Set mirror URL scheme
    pub fn mirror_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.mirror_scheme = scheme.into();
        self
    }

    /// Enable/disable CORS
    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.config.enable_request_logging = enable;
        self
    }

    /// Build the config
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue { field: String, reason: String },
    MissingField { field: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            Self::MissingField { field } => {
                write!(f, "Missing required field: {}", field)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
