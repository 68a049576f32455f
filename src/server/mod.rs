//! HTTP distribution server
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           Distribution Server            │
//! │                                          │
//! │  ┌────────────────────────────────────┐  │
//! │  │  Download                          │  │
//! │  │  - Router: local / help / main     │  │
//! │  │  - FileResolver                    │  │
//! │  │  - RangeServer (200/206/416)       │  │
//! │  └────────────────────────────────────┘  │
//! │                                          │
//! │  ┌────────────────────────────────────┐  │
//! │  │  Catalog                           │  │
//! │  │  - CatalogCache + refresh task     │  │
//! │  │  - indexes.json / indexes.json.gz  │  │
//! │  └────────────────────────────────────┘  │
//! │                                          │
//! │  ┌────────────────────────────────────┐  │
//! │  │  REST API                          │  │
//! │  │  GET  /api/health                  │  │
//! │  │  GET  /api/servers                 │  │
//! │  │  POST /api/reload                  │  │
//! │  │  GET  /api/locate?name=            │  │
//! │  │  GET  /metrics                     │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use geodist::server::{DistributionServer, ServerConfig};
//!
//! let config = ServerConfig::builder().files_root("/var/www/files").build()?;
//! let server = DistributionServer::new(config)?;
//! server.start().await?;
//! ```

pub mod api;
pub mod app;
pub mod config;

// Re-export main types
pub use app::{AppState, DistributionServer, ServerInfo};
pub use config::{ConfigError, ServerConfig, ServerConfigBuilder};
