//! geodist - Map data download distribution server
//!
//! Serves map, terrain, wiki, voice and font packages either from the local
//! files tree or by redirecting to weighted mirror pools, with resumable
//! byte-range delivery for local downloads.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`catalog`] - Catalog of downloadable files and its cached descriptor
//! - [`pool`] - Download settings and weighted mirror tables
//! - [`routing`] - Serve-locally vs. redirect decision
//! - [`resolver`] - Request parameters to on-disk file
//! - [`range`] - HTTP range delivery (200/206/416, multipart)
//! - [`locate`] - Map name to local path or verified mirror URL
//! - [`server`] - axum application wiring it all together
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use geodist::config::Config;
//! use geodist::server::DistributionServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = DistributionServer::new(config.server_config()?)?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod locate;
pub mod metrics;
pub mod pool;
pub mod range;
pub mod resolver;
pub mod routing;
pub mod server;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogCache, CatalogSnapshot, DownloadCategory, DownloadEntry};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, GeodistErrorTrait, Result};
    pub use crate::locate::{Located, MapLocator};
    pub use crate::pool::{DownloadSettings, ServerPool, SettingsStore, Specialty};
    pub use crate::range::RangeServer;
    pub use crate::resolver::{FileResolver, ResolvedFile};
    pub use crate::routing::{DownloadQuery, DownloadRouter, RequestFlag, RoutingDecision};
    pub use crate::server::{DistributionServer, ServerConfig};
}

// Direct re-exports for convenience
pub use catalog::{Catalog, DownloadCategory, DownloadEntry};
pub use routing::RoutingDecision;
