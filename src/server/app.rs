//! Distribution server implementation
//!
//! This module wires the catalog, mirror pools, router, resolver and range
//! server into one axum application.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::catalog::{CatalogBuilder, CatalogCache, HttpListingSource, ListingSource};
use crate::error::{Error, Result};
use crate::locate::MapLocator;
use crate::pool::{DownloadSettings, RandomSource, SettingsStore, ThreadRandom};
use crate::range::RangeServer;
use crate::resolver::FileResolver;
use crate::routing::DownloadRouter;

use super::api::create_router;
use super::config::ServerConfig;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Catalog snapshots and their refresh task
    pub catalog: Arc<CatalogCache>,

    /// Download settings and mirror pools
    pub settings: Arc<SettingsStore>,

    /// Serve-or-redirect decisions
    pub router: Arc<DownloadRouter>,

    /// Request to file mapping
    pub resolver: FileResolver,

    /// Partial-content responses
    pub range: RangeServer,

    /// Map name lookup
    pub locator: Arc<MapLocator>,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: ServerConfig,
}

// ============================================================================
// Distribution Server
// ============================================================================

/// Main distribution server
pub struct DistributionServer {
    config: ServerConfig,
    state: AppState,
}

impl DistributionServer {
    /// Create a server with HTTP listings and thread-local randomness
    pub fn new(config: ServerConfig) -> Result<Self> {
        let listing = HttpListingSource::with_scheme(config.listing_scheme.clone(), config.listing_timeout())?;
        Self::with_components(config, Arc::new(listing), Arc::new(ThreadRandom))
    }

    /// Create a server with explicit listing and random sources
    pub fn with_components(
        config: ServerConfig,
        listing: Arc<dyn ListingSource>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self> {
        config.validate().map_err(|e| Error::config(e.to_string()))?;

        let mut cache = CatalogCache::new(CatalogBuilder::new(&config.files_root, listing));
        if let Some(dir) = &config.gen_dir {
            cache = cache.with_output_dir(dir);
        }
        let catalog = Arc::new(cache);

        let settings = Arc::new(match &config.settings_path {
            Some(path) => SettingsStore::load(path)?,
            None => SettingsStore::new(DownloadSettings::default())?,
        });

        let resolver = FileResolver::new(&config.files_root);

        let locator = MapLocator::new(
            catalog.clone(),
            resolver.clone(),
            settings.clone(),
            random.clone(),
            config.check_timeout(),
        )?
        .with_scheme(config.mirror_scheme.clone());

        let state = AppState {
            catalog,
            settings,
            router: Arc::new(DownloadRouter::new(random)),
            resolver,
            range: RangeServer::new(),
            locator: Arc::new(locator),
            start_time: Instant::now(),
            config: config.clone(),
        };

        Ok(Self { config, state })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        // Add CORS layer if enabled
        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        // Add tracing layer if enabled
        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server
    pub async fn start(&self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::with_source(format!("Failed to bind {addr}"), e))?;

        tracing::info!("Starting distribution server on {}", addr);
        self.start_background_tasks().await;

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await;

        self.state.catalog.stop().await;
        served?;

        tracing::info!("Distribution server shutdown complete");
        Ok(())
    }

    /// Start background tasks
    async fn start_background_tasks(&self) {
        self.state
            .catalog
            .start(self.config.refresh_interval())
            .await;

        tracing::info!("Background tasks started");
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            files_root: self.config.files_root.display().to_string(),
            refresh_interval_secs: self.config.refresh_interval_secs,
            settings_file: self
                .config
                .settings_path
                .as_ref()
                .map(|p| p.display().to_string()),
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub files_root: String,
    pub refresh_interval_secs: u64,
    pub settings_file: Option<String>,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Distribution Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Files Root: {}\n\
             Catalog Refresh: {}s\n\
             Settings: {}\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.files_root,
            self.refresh_interval_secs,
            self.settings_file.as_deref().unwrap_or("(none, all local)"),
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
