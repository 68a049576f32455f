//! Download catalog
//!
//! Describes every file the server can deliver, grouped by category.
//!
//! # Modules
//!
//! - [`category`] - Category identities and the per-tag file rule table
//! - [`entry`] - Entry and catalog data structures
//! - [`listing`] - Remote directory listings behind the `index-source.info` marker
//! - [`builder`] - Catalog construction from the files tree
//! - [`descriptor`] - JSON descriptor document and its gzip variant
//! - [`cache`] - Snapshot publication and periodic regeneration
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use geodist::catalog::{CatalogBuilder, CatalogCache, HttpListingSource};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let listing = Arc::new(HttpListingSource::new(Duration::from_secs(30))?);
//! let cache = Arc::new(
//!     CatalogCache::new(CatalogBuilder::new("/var/www/files", listing))
//!         .with_output_dir("/var/www/gen"),
//! );
//! cache.start(Duration::from_secs(900)).await;
//!
//! let snapshot = cache.get(false).await?;
//! println!("{} entries", snapshot.catalog.len());
//! ```

pub mod builder;
pub mod cache;
pub mod category;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod listing;

pub use builder::CatalogBuilder;
pub use cache::{
    CacheStatus, CatalogCache, CatalogSnapshot, DEFAULT_REFRESH_INTERVAL, DESCRIPTOR_FILE,
    DESCRIPTOR_GZ_FILE,
};
pub use category::{readable_name, rule_for, CategoryRule, DownloadCategory, CATEGORY_RULES};
pub use descriptor::{CatalogDescriptor, DESCRIPTOR_VERSION};
pub use entry::{Catalog, DownloadEntry};
pub use error::{CatalogError, CatalogResult};
pub use listing::{HttpListingSource, ListingSource, RemoteFile, MARKER_FILE};
