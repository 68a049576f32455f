//! Remote file listings for categories hosted on other servers
//!
//! A category directory containing [`MARKER_FILE`] does not hold the files
//! itself. Each line of the marker names a host that publishes a JSON listing
//! of the directory under `/public-api-indexes/<dir>`.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{CatalogError, CatalogResult};

/// Marker file that redirects a category directory to remote hosts
pub const MARKER_FILE: &str = "index-source.info";

/// Path prefix of the listing API on remote hosts
pub const LISTING_PATH: &str = "public-api-indexes";

/// One item of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub mtime: String,
    #[serde(default)]
    pub size: u64,
}

impl RemoteFile {
    /// Whether the item is a regular file
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }

    /// Modification time in milliseconds, e.g. from `Wed, 31 Aug 2022 11:53:18 GMT`
    pub fn timestamp_millis(&self) -> i64 {
        match DateTime::parse_from_rfc2822(&self.mtime) {
            Ok(dt) => dt.timestamp_millis(),
            Err(e) => {
                tracing::warn!(name = %self.name, mtime = %self.mtime, error = %e, "Unparsable listing mtime");
                0
            }
        }
    }
}

/// Source of remote directory listings
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the listing of `dir` from `host`
    async fn list(&self, host: &str, dir: &str) -> CatalogResult<Vec<RemoteFile>>;
}

/// Listing source backed by HTTP requests
pub struct HttpListingSource {
    client: Client,
    scheme: String,
}

impl HttpListingSource {
    /// Create a source that queries hosts over `https`
    pub fn new(timeout: Duration) -> CatalogResult<Self> {
        Self::with_scheme("https", timeout)
    }

    /// Create a source with a custom URL scheme
    pub fn with_scheme(scheme: impl Into<String>, timeout: Duration) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Listing {
                host: String::new(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            scheme: scheme.into(),
        })
    }

    fn listing_url(&self, host: &str, dir: &str) -> String {
        format!("{}://{}/{}/{}", self.scheme, host, LISTING_PATH, dir)
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn list(&self, host: &str, dir: &str) -> CatalogResult<Vec<RemoteFile>> {
        let url = self.listing_url(host, dir);
        let listing_error = |reason: String| CatalogError::Listing {
            host: host.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| listing_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(listing_error(format!("HTTP {}", response.status())));
        }

        response
            .json::<Vec<RemoteFile>>()
            .await
            .map_err(|e| listing_error(e.to_string()))
    }
}
