//! Serialized catalog descriptor
//!
//! The descriptor is the document clients download to learn what files
//! exist. It is published as JSON and as a gzip-compressed copy.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::time::Duration;

use super::entry::Catalog;
use super::error::{CatalogError, CatalogResult};

/// Descriptor format version
pub const DESCRIPTOR_VERSION: u32 = 1;

/// Timestamp format of the `timestamp` field
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Catalog descriptor document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    /// Format version
    pub version: u32,

    /// Generation time, `dd.MM.yyyy HH:mm:ss`
    pub timestamp: String,

    /// Generation duration in seconds with one decimal
    pub gentime: String,

    /// Entries grouped by category tag
    pub categories: Catalog,
}

impl CatalogDescriptor {
    /// Describe `catalog` as generated at `generated_at` after `elapsed`
    pub fn new(catalog: Catalog, generated_at: DateTime<Utc>, elapsed: Duration) -> Self {
        Self {
            version: DESCRIPTOR_VERSION,
            timestamp: generated_at.format(TIMESTAMP_FORMAT).to_string(),
            gentime: format!("{:.1}", elapsed.as_secs_f64()),
            categories: catalog,
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> CatalogResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(Into::into)
    }

    /// Parse from JSON
    pub fn from_json(bytes: &[u8]) -> CatalogResult<Self> {
        serde_json::from_slice(bytes).map_err(Into::into)
    }

    /// Parse from the gzip variant
    pub fn from_gzip(bytes: &[u8]) -> CatalogResult<Self> {
        let mut json = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(|e| CatalogError::io("gunzip descriptor", e))?;
        Self::from_json(&json)
    }
}

/// Gzip-compress a rendered descriptor
pub fn gzip(bytes: &[u8]) -> CatalogResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| CatalogError::io("gzip descriptor", e))?;
    encoder
        .finish()
        .map_err(|e| CatalogError::io("gzip descriptor", e))
}
