//! Catalog data structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::DownloadCategory;

// ============================================================================
// Download Entry
// ============================================================================

/// A single downloadable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    /// File name as published
    pub name: String,

    /// Category the file belongs to
    #[serde(rename = "type")]
    pub category: DownloadCategory,

    /// Size on disk in bytes
    pub size: u64,

    /// Size of the stored artifact (possibly compressed)
    #[serde(rename = "containerSize")]
    pub container_size: u64,

    /// Logical uncompressed size
    #[serde(rename = "contentSize")]
    pub content_size: u64,

    /// Size after installation on the device, used for progress display
    #[serde(rename = "targetSize")]
    pub target_size: u64,

    /// Last modification time in milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Human-readable description
    pub description: String,
}

impl DownloadEntry {
    /// Create an entry for a plain (non-container) artifact
    pub fn plain(
        name: impl Into<String>,
        category: DownloadCategory,
        size: u64,
        timestamp: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            size,
            container_size: size,
            content_size: size,
            target_size: size,
            timestamp,
            description: description.into(),
        }
    }

    /// Whether the artifact is a zip container
    pub fn is_zip(&self) -> bool {
        self.name.ends_with(".zip")
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Immutable set of download entries grouped by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    groups: BTreeMap<DownloadCategory, Vec<DownloadEntry>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a flat list of entries
    pub fn from_entries(entries: impl IntoIterator<Item = DownloadEntry>) -> Self {
        let mut groups: BTreeMap<DownloadCategory, Vec<DownloadEntry>> = BTreeMap::new();
        for entry in entries {
            groups.entry(entry.category).or_default().push(entry);
        }
        Self { groups }
    }

    /// Entries of one category
    pub fn entries(&self, category: DownloadCategory) -> &[DownloadEntry] {
        self.groups.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All entries across categories
    pub fn iter(&self) -> impl Iterator<Item = &DownloadEntry> {
        self.groups.values().flatten()
    }

    /// Categories present in this catalog
    pub fn categories(&self) -> impl Iterator<Item = DownloadCategory> + '_ {
        self.groups.keys().copied()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Whether the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find an entry by exact file name
    pub fn find(&self, name: &str) -> Option<&DownloadEntry> {
        self.iter().find(|e| e.name == name)
    }
}
