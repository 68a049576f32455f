//! Catalog construction from the files tree
//!
//! Building is best-effort: a broken artifact or an unreachable listing host
//! is logged and skipped, and a missing root produces an empty catalog.

use chrono::{DateTime, NaiveDate, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::category::{readable_name, split_extension, DownloadCategory};
use super::entry::{Catalog, DownloadEntry};
use super::error::{CatalogError, CatalogResult};
use super::listing::{ListingSource, RemoteFile, MARKER_FILE};

/// Builds [`Catalog`] snapshots from a files root
pub struct CatalogBuilder {
    root: PathBuf,
    listing: Arc<dyn ListingSource>,
}

impl CatalogBuilder {
    /// Create a builder over `root`, using `listing` for remote directories
    pub fn new(root: impl Into<PathBuf>, listing: Arc<dyn ListingSource>) -> Self {
        Self {
            root: root.into(),
            listing,
        }
    }

    /// Files root this builder scans
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build a complete catalog
    pub async fn build(&self) -> Catalog {
        let mut entries = Vec::new();

        for category in DownloadCategory::all() {
            for dir in category.rule().dirs {
                let found = self.load_dir(category, dir).await;
                tracing::debug!(category = %category, dir = %dir, count = found.len(), "Loaded category directory");
                entries.extend(found);
            }
        }

        Catalog::from_entries(entries)
    }

    async fn load_dir(&self, category: DownloadCategory, dir: &str) -> Vec<DownloadEntry> {
        let path = self.root.join(dir);

        let marker = path.join(MARKER_FILE);
        if tokio::fs::metadata(&marker).await.is_ok_and(|m| m.is_file()) {
            return self.load_remote(category, dir, &marker).await;
        }

        match tokio::task::spawn_blocking(move || scan_local(category, &path)).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(category = %category, dir = %dir, error = %e, "Directory scan task failed");
                Vec::new()
            }
        }
    }

    /// Query the marker's hosts in order and keep the first non-empty result
    async fn load_remote(
        &self,
        category: DownloadCategory,
        dir: &str,
        marker: &Path,
    ) -> Vec<DownloadEntry> {
        let hosts = match tokio::fs::read_to_string(marker).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(marker = %marker.display(), error = %e, "Cannot read index source marker");
                return Vec::new();
            }
        };

        for host in hosts.lines().map(str::trim).filter(|h| !h.is_empty()) {
            let files = match self.listing.list(host, dir).await {
                Ok(files) => files,
                Err(e) => {
                    tracing::warn!(host = %host, dir = %dir, error = %e, "Remote listing failed, trying next host");
                    continue;
                }
            };

            let entries: Vec<DownloadEntry> = files
                .iter()
                .filter_map(|f| remote_entry(category, f))
                .collect();

            if !entries.is_empty() {
                tracing::info!(host = %host, dir = %dir, count = entries.len(), "Loaded remote listing");
                return entries;
            }
        }

        tracing::warn!(category = %category, dir = %dir, "No remote host returned matching files");
        Vec::new()
    }
}

fn remote_entry(category: DownloadCategory, file: &RemoteFile) -> Option<DownloadEntry> {
    let rule = category.rule();
    // zip contents are not inspected over the network
    if !file.is_file() || !rule.accepts(&file.name) || file.name.ends_with(".zip") {
        return None;
    }

    let (_, ext) = split_extension(&file.name);
    let title = rule.default_title(&readable_name(&file.name), ext);

    Some(DownloadEntry::plain(
        file.name.clone(),
        category,
        file.size,
        file.timestamp_millis(),
        title,
    ))
}

/// Scan one local directory; runs on a blocking thread
fn scan_local(category: DownloadCategory, dir: &Path) -> Vec<DownloadEntry> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            return Vec::new();
        }
    };

    let rule = category.rule();
    let mut files: Vec<(String, PathBuf)> = read_dir
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|e| {
            let name = e.file_name().into_string().ok()?;
            rule.accepts(&name).then(|| (name, e.path()))
        })
        .collect();
    files.sort();

    files
        .into_iter()
        .filter_map(|(name, path)| match local_entry(category, &name, &path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Skipping unreadable artifact");
                None
            }
        })
        .collect()
}

fn local_entry(category: DownloadCategory, name: &str, path: &Path) -> CatalogResult<DownloadEntry> {
    let metadata = std::fs::metadata(path).map_err(|e| CatalogError::io("stat artifact", e))?;
    let size = metadata.len();

    let rule = category.rule();
    let (_, ext) = split_extension(name);
    let title = rule.default_title(&readable_name(name), ext);

    if !name.ends_with(".zip") {
        let mtime = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or(0);
        return Ok(DownloadEntry::plain(name, category, size, mtime, title));
    }

    let summary = summarize_zip(name, path)?;
    Ok(DownloadEntry {
        name: name.to_string(),
        category,
        size,
        container_size: size,
        content_size: summary.content_size,
        target_size: summary.content_size,
        timestamp: summary.timestamp.unwrap_or(0),
        description: summary.comment.unwrap_or(title),
    })
}

/// Facts read from a zip container's central directory
struct ZipSummary {
    content_size: u64,
    timestamp: Option<i64>,
    comment: Option<String>,
}

fn summarize_zip(name: &str, path: &Path) -> CatalogResult<ZipSummary> {
    let zip_err = |source| CatalogError::Zip {
        name: name.to_string(),
        source,
    };

    let file = File::open(path).map_err(|e| CatalogError::io("open zip", e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(zip_err)?;

    let mut summary = ZipSummary {
        content_size: 0,
        timestamp: None,
        comment: None,
    };

    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(zip_err)?;
        summary.content_size += entry.size();

        if i == 0 {
            summary.timestamp = zip_time_millis(entry.last_modified());
            let comment = entry.comment().trim();
            if !comment.is_empty() {
                summary.comment = Some(comment.to_string());
            }
        }
    }

    Ok(summary)
}

/// Zip entries carry DOS date/time; read as UTC
fn zip_time_millis(dt: zip::DateTime) -> Option<i64> {
    NaiveDate::from_ymd_opt(i32::from(dt.year()), u32::from(dt.month()), u32::from(dt.day()))?
        .and_hms_opt(u32::from(dt.hour()), u32::from(dt.minute()), u32::from(dt.second()))
        .map(|t| t.and_utc().timestamp_millis())
}
