//! Catalog snapshot cache and periodic regeneration
//!
//! The cache owns the current [`CatalogSnapshot`] and publishes a new one by
//! swapping an `Arc`; readers holding the previous snapshot keep a complete,
//! consistent view. Concurrent `refresh` calls collapse into the one already
//! running.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::builder::CatalogBuilder;
use super::descriptor::{gzip, CatalogDescriptor};
use super::entry::Catalog;
use super::error::{CatalogError, CatalogResult};

/// File name of the published descriptor
pub const DESCRIPTOR_FILE: &str = "indexes.json";

/// File name of the compressed descriptor
pub const DESCRIPTOR_GZ_FILE: &str = "indexes.json.gz";

/// Default regeneration interval (15 minutes)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

// ============================================================================
// Catalog Snapshot
// ============================================================================

/// One published generation of the catalog
#[derive(Debug)]
pub struct CatalogSnapshot {
    /// Catalog contents
    pub catalog: Catalog,

    /// Rendered JSON descriptor
    pub descriptor: Bytes,

    /// Gzip-compressed descriptor
    pub descriptor_gz: Bytes,

    /// Monotonic generation number, starting at 1
    pub generation: u64,

    /// When the snapshot was generated
    pub generated_at: DateTime<Utc>,

    /// How long the catalog took to build
    pub elapsed: Duration,
}

// ============================================================================
// Catalog Cache
// ============================================================================

/// Owner of the current catalog snapshot and its refresh task
pub struct CatalogCache {
    builder: CatalogBuilder,
    output_dir: Option<PathBuf>,
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
    refresh_lock: Mutex<()>,
    generation: watch::Sender<u64>,
    task: Mutex<Option<RefreshTask>>,
}

/// Handle of the running background refresh task
struct RefreshTask {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl CatalogCache {
    /// Create an in-memory cache
    pub fn new(builder: CatalogBuilder) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            builder,
            output_dir: None,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation,
            task: Mutex::new(None),
        }
    }

    /// Also publish descriptor files into `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Current snapshot, if one has been generated
    pub async fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current.read().await.clone()
    }

    /// Current snapshot, generating one first if forced or none exists
    pub async fn get(&self, force_refresh: bool) -> CatalogResult<Arc<CatalogSnapshot>> {
        if !force_refresh {
            if let Some(snapshot) = self.current().await {
                return Ok(snapshot);
            }
        }
        self.refresh().await
    }

    /// Watch the generation number; changes once per published snapshot
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Regenerate the catalog and publish it
    ///
    /// A call made while another refresh is running waits for that refresh
    /// and returns its snapshot.
    pub async fn refresh(&self) -> CatalogResult<Arc<CatalogSnapshot>> {
        let seen = *self.generation.borrow();
        let _guard = self.refresh_lock.lock().await;

        if *self.generation.borrow() != seen {
            if let Some(snapshot) = self.current().await {
                tracing::debug!(generation = snapshot.generation, "Joined in-flight catalog refresh");
                return Ok(snapshot);
            }
        }

        let started = Instant::now();
        let catalog = self.builder.build().await;
        let elapsed = started.elapsed();
        let generated_at = Utc::now();

        let document = CatalogDescriptor::new(catalog, generated_at, elapsed);
        let json = document.to_json()?;
        let gz = gzip(&json)?;

        if let Some(dir) = &self.output_dir {
            publish_file(dir, DESCRIPTOR_FILE, &json).await?;
            publish_file(dir, DESCRIPTOR_GZ_FILE, &gz).await?;
        }

        let snapshot = Arc::new(CatalogSnapshot {
            catalog: document.categories,
            descriptor: Bytes::from(json),
            descriptor_gz: Bytes::from(gz),
            generation: seen + 1,
            generated_at,
            elapsed,
        });

        *self.current.write().await = Some(snapshot.clone());
        self.generation.send_replace(snapshot.generation);

        crate::metrics::record_catalog_generation(elapsed.as_secs_f64(), snapshot.catalog.len());
        tracing::info!(
            generation = snapshot.generation,
            entries = snapshot.catalog.len(),
            "Regenerated catalog descriptor in {:.1} seconds",
            elapsed.as_secs_f64()
        );

        Ok(snapshot)
    }

    /// Start the periodic refresh task; the first refresh runs immediately
    ///
    /// Returns `false` if the task is already running.
    pub async fn start(self: &Arc<Self>, period: Duration) -> bool {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return false;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let cache: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let Some(cache) = cache.upgrade() else { break };
                        if let Err(e) = cache.refresh().await {
                            tracing::error!(error = %e, "Scheduled catalog refresh failed, keeping previous snapshot");
                        }
                    }
                }
            }

            tracing::info!("Catalog refresh task stopped");
        });

        tracing::info!(period_secs = period.as_secs(), "Catalog refresh task started");
        *task = Some(RefreshTask { stop_tx, handle });
        true
    }

    /// Stop the periodic refresh task and wait for it to exit
    pub async fn stop(&self) {
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            let _ = task.stop_tx.send(());
            if let Err(e) = task.handle.await {
                tracing::warn!(error = %e, "Catalog refresh task ended abnormally");
            }
        }
    }

    /// Whether the periodic refresh task is running
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// Get cache status
    pub async fn status(&self) -> CacheStatus {
        let snapshot = self.current().await;
        CacheStatus {
            has_snapshot: snapshot.is_some(),
            generation: snapshot.as_ref().map_or(0, |s| s.generation),
            entries: snapshot.as_ref().map_or(0, |s| s.catalog.len()),
            age_seconds: snapshot
                .as_ref()
                .map(|s| (Utc::now() - s.generated_at).num_seconds()),
            refresh_running: self.is_running().await,
            output_dir: self.output_dir.clone(),
        }
    }
}

/// Write to a staging file and rename it into place
async fn publish_file(dir: &Path, name: &str, bytes: &[u8]) -> CatalogResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CatalogError::io("create output dir", e))?;

    let target = dir.join(name);
    let staging = dir.join(format!("{name}.tmp"));

    tokio::fs::write(&staging, bytes)
        .await
        .map_err(|e| CatalogError::io("write staging descriptor", e))?;
    tokio::fs::rename(&staging, &target)
        .await
        .map_err(|e| CatalogError::io("publish descriptor", e))?;

    Ok(())
}

/// Cache status information
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub has_snapshot: bool,
    pub generation: u64,
    pub entries: usize,
    pub age_seconds: Option<i64>,
    pub refresh_running: bool,
    pub output_dir: Option<PathBuf>,
}

impl CacheStatus {
    /// Format as display string
    pub fn display(&self) -> String {
        let mut output = String::from("Catalog Status\n");
        output.push_str(&format!("{:-<30}\n", ""));
        output.push_str(&format!("Has Snapshot: {}\n", self.has_snapshot));
        output.push_str(&format!("Generation: {}\n", self.generation));
        output.push_str(&format!("Entries: {}\n", self.entries));
        if let Some(age) = self.age_seconds {
            output.push_str(&format!("Age: {age}s\n"));
        }
        output.push_str(&format!("Refresh Task: {}\n", self.refresh_running));
        if let Some(ref path) = self.output_dir {
            output.push_str(&format!("Output: {}\n", path.display()));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::listing::{ListingSource, RemoteFile, MARKER_FILE};
    use crate::catalog::DownloadCategory;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Listing source that answers slowly and counts calls
    struct SlowListing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ListingSource for SlowListing {
        async fn list(&self, _host: &str, _dir: &str) -> CatalogResult<Vec<RemoteFile>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(vec![RemoteFile {
                name: "Slope_alps.sqlitedb".to_string(),
                kind: "file".to_string(),
                mtime: String::new(),
                size: 64,
            }])
        }
    }

    fn files_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("slope")).unwrap();
        std::fs::write(dir.path().join("slope").join(MARKER_FILE), "mirror.example.net\n").unwrap();
        std::fs::write(dir.path().join("Austria_europe_2.obf"), vec![0u8; 128]).unwrap();
        dir
    }

    fn cache_over(root: &Path) -> (CatalogCache, Arc<SlowListing>) {
        let listing = Arc::new(SlowListing {
            calls: AtomicUsize::new(0),
        });
        let cache = CatalogCache::new(CatalogBuilder::new(root, listing.clone()));
        (cache, listing)
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot() {
        let root = files_root();
        let (cache, _) = cache_over(root.path());

        assert!(cache.current().await.is_none());

        let snapshot = cache.refresh().await.unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.catalog.len(), 2);
        assert_eq!(snapshot.catalog.entries(DownloadCategory::Slope).len(), 1);

        let parsed = CatalogDescriptor::from_json(&snapshot.descriptor).unwrap();
        assert_eq!(parsed.categories, snapshot.catalog);
        let parsed_gz = CatalogDescriptor::from_gzip(&snapshot.descriptor_gz).unwrap();
        assert_eq!(parsed_gz, parsed);
    }

    #[tokio::test]
    async fn test_refresh_writes_output_files() {
        let root = files_root();
        let out = tempfile::tempdir().unwrap();
        let (cache, _) = cache_over(root.path());
        let cache = cache.with_output_dir(out.path().join("gen"));

        cache.refresh().await.unwrap();

        let json = std::fs::read(out.path().join("gen").join(DESCRIPTOR_FILE)).unwrap();
        let gz = std::fs::read(out.path().join("gen").join(DESCRIPTOR_GZ_FILE)).unwrap();
        assert_eq!(
            CatalogDescriptor::from_json(&json).unwrap(),
            CatalogDescriptor::from_gzip(&gz).unwrap()
        );
        assert!(!out.path().join("gen").join("indexes.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let root = files_root();
        let (cache, listing) = cache_over(root.path());

        let (a, b) = tokio::join!(cache.refresh(), cache.refresh());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.generation, 1);
        assert_eq!(b.generation, 1);
        assert_eq!(listing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_only_refreshes_when_needed() {
        let root = files_root();
        let (cache, listing) = cache_over(root.path());

        assert_eq!(cache.get(false).await.unwrap().generation, 1);
        assert_eq!(cache.get(false).await.unwrap().generation, 1);
        assert_eq!(listing.calls.load(Ordering::SeqCst), 1);

        assert_eq!(cache.get(true).await.unwrap().generation, 2);
        assert_eq!(listing.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_task_start_and_stop() {
        let root = files_root();
        let (cache, _) = cache_over(root.path());
        let cache = Arc::new(cache);
        let mut generations = cache.subscribe();

        assert!(cache.start(Duration::from_millis(20)).await);
        assert!(!cache.start(Duration::from_millis(20)).await);
        assert!(cache.is_running().await);

        tokio::time::timeout(Duration::from_secs(10), async {
            while *generations.borrow_and_update() < 2 {
                generations.changed().await.unwrap();
            }
        })
        .await
        .expect("two refresh cycles should complete");

        cache.stop().await;
        assert!(!cache.is_running().await);

        let status = cache.status().await;
        assert!(status.has_snapshot);
        assert!(status.generation >= 2);
        assert!(!status.refresh_running);
    }
}
