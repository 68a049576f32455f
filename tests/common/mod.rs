//! Common test utilities

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use geodist::catalog::{CatalogResult, ListingSource, RemoteFile};
use geodist::pool::{RandomSource, SequenceRandom};
use geodist::server::{DistributionServer, ServerConfig};

#[allow(dead_code)]
pub const HOST: &str = "dl.example.net";

/// Listing source for trees without remote directories
#[allow(dead_code)]
pub struct NoListing;

#[async_trait]
impl ListingSource for NoListing {
    async fn list(&self, _host: &str, _dir: &str) -> CatalogResult<Vec<RemoteFile>> {
        Ok(Vec::new())
    }
}

/// Server over a temporary files root
#[allow(dead_code)]
pub struct TestServer {
    pub root: TempDir,
    pub server: DistributionServer,
}

#[allow(dead_code)]
impl TestServer {
    pub fn router(&self) -> Router {
        self.server.build_router()
    }
}

/// Deterministic payload so slices can be compared
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Write `bytes` to `rel` under `root`, creating parent directories
pub fn write_file(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Build a server; `settings` is written to `settings.json` when given
#[allow(dead_code)]
pub fn test_server(
    files: &[(&str, &[u8])],
    settings: Option<&str>,
    random: Arc<dyn RandomSource>,
) -> TestServer {
    let root = tempfile::tempdir().unwrap();
    for (rel, bytes) in files {
        write_file(root.path(), rel, bytes);
    }

    let mut builder = ServerConfig::builder()
        .files_root(root.path())
        .enable_request_logging(false);
    if let Some(json) = settings {
        let path = root.path().join("settings.json");
        std::fs::write(&path, json).unwrap();
        builder = builder.settings_path(path);
    }

    let server =
        DistributionServer::with_components(builder.build().unwrap(), Arc::new(NoListing), random)
            .unwrap();

    TestServer { root, server }
}

/// Server whose random draws always return `value`
#[allow(dead_code)]
pub fn fixed_random(value: u32) -> Arc<dyn RandomSource> {
    Arc::new(SequenceRandom::new(vec![value]))
}

/// Request with a `Host` header
#[allow(dead_code)]
pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri).header("host", HOST)
}

/// Send a request and collect the full response
#[allow(dead_code)]
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}

/// Header value as `&str`
#[allow(dead_code)]
pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
