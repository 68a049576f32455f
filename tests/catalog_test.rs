//! Catalog generation integration tests
//!
//! Remote listings go through `HttpListingSource` against a wiremock host;
//! local artifacts are real files and zip containers in a temporary tree.

mod common;

use geodist::catalog::{
    CatalogBuilder, CatalogCache, CatalogDescriptor, DownloadCategory, HttpListingSource,
    DESCRIPTOR_FILE, DESCRIPTOR_GZ_FILE, MARKER_FILE,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::FileOptions;

use common::write_file;

fn http_listing() -> Arc<HttpListingSource> {
    Arc::new(HttpListingSource::with_scheme("http", Duration::from_secs(5)).unwrap())
}

fn host_of(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

// ============================================================================
// Remote Listings
// ============================================================================

#[tokio::test]
async fn test_remote_listing_falls_through_failing_host() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;

    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public-api-indexes/hillshade"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "name": "Hillshade_europe.sqlitedb",
                "type": "file",
                "mtime": "Wed, 31 Aug 2022 11:53:18 GMT",
                "size": 4096
            },
            {
                "name": "archive",
                "type": "directory",
                "mtime": "Wed, 31 Aug 2022 11:53:18 GMT",
                "size": 0
            },
            {
                "name": "notes.txt",
                "type": "file",
                "mtime": "Wed, 31 Aug 2022 11:53:18 GMT",
                "size": 12
            }
        ])))
        .expect(1)
        .mount(&healthy)
        .await;

    let root = tempfile::tempdir().unwrap();
    write_file(
        root.path(),
        &format!("hillshade/{MARKER_FILE}"),
        format!("{}\n{}\n", host_of(&broken), host_of(&healthy)).as_bytes(),
    );

    let catalog = CatalogBuilder::new(root.path(), http_listing()).build().await;
    let entries = catalog.entries(DownloadCategory::Hillshade);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Hillshade_europe.sqlitedb");
    assert_eq!(entries[0].size, 4096);
    assert_eq!(entries[0].timestamp, 1_661_946_798_000);
}

#[tokio::test]
async fn test_remote_listing_first_match_wins() {
    let first = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public-api-indexes/slope"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Slope_asia.sqlitedb", "type": "file", "mtime": "", "size": 1}
        ])))
        .mount(&first)
        .await;

    let second = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&second)
        .await;

    let root = tempfile::tempdir().unwrap();
    write_file(
        root.path(),
        &format!("slope/{MARKER_FILE}"),
        format!("{}\n{}\n", host_of(&first), host_of(&second)).as_bytes(),
    );

    let catalog = CatalogBuilder::new(root.path(), http_listing()).build().await;
    let entries = catalog.entries(DownloadCategory::Slope);

    assert_eq!(entries.len(), 1);
    // unparsable mtime
    assert_eq!(entries[0].timestamp, 0);
}

// ============================================================================
// Local Artifacts
// ============================================================================

#[tokio::test]
async fn test_cache_publishes_descriptor_files() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    // zip with two members: summed content size, first member's time
    let zip_path = root.path().join("indexes/Germany_europe.obf.zip");
    std::fs::create_dir_all(zip_path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(std::fs::File::create(&zip_path).unwrap());
    let modified = zip::DateTime::from_date_and_time(2022, 8, 31, 11, 53, 18).unwrap();
    for (name, len) in [("Germany_europe.obf", 3000usize), ("readme.txt", 200)] {
        zip.start_file(name, FileOptions::default().last_modified_time(modified))
            .unwrap();
        zip.write_all(&common::payload(len)).unwrap();
    }
    zip.finish().unwrap();

    write_file(root.path(), "indexes/en-tts.voice.zip", b"not a zip");
    write_file(root.path(), "road-indexes/Germany_europe.road.obf", &common::payload(700));

    let cache = CatalogCache::new(CatalogBuilder::new(root.path(), http_listing()))
        .with_output_dir(out.path());
    let snapshot = cache.refresh().await.unwrap();

    let germany = snapshot.catalog.find("Germany_europe.obf.zip").unwrap();
    assert_eq!(germany.category, DownloadCategory::Map);
    assert_eq!(germany.content_size, 3200);
    assert_eq!(germany.container_size, std::fs::metadata(&zip_path).unwrap().len());
    assert_eq!(germany.timestamp, 1_661_946_798_000);

    let road = snapshot.catalog.find("Germany_europe.road.obf").unwrap();
    assert_eq!(road.content_size, road.container_size);

    // broken archives are skipped
    assert!(snapshot.catalog.find("en-tts.voice.zip").is_none());

    let json = std::fs::read(out.path().join(DESCRIPTOR_FILE)).unwrap();
    let gz = std::fs::read(out.path().join(DESCRIPTOR_GZ_FILE)).unwrap();
    let from_json = CatalogDescriptor::from_json(&json).unwrap();
    assert_eq!(from_json.categories, snapshot.catalog);
    assert_eq!(CatalogDescriptor::from_gzip(&gz).unwrap(), from_json);
}

#[tokio::test]
async fn test_missing_root_is_empty_catalog() {
    let cache = CatalogCache::new(CatalogBuilder::new(
        "/nonexistent/geodist-files",
        http_listing(),
    ));

    let snapshot = cache.get(false).await.unwrap();
    assert!(snapshot.catalog.is_empty());
    assert_eq!(snapshot.generation, 1);
}
