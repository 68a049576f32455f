//! HTTP handlers for the distribution server
//!
//! Download endpoints answer with file bytes or redirects; the `/api`
//! endpoints answer with JSON wrapped in [`ApiResponse`].

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, uri::Authority, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::locate::Located;
use crate::metrics;
use crate::pool::Specialty;
use crate::routing::{redirect_location, DownloadQuery};

use super::app::AppState;

/// Message for every unresolvable download; never names paths
const NOT_FOUND_MESSAGE: &str = "Requested resource is missing or request is incorrect.";

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message.into()),
        }
    }
}

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub catalog_generation: u64,
    pub catalog_entries: usize,
    pub refresh_running: bool,
}

/// Mirror pools and their shares
#[derive(Debug, Serialize)]
pub struct ServersResponse {
    pub main_load: u32,
    pub help_servers: Vec<String>,
    pub main_servers: Vec<String>,
    pub percentages: BTreeMap<Specialty, BTreeMap<String, u32>>,
}

/// Settings reload outcome
#[derive(Debug, Default, Serialize)]
pub struct ReloadResponse {
    pub help_servers: usize,
    pub main_servers: usize,
    pub errors: Vec<String>,
}

/// `?refresh=true` on descriptor endpoints
#[derive(Debug, Default, Deserialize)]
pub struct DescriptorQuery {
    #[serde(default)]
    pub refresh: Option<String>,
}

/// `?name=` on the locate endpoint
#[derive(Debug, Deserialize)]
pub struct LocateQuery {
    pub name: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Request-level failures
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Download endpoints
        .route("/download", get(download).head(download))
        .route("/download.php", get(download).head(download))
        // Catalog descriptor
        .route("/indexes.json", get(descriptor_json))
        .route("/indexes.json.gz", get(descriptor_gz))
        // API endpoints
        .route("/api/health", get(health_check))
        .route("/api/servers", get(list_servers))
        .route("/api/reload", post(reload_settings))
        .route("/api/locate", get(locate_map))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state)
}

// ============================================================================
// Download Handlers
// ============================================================================

/// Serve or redirect a download
async fn download(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let started = Instant::now();
    let response = match serve_download(&state, &method, &headers, &uri).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_response("download", response.status().as_u16(), started.elapsed().as_secs_f64());
    response
}

async fn serve_download(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Response, ApiError> {
    if !has_valid_host(headers, uri) {
        return Err(ApiError::BadRequest("Invalid host name".to_string()));
    }

    let query = DownloadQuery::parse(uri.query().unwrap_or(""));
    let Some(file_name) = query.file.as_deref() else {
        return Err(ApiError::BadRequest("File parameter is missing.".to_string()));
    };

    let head = method == Method::HEAD;
    if !head {
        let pools = state.settings.snapshot();
        let decision = state.router.decide(&query, &pools.settings);
        metrics::record_routing_decision(decision.label());

        if let Some(mirror) = decision.mirror() {
            let location = redirect_location(request_scheme(headers, uri), mirror, uri.path(), uri.query());
            tracing::debug!(file = %file_name, decision = decision.label(), location = %location, "Redirecting download");
            return Ok(redirect(&location));
        }
    }

    let Some(flag) = query.flag() else {
        tracing::debug!(file = %file_name, "Download request without location flag");
        return Err(ApiError::NotFound(NOT_FOUND_MESSAGE.to_string()));
    };

    let file = state.resolver.resolve(flag, file_name).await.map_err(|e| {
        tracing::info!(flag = %flag, error = %e, "Download not resolved");
        ApiError::NotFound(NOT_FOUND_MESSAGE.to_string())
    })?;

    // a header that is not visible ASCII still counts, and never parses
    let range = headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());
    state.range.respond(&file, range, head).await.map_err(|e| {
        tracing::error!(file = %file.name, error = %e, "Failed to open download");
        ApiError::Internal("Failed to read requested file".to_string())
    })
}

fn has_valid_host(headers: &HeaderMap, uri: &Uri) -> bool {
    match headers.get(header::HOST) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|h| h.parse::<Authority>().ok())
            .is_some_and(|a| !a.host().is_empty()),
        None => uri.authority().is_some(),
    }
}

/// `X-Forwarded-Proto`, else the request scheme, else `http`
fn request_scheme<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> &'a str {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http")
}

fn redirect(location: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::FOUND;
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

// ============================================================================
// Descriptor Handlers
// ============================================================================

fn refresh_requested(query: &DescriptorQuery) -> bool {
    query
        .refresh
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
}

/// Catalog descriptor as JSON
async fn descriptor_json(
    State(state): State<AppState>,
    Query(query): Query<DescriptorQuery>,
) -> Result<Response, ApiError> {
    let snapshot = state
        .catalog
        .get(refresh_requested(&query))
        .await
        .map_err(|e| ApiError::Internal(format!("Catalog unavailable: {e}")))?;

    Ok(bytes_response(snapshot.descriptor.clone(), "application/json"))
}

/// Catalog descriptor, gzip-compressed
async fn descriptor_gz(
    State(state): State<AppState>,
    Query(query): Query<DescriptorQuery>,
) -> Result<Response, ApiError> {
    let snapshot = state
        .catalog
        .get(refresh_requested(&query))
        .await
        .map_err(|e| ApiError::Internal(format!("Catalog unavailable: {e}")))?;

    Ok(bytes_response(snapshot.descriptor_gz.clone(), "application/gzip"))
}

fn bytes_response(bytes: Bytes, content_type: &'static str) -> Response {
    ([(header::CONTENT_TYPE, HeaderValue::from_static(content_type))], bytes).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.catalog.status().await;

    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        catalog_generation: status.generation,
        catalog_entries: status.entries,
        refresh_running: status.refresh_running,
    }))
}

/// Mirror pools and per-specialty percentages
async fn list_servers(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.settings.snapshot();

    Json(ApiResponse::success(ServersResponse {
        main_load: snapshot.settings.main_load,
        help_servers: snapshot.settings.help_servers.clone(),
        main_servers: snapshot.settings.main_servers.clone(),
        percentages: snapshot.pool.percentages(),
    }))
}

/// Reload download settings from disk
async fn reload_settings(State(state): State<AppState>) -> Response {
    match state.settings.reload() {
        Ok(snapshot) => Json(ApiResponse::success(ReloadResponse {
            help_servers: snapshot.settings.help_servers.len(),
            main_servers: snapshot.settings.main_servers.len(),
            errors: Vec::new(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::failure(
                ReloadResponse {
                    errors: e.messages(),
                    ..Default::default()
                },
                "Settings reload failed, previous settings kept",
            )),
        )
            .into_response(),
    }
}

/// Locate a map locally or on a mirror
async fn locate_map(
    State(state): State<AppState>,
    Query(query): Query<LocateQuery>,
) -> Result<Json<ApiResponse<Located>>, ApiError> {
    match state.locator.locate(&query.name).await {
        Ok(Some(located)) => Ok(Json(ApiResponse::success(located))),
        Ok(None) => Err(ApiError::NotFound(format!("Map not found: {}", query.name))),
        Err(e) => Err(ApiError::Internal(format!("Catalog unavailable: {e}"))),
    }
}

/// Prometheus text exposition
async fn prometheus_metrics() -> Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4"))],
            text,
        )
            .into_response(),
        Err(e) => ApiError::Internal(format!("Failed to encode metrics: {e}")).into_response(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert!(response.data.is_some());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_error_response() {
        let response = ErrorResponse::new("test error");
        assert!(!response.success);
        assert_eq!(response.error, "test error");
    }

    #[test]
    fn test_request_scheme() {
        let uri: Uri = "/download?file=a".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(request_scheme(&headers, &uri), "http");

        let absolute: Uri = "https://dl.example.net/download".parse().unwrap();
        assert_eq!(request_scheme(&headers, &absolute), "https");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(request_scheme(&headers, &uri), "https");
    }

    #[test]
    fn test_host_validation() {
        let uri: Uri = "/download".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert!(!has_valid_host(&headers, &uri));

        headers.insert(header::HOST, HeaderValue::from_static("dl.example.net:8080"));
        assert!(has_valid_host(&headers, &uri));

        headers.insert(header::HOST, HeaderValue::from_static("bad host"));
        assert!(!has_valid_host(&headers, &uri));
    }

    #[test]
    fn test_refresh_flag() {
        assert!(refresh_requested(&DescriptorQuery {
            refresh: Some("true".to_string())
        }));
        assert!(!refresh_requested(&DescriptorQuery::default()));
    }
}
