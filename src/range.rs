//! Partial-content delivery of local files
//!
//! Handles the `Range` request header for one resolved file: full body,
//! a single slice, `multipart/byteranges` for several slices, or 416 when
//! the header cannot be satisfied.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::{future, stream, StreamExt, TryStreamExt};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::resolver::ResolvedFile;

/// Upper bound on ranges accepted in one header
pub const MAX_RANGES: usize = 100;

const OCTET_STREAM: &str = "application/octet-stream";

// ============================================================================
// Range Parsing
// ============================================================================

/// Inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// What a `Range` header asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangePlan {
    /// No header: the whole file
    Full,
    Single(ByteRange),
    Multi(Vec<ByteRange>),
    /// Malformed or outside the file
    Unsatisfiable,
}

impl RangePlan {
    /// Plan a response for an optional `Range` header over `total` bytes
    pub fn new(header: Option<&str>, total: u64) -> Self {
        let Some(header) = header else {
            return Self::Full;
        };

        match parse_ranges(header, total) {
            Some(mut ranges) if ranges.len() == 1 => ranges.pop().map_or(Self::Unsatisfiable, Self::Single),
            Some(ranges) => Self::Multi(ranges),
            None => Self::Unsatisfiable,
        }
    }
}

/// Parse `bytes=a-b,a-,-n` against a file of `total` bytes
///
/// Ends past the file are clamped. Returns `None` for anything unsatisfiable.
pub fn parse_ranges(header: &str, total: u64) -> Option<Vec<ByteRange>> {
    if total == 0 {
        return None;
    }

    let specs = header.trim().strip_prefix("bytes=")?;
    let mut ranges = Vec::new();

    for spec in specs.split(',') {
        if ranges.len() == MAX_RANGES {
            return None;
        }
        ranges.push(parse_spec(spec.trim(), total)?);
    }

    Some(ranges)
}

fn parse_spec(spec: &str, total: u64) -> Option<ByteRange> {
    let (first, last) = spec.split_once('-')?;
    let last_byte = total - 1;

    if first.is_empty() {
        let suffix = parse_number(last)?;
        if suffix == 0 {
            return None;
        }
        return Some(ByteRange {
            start: total.saturating_sub(suffix),
            end: last_byte,
        });
    }

    let start = parse_number(first)?;
    if start >= total {
        return None;
    }

    let end = if last.is_empty() {
        last_byte
    } else {
        let end = parse_end(last)?;
        if start > end {
            return None;
        }
        end.min(last_byte)
    };

    Some(ByteRange { start, end })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_number(s: &str) -> Option<u64> {
    is_digits(s).then(|| s.parse().ok()).flatten()
}

/// Last-byte positions beyond `u64` are clamped like any other end past the file
fn parse_end(s: &str) -> Option<u64> {
    is_digits(s).then(|| s.parse().unwrap_or(u64::MAX))
}

// ============================================================================
// Range Server
// ============================================================================

/// Errors while opening file content
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File shrank below the requested range
    #[error("{path} is {actual} bytes, range needs {required}")]
    ShortFile {
        path: PathBuf,
        actual: u64,
        required: u64,
    },
}

/// Builds responses for resolved files
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeServer;

impl RangeServer {
    pub fn new() -> Self {
        Self
    }

    /// Respond to GET (`head == false`) or HEAD for `file`
    pub async fn respond(
        &self,
        file: &ResolvedFile,
        range: Option<&str>,
        head: bool,
    ) -> Result<Response, DeliveryError> {
        let total = file.len;

        let mut response = match RangePlan::new(range, total) {
            RangePlan::Full => {
                let body = if head {
                    Body::empty()
                } else {
                    let f = open_file(&file.path).await?;
                    Body::from_stream(ReaderStream::new(f))
                };
                let mut resp = Response::new(body);
                set_length(&mut resp, total);
                set_static(&mut resp, header::CONTENT_TYPE, OCTET_STREAM);
                resp
            }
            RangePlan::Unsatisfiable => {
                tracing::debug!(file = %file.name, range = ?range, "Unsatisfiable range");
                let mut resp = Response::new(Body::empty());
                *resp.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
                set_header(&mut resp, header::CONTENT_RANGE, &format!("bytes */{total}"));
                set_length(&mut resp, 0);
                resp
            }
            RangePlan::Single(r) => {
                let body = if head {
                    Body::empty()
                } else {
                    Body::from_stream(open_slice(&file.path, r).await?)
                };
                let mut resp = Response::new(body);
                *resp.status_mut() = StatusCode::PARTIAL_CONTENT;
                set_header(&mut resp, header::CONTENT_RANGE, &r.content_range(total));
                set_length(&mut resp, r.size());
                set_static(&mut resp, header::CONTENT_TYPE, OCTET_STREAM);
                resp
            }
            RangePlan::Multi(ranges) => {
                let boundary = uuid::Uuid::new_v4().simple().to_string();
                let length = multipart_length(&boundary, &ranges, total);
                let body = if head {
                    Body::empty()
                } else {
                    multipart_body(file.path.clone(), boundary.clone(), ranges, total)
                };
                let mut resp = Response::new(body);
                *resp.status_mut() = StatusCode::PARTIAL_CONTENT;
                set_header(
                    &mut resp,
                    header::CONTENT_TYPE,
                    &format!("multipart/byteranges; boundary={boundary}"),
                );
                set_length(&mut resp, length);
                resp
            }
        };

        set_static(&mut response, header::ACCEPT_RANGES, "bytes");
        if response.status() != StatusCode::RANGE_NOT_SATISFIABLE {
            set_header(
                &mut response,
                header::CONTENT_DISPOSITION,
                &format!("attachment; filename=\"{}\"", file.name),
            );
        }
        Ok(response)
    }
}

async fn open_file(path: &Path) -> Result<tokio::fs::File, DeliveryError> {
    tokio::fs::File::open(path).await.map_err(|source| DeliveryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Open `path` positioned at the range start, limited to the range length
pub async fn open_slice(
    path: &Path,
    range: ByteRange,
) -> Result<ReaderStream<tokio::io::Take<tokio::fs::File>>, DeliveryError> {
    let io_err = |source| DeliveryError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = open_file(path).await?;
    let actual = file.metadata().await.map_err(io_err)?.len();
    if actual <= range.end {
        return Err(DeliveryError::ShortFile {
            path: path.to_path_buf(),
            actual,
            required: range.end + 1,
        });
    }

    file.seek(SeekFrom::Start(range.start)).await.map_err(io_err)?;
    Ok(ReaderStream::new(file.take(range.size())))
}

fn part_header(boundary: &str, range: &ByteRange, total: u64) -> String {
    format!(
        "--{boundary}\r\nContent-Type: {OCTET_STREAM}\r\nContent-Range: {}\r\n\r\n",
        range.content_range(total)
    )
}

fn closing_boundary(boundary: &str) -> String {
    format!("--{boundary}--\r\n")
}

fn multipart_length(boundary: &str, ranges: &[ByteRange], total: u64) -> u64 {
    let parts: u64 = ranges
        .iter()
        .map(|r| part_header(boundary, r, total).len() as u64 + r.size() + 2)
        .sum();
    parts + closing_boundary(boundary).len() as u64
}

/// Each part re-opens the file when the client reaches it
fn multipart_body(path: PathBuf, boundary: String, ranges: Vec<ByteRange>, total: u64) -> Body {
    let closing = Bytes::from(closing_boundary(&boundary));

    let parts = ranges.into_iter().map(move |range| {
        let head = Bytes::from(part_header(&boundary, &range, total));
        let path = path.clone();
        let slice = stream::once(async move {
            open_slice(&path, range)
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e))
        })
        .try_flatten();

        stream::once(future::ready(Ok::<_, std::io::Error>(head)))
            .chain(slice)
            .chain(stream::once(future::ready(Ok(Bytes::from_static(b"\r\n")))))
    });

    let body = stream::iter(parts)
        .flatten()
        .chain(stream::once(future::ready(Ok(closing))));
    Body::from_stream(body)
}

fn set_header(resp: &mut Response, name: header::HeaderName, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        resp.headers_mut().insert(name, v);
    }
}

fn set_static(resp: &mut Response, name: header::HeaderName, value: &'static str) {
    resp.headers_mut().insert(name, HeaderValue::from_static(value));
}

fn set_length(resp: &mut Response, len: u64) {
    resp.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(len));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: u64, end: u64) -> ByteRange {
        ByteRange { start, end }
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(parse_ranges("bytes=0-99", 1000), Some(vec![r(0, 99)]));
        assert_eq!(parse_ranges("bytes=900-1200", 1000), Some(vec![r(900, 999)]));
        assert_eq!(parse_ranges("bytes=500-", 1000), Some(vec![r(500, 999)]));
        assert_eq!(parse_ranges("bytes=-100", 1000), Some(vec![r(900, 999)]));
        assert_eq!(parse_ranges("bytes=-5000", 1000), Some(vec![r(0, 999)]));
        assert_eq!(
            parse_ranges("bytes=0-99999999999999999999", 1000),
            Some(vec![r(0, 999)])
        );
        assert_eq!(
            parse_ranges("bytes=0-9, 20-29", 1000),
            Some(vec![r(0, 9), r(20, 29)])
        );
    }

    #[test]
    fn test_parse_rejects() {
        for header in [
            "bytes=2000-3000",
            "bytes=1000-",
            "bytes=5-4",
            "bytes=-0",
            "bytes=",
            "bytes=0-9,",
            "bytes=a-b",
            "bytes=+1-5",
            "bytes=99999999999999999999-",
            "items=0-9",
            "0-9",
        ] {
            assert_eq!(parse_ranges(header, 1000), None, "{header}");
        }
        assert_eq!(parse_ranges("bytes=0-0", 0), None);
    }

    #[test]
    fn test_parse_range_count_limit() {
        let at_limit = vec!["0-0"; MAX_RANGES].join(",");
        assert_eq!(parse_ranges(&format!("bytes={at_limit}"), 10).map(|v| v.len()), Some(MAX_RANGES));

        let over = vec!["0-0"; MAX_RANGES + 1].join(",");
        assert_eq!(parse_ranges(&format!("bytes={over}"), 10), None);
    }

    #[test]
    fn test_plan() {
        assert_eq!(RangePlan::new(None, 10), RangePlan::Full);
        assert_eq!(RangePlan::new(Some("bytes=0-1"), 10), RangePlan::Single(r(0, 1)));
        assert_eq!(
            RangePlan::new(Some("bytes=0-1,3-4"), 10),
            RangePlan::Multi(vec![r(0, 1), r(3, 4)])
        );
        assert_eq!(RangePlan::new(Some("bytes=20-"), 10), RangePlan::Unsatisfiable);
    }

    #[tokio::test]
    async fn test_open_slice_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let chunks: Vec<Bytes> = open_slice(&path, r(2, 5)).await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"2345");

        assert!(matches!(
            open_slice(&path, r(5, 10)).await,
            Err(DeliveryError::ShortFile { actual: 10, required: 11, .. })
        ));
    }

    #[test]
    fn test_multipart_length_matches_layout() {
        let ranges = [r(0, 9), r(20, 29)];
        let expected = part_header("B", &ranges[0], 100).len()
            + 10
            + 2
            + part_header("B", &ranges[1], 100).len()
            + 10
            + 2
            + "--B--\r\n".len();
        assert_eq!(multipart_length("B", &ranges, 100), expected as u64);
        assert_eq!(
            part_header("B", &ranges[1], 100),
            "--B\r\nContent-Type: application/octet-stream\r\nContent-Range: bytes 20-29/100\r\n\r\n"
        );
    }
}
