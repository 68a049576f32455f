//! Error types for catalog building and publishing

use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while building or publishing the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Unknown category tag
    #[error("Unknown download category: {0}")]
    UnknownCategory(String),

    /// Failed to read a zip artifact
    #[error("Invalid zip artifact {name}: {source}")]
    Zip {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// Remote listing request failed
    #[error("Listing from {host} failed: {reason}")]
    Listing { host: String, reason: String },

    /// Descriptor (de)serialization failed
    #[error("Descriptor serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while scanning or publishing
    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Create an I/O error tagged with the failing operation
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Check if retrying the operation might succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Listing { .. } | Self::Io { .. })
    }
}
