//! Unified error handling for the geodist crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`GeodistErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use geodist::error::{Error, GeodistErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), "Retrying: {err}");
//!     } else {
//!         tracing::error!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::catalog::CatalogError;
pub use crate::pool::SettingsError;
pub use crate::range::DeliveryError;
pub use crate::resolver::ResolveError;

/// Common trait for geodist error types
pub trait GeodistErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Remote hosts and HTTP client failures
    Network,
    /// Malformed documents
    Parsing,
    /// Filesystem and archive errors
    Storage,
    /// Configuration and settings errors
    Config,
    /// Requested file does not exist
    NotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short description of the category
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Parsing => "parsing error",
            Self::Storage => "storage error",
            Self::Config => "configuration error",
            Self::NotFound => "not found",
            Self::Other => "other error",
        }
    }
}

/// Unified error type for the geodist crate
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog build and publish errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Download settings errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// File resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Content delivery errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GeodistErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Catalog(e) => e.is_recoverable(),
            Self::Settings(SettingsError::Io { .. }) => true,
            Self::Settings(_) => false,
            Self::Resolve(_) => false,
            Self::Delivery(_) => true,
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Http(_) => true, // HTTP errors are often transient
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Catalog(e) => match e {
                CatalogError::Listing { .. } => ErrorCategory::Network,
                CatalogError::Serialization(_) => ErrorCategory::Parsing,
                CatalogError::UnknownCategory(_) => ErrorCategory::Config,
                CatalogError::Zip { .. } | CatalogError::Io { .. } => ErrorCategory::Storage,
            },
            Self::Settings(SettingsError::Io { .. }) => ErrorCategory::Storage,
            Self::Settings(_) => ErrorCategory::Config,
            Self::Resolve(_) => ErrorCategory::NotFound,
            Self::Delivery(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Http(_) => ErrorCategory::Network,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
