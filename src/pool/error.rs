//! Error types for download settings

use std::path::PathBuf;
use thiserror::Error;

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors that can occur while loading download settings
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("Cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings document is not valid JSON
    #[error("Malformed settings document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Settings parsed but failed validation
    #[error("Invalid settings: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl SettingsError {
    /// Individual problem descriptions
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Invalid(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}
