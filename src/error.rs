use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the querycase pipeline
#[derive(Error, Debug)]
pub enum QuerycaseError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Upstream HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream API returned a non-success status
    #[error("Upstream API error: status {status}: {body}")]
    Api { status: u16, body: String },

    /// Embedding errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),

    /// Vector index / metadata store errors
    #[error("Index error: {0}")]
    Index(#[from] crate::index::IndexError),

    /// Index or metadata file missing where one is required
    #[error("No index found at {path}; run `querycase update` first")]
    IndexNotFound { path: PathBuf },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for querycase operations
pub type Result<T> = std::result::Result<T, QuerycaseError>;
