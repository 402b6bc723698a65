//! Error types for Advisor.

use thiserror::Error;

/// Library-level error type for Advisor operations.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Corpus is empty; at least one record is required to build an index")]
    EmptyCorpus,

    #[error("Embedding backend error: {0}")]
    EmbeddingBackend(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AdvisorError {
    /// Whether retrying the failed operation could succeed.
    ///
    /// Backend outages and transport failures are transient. Authentication,
    /// validation and parse failures are not: the same request fails the same way.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdvisorError::EmbeddingBackend(_)
                | AdvisorError::GenerationBackend(_)
                | AdvisorError::Http(_)
        )
    }
}

/// Result type alias for Advisor operations.
pub type Result<T> = std::result::Result<T, AdvisorError>;
