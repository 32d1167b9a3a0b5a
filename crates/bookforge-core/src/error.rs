//! Error types for the bookforge pipeline

use thiserror::Error;

/// Main error type for all bookforge operations
#[derive(Error, Debug)]
pub enum BookforgeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Monthly generation quota exceeded: {used} of {limit} used")]
    QuotaExceeded { used: u32, limit: u32 },

    #[error("Page limit exceeded: requested {requested} pages, tier allows {max}")]
    PageLimitExceeded { requested: u32, max: u32 },

    #[error("Structure generation failed: {0}")]
    StructureGeneration(String),

    #[error("Generated outline has no content: {0}")]
    EmptyContent(String),

    #[error("Illustration attempt failed: {0}")]
    IllustrationAttempt(String),

    #[error("Cover generation failed: {0}")]
    CoverGeneration(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl BookforgeError {
    /// Pre-flight denials: surfaced before any generation work starts
    pub fn is_fatal_preflight(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. } | Self::PageLimitExceeded { .. })
    }

    /// Whether another attempt at the same external call could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Cancelled
                | Self::Config(_)
                | Self::Validation(_)
                | Self::QuotaExceeded { .. }
                | Self::PageLimitExceeded { .. }
        )
    }
}

impl From<config::ConfigError> for BookforgeError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<bookforge_types::TypesError> for BookforgeError {
    fn from(err: bookforge_types::TypesError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type for bookforge operations
pub type Result<T> = std::result::Result<T, BookforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_classification() {
        assert!(BookforgeError::QuotaExceeded { used: 3, limit: 3 }.is_fatal_preflight());
        assert!(BookforgeError::PageLimitExceeded { requested: 50, max: 12 }.is_fatal_preflight());
        assert!(!BookforgeError::EmptyContent("no chapters".to_string()).is_fatal_preflight());
    }

    #[test]
    fn test_cancelled_is_not_retryable() {
        assert!(!BookforgeError::Cancelled.is_retryable());
        assert!(BookforgeError::IllustrationAttempt("empty".to_string()).is_retryable());
        assert!(BookforgeError::Timeout("image".to_string()).is_retryable());
    }
}
