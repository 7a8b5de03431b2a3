//! Custom error types for rustlitreview.
//!
//! Provider failures are recoverable inside the query runner; only
//! configuration and output errors ever reach the binary.

use thiserror::Error;

/// Main error type for rustlitreview operations.
#[derive(Debug, Error)]
pub enum LitReviewError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML or JSON payload could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by the search provider
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Provider returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message
        message: String,
    },

    /// CAPTCHA detected
    #[error("CAPTCHA detected, please refresh cookies")]
    Captcha,

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `LitReviewError`
pub type Result<T> = std::result::Result<T, LitReviewError>;
