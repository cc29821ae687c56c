//! Error types for the listing workflow.
//!
//! Only infrastructure failures are errors. Outcomes the seller is expected to
//! react to (validation, rejected submissions, transport failures during a
//! submit) are values carried by [`crate::domain::submission::SubmissionOutcome`].

use thiserror::Error;

/// Result type alias using the listing error type.
pub type Result<T> = std::result::Result<T, ListingError>;

/// Main error type for the listing workflow.
#[derive(Error, Debug)]
pub enum ListingError {
    /// No usable session in the persisted store
    #[error("No session found: {0}")]
    SessionMissing(String),

    /// An image file could not be turned into inline data
    #[error("Failed to read image '{name}': {reason}")]
    Decode { name: String, reason: String },

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
