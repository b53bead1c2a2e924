//! Error types for the tracker and its data sources

use thiserror::Error;

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching or scoring a page.
///
/// The heuristic scorer itself never fails; these cover the plumbing around
/// it (HTTP client setup, page fetches, the remote audit API, configuration).
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the tracker
    #[error("Tracker initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load the page under analysis
    #[error("Failed to load page: {0}")]
    LoadError(String),

    /// The remote performance audit failed or returned unusable data
    #[error("Remote audit failed: {0}")]
    RemoteError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Map a reqwest failure, reporting client-side timeouts with the configured limit.
///
/// The request URL is stripped from the message; audit URLs carry the API key
/// in their query string.
pub(crate) fn from_http(err: reqwest::Error, timeout_ms: u64) -> Error {
    if err.is_timeout() {
        Error::Timeout(timeout_ms)
    } else {
        Error::NetworkError(err.without_url().to_string())
    }
}
