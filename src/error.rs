//! Unified error types for the arbitrage scanner.

use thiserror::Error;

/// Unified error type for the arbitrage scanner.
#[derive(Error, Debug)]
pub enum ScannerError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Malformed event payload.
    #[error("odds error: {0}")]
    Odds(#[from] OddsError),

    /// Odds feed fetch error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Batch persistence error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Notification dispatch error.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while turning a raw event payload into an [`Event`](crate::odds::Event).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OddsError {
    /// Home or away participant is absent or empty.
    #[error("expected home and away team in event payload, actual keys are {keys:?}")]
    MissingParticipant {
        /// Keys present on the offending payload.
        keys: Vec<String>,
    },

    /// Home and away participant share the same name.
    #[error("home and away team are both {name:?}")]
    DuplicateParticipant {
        /// The repeated participant name.
        name: String,
    },

    /// Payload is not an object or has wrongly typed fields.
    #[error("malformed event payload ({reason}), keys are {keys:?}")]
    MalformedEvent {
        /// Deserializer message.
        reason: String,
        /// Keys present on the offending payload.
        keys: Vec<String>,
    },
}

/// Odds API fetch errors.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Non-retryable HTTP status.
    #[error("request to {endpoint} failed with status {status}")]
    Status {
        /// Endpoint path.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// Retryable failures persisted past the retry budget.
    #[error("request to {endpoint} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Endpoint path.
        endpoint: String,
        /// Attempts made.
        attempts: u32,
        /// Last observed failure.
        last_error: String,
    },

    /// Response body could not be parsed.
    #[error("failed to parse response from {endpoint}: {reason}")]
    Parse {
        /// Endpoint path.
        endpoint: String,
        /// Parser message.
        reason: String,
    },

    /// Base URL or endpoint is not a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client construction or transport failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Batch file persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error reading/writing a batch.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Batch written by an incompatible schema.
    #[error("unsupported batch schema version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// Timestamp formatting failed.
    #[error("timestamp error: {0}")]
    Timestamp(#[from] time::error::Format),

    /// Record cannot be turned back into an opportunity.
    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord {
        /// Position in the batch.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// No batch file in the output directory.
    #[error("no opportunity batch found in {dir}")]
    NoBatch {
        /// Directory searched.
        dir: String,
    },
}

/// Notification dispatch errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Required notifier setting is missing.
    #[error("notifier not configured: {0}")]
    NotConfigured(String),

    /// Provider returned a non-success status.
    #[error("notification rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Timestamp formatting failed.
    #[error("timestamp error: {0}")]
    Timestamp(#[from] time::error::Format),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ScannerError>;
