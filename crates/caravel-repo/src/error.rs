//! Error types for repository synchronization

use thiserror::Error;

/// Repository synchronization errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Reference Errors ============
    #[error("Invalid chart reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("Invalid pull target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    #[error("Repository not found: {name}")]
    RepositoryNotFound { name: String },

    // ============ Network Errors ============
    #[error("Repository '{name}' at {url} is unreachable: {reason}")]
    UnreachableRepository {
        name: String,
        url: String,
        reason: String,
    },

    #[error("Fetch of {url} failed: {message}")]
    FetchFailed { url: String, message: String },

    #[error("HTTP error: {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    // ============ Locking Errors ============
    #[error("Timed out after {seconds}s waiting for registry lock at {path}")]
    LockTimeout { path: String, seconds: u64 },

    // ============ Resolution Errors ============
    #[error("Chart not found: {name}")]
    ChartNotFound { name: String },

    #[error("Version {version} of chart {name} not found (available: {available})")]
    VersionNotFound {
        name: String,
        version: String,
        available: String,
    },

    #[error("Chart {name} has no download URL in its index entry")]
    MissingDownloadUrl { name: String },

    // ============ Pull Errors ============
    #[error("Integrity check failed for {name}: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Target already exists: {path} (pass --force to overwrite)")]
    TargetExists { path: String },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        let url = e
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if let Some(status) = e.status() {
            RepoError::HttpStatus {
                status: status.as_u16(),
                url,
            }
        } else {
            RepoError::FetchFailed {
                url,
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidRepositoryUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
