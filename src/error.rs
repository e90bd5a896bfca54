// src/error.rs
//! Application error types with structured error handling.
//!
//! `FetchError` is the closed vocabulary for everything that can go wrong
//! between asking for a page and holding its decoded JSON. `AppError` wraps
//! it together with configuration, filesystem and export failures.

use crate::model::Harvest;
use thiserror::Error;

/// Why a single fetch failed.
///
/// Only [`FetchError::Transient`] is retried; every other variant fails the
/// attempt immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connect/timeout/reset failures, HTTP 5xx and HTTP 429.
    #[error("Transient failure for {url}: {reason}")]
    Transient {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// A non-retryable HTTP status such as 401 or 404.
    #[error("Request to {url} rejected with HTTP {status}")]
    Rejected { url: String, status: u16 },

    /// The response arrived but its body is not what the endpoint promises.
    #[error("Malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Cache trouble, built for log lines only; the cache never returns it.
    #[error("Cache error: {reason}")]
    Cache { reason: String },

    #[error("Category '{category}' failed: {source}")]
    CategoryFailure {
        category: String,
        #[source]
        source: Box<FetchError>,
    },

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("HTTP client setup failed: {reason}")]
    ClientSetup { reason: String },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        if status == 429 || (500..600).contains(&status) {
            Self::Transient {
                url,
                reason: format!("HTTP {}", status),
                status: Some(status),
            }
        } else {
            Self::Rejected { url, status }
        }
    }

    /// Classifies a transport error from reqwest.
    ///
    /// `label` is the credential-free description of the request; the error
    /// itself is stripped of its URL because that URL carries the API keys.
    pub fn from_transport(label: impl Into<String>, err: reqwest::Error) -> Self {
        let url = label.into();
        if let Some(status) = err.status() {
            return Self::from_status(url, status.as_u16());
        }
        if err.is_builder() {
            return Self::ClientSetup {
                reason: err.without_url().to_string(),
            };
        }
        if err.is_decode() {
            return Self::Decode {
                url,
                reason: err.without_url().to_string(),
            };
        }

        let kind = if err.is_timeout() {
            "timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "transport error"
        };
        Self::Transient {
            url,
            reason: format!("{}: {}", kind, err.without_url()),
            status: None,
        }
    }

    /// Tags a failure with the category it broke.
    pub fn in_category(self, category: impl Into<String>) -> Self {
        Self::CategoryFailure {
            category: category.into(),
            source: Box::new(self),
        }
    }

    /// The category name, for failures raised by the bulk collector.
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::CategoryFailure { category, .. } => Some(category),
            _ => None,
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Export failed: {0}")]
    Export(String),

    /// Fail-fast collection stopped at the first broken category.
    #[error("Collection aborted: {failure}")]
    CollectionAborted {
        failure: FetchError,
        partial: Box<Harvest>,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

// Allow converting from anyhow::Error, preserving error chain
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Export(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError {
            message: "Background task failed".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(FetchError::from_status("items", 500).is_transient());
        assert!(FetchError::from_status("items", 503).is_transient());
        assert!(FetchError::from_status("items", 429).is_transient());
        assert_eq!(
            FetchError::from_status("items", 404),
            FetchError::Rejected {
                url: "items".to_string(),
                status: 404
            }
        );
        assert!(!FetchError::from_status("items", 401).is_transient());
    }

    #[test]
    fn test_category_failure_is_not_transient() {
        let err = FetchError::from_status("items?page=3", 502).in_category("images");
        assert!(!err.is_transient());
        assert_eq!(err.category(), Some("images"));
        assert!(err.to_string().contains("images"));
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn test_decode_and_pool_errors_are_final() {
        let decode = FetchError::Decode {
            url: "items".to_string(),
            reason: "expected value".to_string(),
        };
        assert!(!decode.is_transient());
        assert!(!FetchError::PoolClosed.is_transient());
    }
}
