//! Source retrieval error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum FetchError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("HTTP error {status} for {url}")]
    HttpError { status: u16, url: String },

    #[error("failed to store {path}: {message}")]
    StorageFailed { path: String, message: String },

    #[error("source archive is already at {path}")]
    SourceIsDestination { path: String },
}

impl UserFacingError for FetchError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) => {
                Some("Check your network connection or raise network.timeout in the config.")
            }
            Self::HttpError { status: 404, .. } => {
                Some("The source URL no longer resolves; the descriptor may need a new revision.")
            }
            Self::InvalidUrl(_) | Self::UnsupportedProtocol { .. } => {
                Some("Use an http, https or file URL for source.url.")
            }
            Self::StorageFailed { .. } => Some("Ensure the work directory is writable."),
            Self::SourceIsDestination { .. } => {
                Some("The local archive was left untouched; fetch into another directory.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) | Self::DownloadFailed(_) => true,
            Self::HttpError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "fetch.timeout",
            Self::DownloadFailed(_) => "fetch.download_failed",
            Self::ConnectionRefused(_) => "fetch.connection_refused",
            Self::InvalidUrl(_) => "fetch.invalid_url",
            Self::UnsupportedProtocol { .. } => "fetch.unsupported_protocol",
            Self::HttpError { .. } => "fetch.http_error",
            Self::StorageFailed { .. } => "fetch.storage_failed",
            Self::SourceIsDestination { .. } => "fetch.source_is_destination",
        };
        Some(code)
    }
}
