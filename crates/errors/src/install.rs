//! Installation stage error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum InstallError {
    #[error("target {path} is occupied by a conflicting entry: {reason}")]
    Conflict { path: String, reason: String },

    #[error("install location {path} is not writable: {message}")]
    NotWritable { path: String, message: String },

    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("package not installed: {path}")]
    NotInstalled { path: String },
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Conflict { .. } => Some(
                "Remove the conflicting entry or set install.overwrite = true in the config.",
            ),
            Self::NotWritable { .. } => {
                Some("Choose a writable --bin-dir or adjust permissions on the install root.")
            }
            Self::NotInstalled { .. } => Some("Run `spkg install` before `spkg test`."),
            Self::FilesystemError { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::FilesystemError { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::Conflict { .. } => "install.conflict",
            Self::NotWritable { .. } => "install.not_writable",
            Self::FilesystemError { .. } => "install.filesystem_error",
            Self::NotInstalled { .. } => "install.not_installed",
        })
    }
}
