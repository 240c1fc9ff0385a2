//! Package descriptor error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum DescriptorError {
    #[error("failed to read descriptor {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("failed to parse descriptor: {message}")]
    ParseError { message: String },

    #[error("invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("malformed checksum {value:?}: {message}")]
    MalformedChecksum { value: String, message: String },

    #[error("cannot derive a version from {url}")]
    UnresolvableVersion { url: String },

    #[error("unknown placeholder {{{placeholder}}} in {context}")]
    UnknownPlaceholder {
        placeholder: String,
        context: String,
    },
}

impl DescriptorError {
    /// Shorthand for [`DescriptorError::InvalidField`]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl UserFacingError for DescriptorError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MalformedChecksum { .. } => Some(
                "Use `sha256: <64 hex digits>` or `checksum: \"sha256:<hex>\"` / `\"blake3:<hex>\"`.",
            ),
            Self::UnresolvableVersion { .. } => {
                Some("Set source.version explicitly in the descriptor.")
            }
            Self::UnknownPlaceholder { .. } => Some(
                "Available placeholders are {name}, {version}, {bin}, {prefix} and {source}.",
            ),
            _ => Some("Fix the descriptor and retry."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::ReadFailed { .. } => "descriptor.read_failed",
            Self::ParseError { .. } => "descriptor.parse_error",
            Self::InvalidField { .. } => "descriptor.invalid_field",
            Self::MalformedChecksum { .. } => "descriptor.malformed_checksum",
            Self::UnresolvableVersion { .. } => "descriptor.unresolvable_version",
            Self::UnknownPlaceholder { .. } => "descriptor.unknown_placeholder",
        })
    }
}

impl From<serde_yml::Error> for DescriptorError {
    fn from(err: serde_yml::Error) -> Self {
        Self::ParseError {
            message: err.to_string(),
        }
    }
}
