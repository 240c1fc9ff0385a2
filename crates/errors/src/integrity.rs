//! Integrity verification error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum IntegrityError {
    #[error("{algorithm} mismatch for {file}: expected {expected}, got {actual}")]
    Mismatch {
        file: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("cannot read {file} for verification: {message}")]
    Unreadable { file: String, message: String },
}

impl UserFacingError for IntegrityError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Mismatch { .. } => Some(
                "The downloaded archive does not match the descriptor. Do not build it; \
                 confirm the checksum with the upstream release.",
            ),
            Self::Unreadable { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::Mismatch { .. } => "integrity.mismatch",
            Self::Unreadable { .. } => "integrity.unreadable",
        })
    }
}
