//! Post-install verification error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum VerificationError {
    #[error("output of `{command}` does not match {pattern:?}")]
    PatternNotFound {
        command: String,
        pattern: String,
        output: String,
    },

    #[error("`{command}` exited with {}", crate::build::describe_exit(.exit_code))]
    UnexpectedExit {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("failed to run `{command}`: {message}")]
    CommandFailed { command: String, message: String },
}

impl UserFacingError for VerificationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("The binary was left installed for manual inspection.")
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::PatternNotFound { .. } => "verification.pattern_not_found",
            Self::UnexpectedExit { .. } => "verification.unexpected_exit",
            Self::CommandFailed { .. } => "verification.command_failed",
        })
    }
}
