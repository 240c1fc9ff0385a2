//! Build stage error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BuildError {
    #[error("extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("unsupported archive format: {path}")]
    UnsupportedArchiveFormat { path: String },

    #[error("failed to spawn {program}: {message}")]
    SpawnFailed { program: String, message: String },

    /// A build action exited non-zero; `stdout`/`stderr` are the tool's own output.
    #[error("`{command}` exited with {}\n{stderr}", describe_exit(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("build produced no artifact at {path}")]
    MissingArtifact { path: String },

    #[error("build setup failed: {message}")]
    Setup { message: String },
}

#[allow(clippy::ref_option)]
pub(crate) fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedArchiveFormat { .. } => {
                Some("Supported archives are .tar.gz, .tgz, .tar and .zip.")
            }
            Self::MissingArtifact { .. } => {
                Some("Check that the build step writes its output to {prefix}/bin.")
            }
            Self::CommandFailed { .. } => Some("Re-run with --keep-work-dir to inspect the sources."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ExtractionFailed { .. } => "build.extraction_failed",
            Self::UnsupportedArchiveFormat { .. } => "build.unsupported_archive_format",
            Self::SpawnFailed { .. } => "build.spawn_failed",
            Self::CommandFailed { .. } => "build.command_failed",
            Self::MissingArtifact { .. } => "build.missing_artifact",
            Self::Setup { .. } => "build.setup_failed",
        };
        Some(code)
    }
}
