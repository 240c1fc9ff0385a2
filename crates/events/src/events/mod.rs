use serde::{Deserialize, Serialize};

use crate::EventSource;
use spkg_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error kind name (`IntegrityError`, `BuildError`, ...).
    pub kind: String,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a cross-crate error.
    #[must_use]
    pub fn from_error(error: &spkg_errors::Error) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            kind: error.kind().to_string(),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

// Declare all domain modules
pub mod build;
pub mod download;
pub mod general;
pub mod install;

// Re-export all domain events
pub use build::*;
pub use download::*;
pub use general::*;
pub use install::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Source archive retrieval
    Download(DownloadEvent),

    /// Extraction, dependency probing and build steps
    Build(BuildEvent),

    /// Stage transitions, installation and verification
    Install(InstallEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Download(_) => EventSource::DOWNLOAD,
            Self::Build(_) => EventSource::BUILD,
            Self::Install(_) => EventSource::INSTALL,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. })
            | Self::Download(DownloadEvent::Failed { .. })
            | Self::Build(BuildEvent::Failed { .. })
            | Self::Install(InstallEvent::StageFailed { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Download(DownloadEvent::Retrying { .. }) => Level::WARN,

            // Debug-level events (progress updates, internal state)
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Download(DownloadEvent::Progress { .. })
            | Self::Build(
                BuildEvent::DependencyChecked { .. } | BuildEvent::StepCompleted { .. },
            )
            | Self::Install(InstallEvent::WorkDirKept { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "spkg::events::general",
            Self::Download(_) => "spkg::events::download",
            Self::Build(_) => "spkg::events::build",
            Self::Install(_) => "spkg::events::install",
        }
    }
}
