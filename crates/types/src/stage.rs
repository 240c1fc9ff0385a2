//! Install pipeline stages

use serde::{Deserialize, Serialize};
use spkg_errors::ErrorKind;
use std::fmt;

/// Linear progression of one install run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStage {
    Pending,
    Resolved,
    IntegrityChecked,
    DependenciesSatisfied,
    Built,
    Installed,
    Verified,
}

impl InstallStage {
    /// All stages in pipeline order
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Resolved,
        Self::IntegrityChecked,
        Self::DependenciesSatisfied,
        Self::Built,
        Self::Installed,
        Self::Verified,
    ];

    /// The stage that follows this one, if any
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Resolved),
            Self::Resolved => Some(Self::IntegrityChecked),
            Self::IntegrityChecked => Some(Self::DependenciesSatisfied),
            Self::DependenciesSatisfied => Some(Self::Built),
            Self::Built => Some(Self::Installed),
            Self::Installed => Some(Self::Verified),
            Self::Verified => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Resolved => "Resolved",
            Self::IntegrityChecked => "IntegrityChecked",
            Self::DependenciesSatisfied => "DependenciesSatisfied",
            Self::Built => "Built",
            Self::Installed => "Installed",
            Self::Verified => "Verified",
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a pipeline run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Active(InstallStage),
    /// Terminal failure
    Failed {
        /// Last stage completed successfully
        reached: InstallStage,
        /// Stage whose transition failed
        failed_at: InstallStage,
        #[serde(with = "kind_as_str")]
        kind: ErrorKind,
    },
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::Active(InstallStage::Pending)
    }
}

impl PipelineState {
    /// Last stage completed successfully
    #[must_use]
    pub fn reached(self) -> InstallStage {
        match self {
            Self::Active(stage) | Self::Failed { reached: stage, .. } => stage,
        }
    }

    #[must_use]
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Move to the next stage
    ///
    /// Returns the new stage, or `None` when already terminal.
    pub fn advance(&mut self) -> Option<InstallStage> {
        let Self::Active(stage) = *self else {
            return None;
        };
        let next = stage.next()?;
        *self = Self::Active(next);
        Some(next)
    }

    /// Record a failed transition out of the current stage
    pub fn fail(&mut self, kind: ErrorKind) {
        if let Self::Active(stage) = *self {
            *self = Self::Failed {
                reached: stage,
                failed_at: stage.next().unwrap_or(stage),
                kind,
            };
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active(stage) => write!(f, "{stage}"),
            Self::Failed {
                reached,
                failed_at,
                kind,
            } => write!(f, "Failed at {failed_at} ({kind}, reached {reached})"),
        }
    }
}

mod kind_as_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use spkg_errors::ErrorKind;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(kind: &ErrorKind, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(kind)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ErrorKind, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "FetchError" => ErrorKind::Fetch,
            "IntegrityError" => ErrorKind::Integrity,
            "MissingDependencyError" => ErrorKind::MissingDependency,
            "BuildError" => ErrorKind::Build,
            "InstallError" => ErrorKind::Install,
            "VerificationError" => ErrorKind::Verification,
            "DescriptorError" => ErrorKind::Descriptor,
            "ConfigError" => ErrorKind::Config,
            "IoError" => ErrorKind::Io,
            _ => ErrorKind::Internal,
        })
    }
}
