use serde::{Deserialize, Serialize};
use spkg_types::InstallStage;
use std::path::PathBuf;
use std::time::Duration;

use super::FailureContext;

/// Pipeline progression and installation events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstallEvent {
    /// Pipeline run started
    Started {
        package: String,
        version: String,
        bin_dir: PathBuf,
    },

    /// Pipeline moved into a new stage
    StageReached {
        package: String,
        stage: InstallStage,
        elapsed: Duration,
    },

    /// Pipeline stopped; no further stages run
    StageFailed {
        package: String,
        reached: InstallStage,
        failed_at: InstallStage,
        failure: FailureContext,
    },

    /// Binary moved into the bin directory
    BinaryInstalled {
        package: String,
        path: PathBuf,
        replaced: bool,
    },

    /// Smoke test started
    VerificationStarted { package: String, command: String },

    /// Smoke test output matched the expected pattern
    VerificationPassed { package: String, command: String },

    /// Work directory retained for inspection
    WorkDirKept { package: String, path: PathBuf },

    /// Whole run finished
    Completed {
        package: String,
        version: String,
        stage: InstallStage,
        duration: Duration,
    },
}
