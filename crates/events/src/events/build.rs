use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Build-specific events for the event system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// Source archive extracted into the work directory
    SourceExtracted {
        package: String,
        archive: PathBuf,
        source_root: PathBuf,
    },

    /// Build tool probe result
    DependencyChecked {
        tool: String,
        path: Option<PathBuf>,
    },

    /// Build session started
    Started {
        package: String,
        version: String,
        steps: usize,
    },

    /// One build step is about to run
    StepStarted {
        package: String,
        step: usize,
        total_steps: usize,
        command: String,
        working_dir: PathBuf,
    },

    /// Build step finished successfully
    StepCompleted {
        package: String,
        step: usize,
        duration: Duration,
    },

    /// Build produced its artifact
    Completed {
        package: String,
        version: String,
        artifact: PathBuf,
        duration: Duration,
    },

    /// Build failed
    Failed {
        package: String,
        version: String,
        error: String,
    },
}
