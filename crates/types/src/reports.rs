//! Report type definitions for install runs

use crate::stage::InstallStage;
use crate::version::PackageVersion;
use serde::{Deserialize, Serialize};
use spkg_hash::{Hash, IntegrityHash};
use std::path::PathBuf;

/// Installation report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstallReport {
    /// Package name
    pub name: String,
    /// Version embedded into the build
    pub version: PackageVersion,
    /// Installed binary
    pub installed_path: PathBuf,
    /// BLAKE3 digest of the installed binary
    pub binary_hash: Hash,
    /// Verified digest of the source archive
    pub source_hash: IntegrityHash,
    /// Last stage the run completed
    pub stage: InstallStage,
    /// Per-stage durations in pipeline order
    pub timings: Vec<StageTiming>,
    /// Total execution time
    pub duration_ms: u64,
}

impl InstallReport {
    /// Duration of one stage, if it ran
    #[must_use]
    pub fn timing(&self, stage: InstallStage) -> Option<u64> {
        self.timings
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.duration_ms)
    }
}

/// Time spent reaching a stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: InstallStage,
    pub duration_ms: u64,
}

/// Result of `fetch`: an archive whose integrity has been checked
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchReport {
    pub name: String,
    pub version: PackageVersion,
    pub archive_path: PathBuf,
    pub source_hash: IntegrityHash,
    pub size: u64,
    pub duration_ms: u64,
}
